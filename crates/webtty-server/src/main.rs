//! webtty server binary.

use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info, warn};

use webtty_core::logging::init_logging;
use webtty_server::cli::Cli;
use webtty_server::http;
use webtty_server::session::ServerContext;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.log_file.as_deref(), cli.log_format.into()) {
        eprintln!("failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let options = cli.server_options();
    let ssh = cli.ssh_target();
    if let Err(e) = options.validate().and_then(|_| ssh.validate()) {
        error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    }

    // An identity file grants shell access to everyone who can reach the
    // page unless connections are also gated by signed URLs.
    if ssh.identity_file.is_some() && options.signing_secret.is_none() {
        warn!("SSH identity file configured without a signing secret; anyone reaching this server gets a shell");
    }

    let metrics = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => handle,
        Err(e) => {
            error!(error = %e, "Failed to install metrics recorder");
            std::process::exit(1);
        }
    };

    let addr = cli.socket_addr();
    let ctx = ServerContext::new(options, ssh);
    let app = http::router(ctx, metrics, cli.client_assets.clone());

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%addr, error = %e, "Failed to bind");
            std::process::exit(1);
        }
    };

    info!(%addr, base = %cli.base, "webtty listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    let mut term = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            warn!(error = %e, "Failed to install SIGTERM handler");
            let _ = ctrl_c.await;
            return;
        }
    };

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = term.recv() => info!("Received SIGTERM, shutting down"),
    }
}
