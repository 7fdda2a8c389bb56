//! Command-line interface for the webtty server.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use webtty_core::config::{ServerOptions, SshTarget};
use webtty_core::constants::{DEFAULT_BASE_PATH, DEFAULT_COMMAND, DEFAULT_SSH_PORT};
use webtty_core::logging::LogFormat;

/// Serve a shell to browser terminals over WebSocket.
#[derive(Parser, Debug)]
#[command(name = "webtty", version, about)]
pub struct Cli {
    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value_t = 3000)]
    pub port: u16,

    /// HTTP base path for the terminal page and its endpoints
    #[arg(long, default_value = DEFAULT_BASE_PATH)]
    pub base: String,

    /// Page title
    #[arg(long, default_value = "webtty terminal")]
    pub title: String,

    /// Command to run for each session (overrides the default shell)
    #[arg(short, long)]
    pub command: Option<String>,

    /// SSH host; sessions connect there instead of running locally
    #[arg(long)]
    pub ssh_host: Option<String>,

    /// SSH port
    #[arg(long, default_value_t = DEFAULT_SSH_PORT)]
    pub ssh_port: u16,

    /// SSH user
    #[arg(long)]
    pub ssh_user: Option<String>,

    /// SSH preferred authentication methods (e.g. "publickey,password")
    #[arg(long)]
    pub ssh_auth: Option<String>,

    /// SSH identity file
    #[arg(long)]
    pub ssh_key: Option<PathBuf>,

    /// Disable strict host key checking (testing only)
    #[arg(long)]
    pub skip_host_key_check: bool,

    /// Always build an SSH invocation, even when a command is given
    #[arg(long)]
    pub force_ssh: bool,

    /// Secret for signed-URL verification; absent means open mode
    #[arg(long, env = "WEBTTY_SIGNING_SECRET")]
    pub signing_secret: Option<String>,

    /// Serve the iframe-friendly page variant
    #[arg(long)]
    pub allow_iframe: bool,

    /// Directory with the bundled browser client assets
    #[arg(long)]
    pub client_assets: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Write logs to a file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = CliLogFormat::Text)]
    pub log_format: CliLogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliLogFormat {
    Text,
    Json,
}

impl From<CliLogFormat> for LogFormat {
    fn from(value: CliLogFormat) -> Self {
        match value {
            CliLogFormat::Text => LogFormat::Text,
            CliLogFormat::Json => LogFormat::Json,
        }
    }
}

impl Cli {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn server_options(&self) -> ServerOptions {
        ServerOptions {
            base_path: self.base.clone(),
            title: self.title.clone(),
            allow_iframe: self.allow_iframe,
            signing_secret: self.signing_secret.clone(),
            default_command: DEFAULT_COMMAND.to_string(),
            override_command: self.command.clone(),
            force_ssh: self.force_ssh,
        }
    }

    pub fn ssh_target(&self) -> SshTarget {
        SshTarget {
            host: self.ssh_host.clone(),
            port: self.ssh_port,
            user: self.ssh_user.clone(),
            identity_file: self.ssh_key.clone(),
            preferred_auth: self.ssh_auth.clone(),
            skip_host_key_check: self.skip_host_key_check,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
