//! HTTP boundary: bootstrap page, client assets, WebSocket upgrade,
//! metrics, and health.
//!
//! Everything terminal-facing hangs off the configured base path; only the
//! health probe lives at the root.

use std::path::PathBuf;

use axum::Router;
use axum::extract::{State, WebSocketUpgrade};
use axum::http::{HeaderMap, header};
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::html;
use crate::session::{self, ServerContext};
use crate::transport::WsTransport;

/// Shared state for all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub ctx: ServerContext,
    pub metrics: PrometheusHandle,
}

/// Build the application router.
pub fn router(ctx: ServerContext, metrics: PrometheusHandle, assets: Option<PathBuf>) -> Router {
    let base = ctx.options.base_path.clone();
    let state = AppState { ctx, metrics };

    let mut app = Router::new()
        .route(&base, get(page_handler))
        .route(&format!("{}/ws", base), get(ws_handler))
        .route(&format!("{}/metrics", base), get(metrics_handler))
        .route("/health", get(health_handler));

    if let Some(dir) = assets {
        app = app.nest_service(&format!("{}/client", base), ServeDir::new(dir));
    }

    app.with_state(state).layer(TraceLayer::new_for_http())
}

async fn page_handler(State(state): State<AppState>) -> Html<String> {
    let options = &state.ctx.options;
    Html(html::render(
        &options.title,
        &options.base_path,
        options.allow_iframe,
    ))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> impl IntoResponse {
    // The browser sends the page URL (token included) as the Referer; that
    // is what the signature gate verifies.
    let referer = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    debug!(has_referer = referer.is_some(), "WebSocket upgrade requested");

    ws.on_upgrade(move |socket| async move {
        session::run(WsTransport::new(socket), referer, state.ctx).await;
    })
}

async fn metrics_handler(State(state): State<AppState>) -> String {
    state.metrics.render()
}

async fn health_handler() -> &'static str {
    "ok"
}
