//! Router and listener for the verification web server

use axum::{
    extract::{Path, State},
    http::{header, Method},
    response::Html,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};

use super::api::api_router;
use super::pages::{error_page, verification_page};
use crate::logging::SharedLogBuffer;
use crate::managers::{SharedAuditLog, SharedConfigManager, SharedVerificationManager};

/// Shared state for web handlers
#[derive(Clone)]
pub struct AppState {
    pub config_manager: SharedConfigManager,
    pub audit_log: SharedAuditLog,
    pub verification_manager: SharedVerificationManager,
    pub log_buffer: SharedLogBuffer,
    /// Bearer token for the dashboard API; open when unset
    pub api_key: Option<Arc<str>>,
}

/// Build the full application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/verify/:token", get(verify_page))
        .merge(api_router())
        .layer(cors)
        .with_state(state)
}

/// Serve plain HTTP on `port`; TLS is expected to be terminated in front
pub async fn start_web_server(port: u16, state: AppState) -> anyhow::Result<()> {
    if state.api_key.is_none() {
        info!("DASHBOARD_API_KEY not set, dashboard API is unauthenticated");
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Web server listening on http://{}", addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Health check endpoint
async fn health() -> &'static str {
    "Verification Server Running"
}

/// GET /verify/{token} - Show verification page
async fn verify_page(State(state): State<AppState>, Path(token): Path<String>) -> Html<String> {
    match state.verification_manager.get_token(&token) {
        Some(pending) => {
            debug!(
                guild_id = %pending.guild_id,
                user_id = %pending.user_id,
                "Verification page served"
            );
            Html(verification_page(
                &pending.token,
                &pending.guild_id.to_string(),
                pending.captcha.as_ref().map(|c| c.question.as_str()),
            ))
        }
        None => Html(error_page(
            "This verification link is invalid or has expired. Press Verify in Discord to get a new one.",
        )),
    }
}
