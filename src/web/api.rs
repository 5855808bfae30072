//! JSON endpoints: claim completion and the dashboard API

use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use poise::serenity_prelude::GuildId;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::server::AppState;
use crate::error::BotError;
use crate::logging::LogEntry;
use crate::managers::guild_stats;
use crate::verification::{
    AttemptEntry, AuditEntry, SettingsUpdate, VerificationClaim, VerificationConfig,
    VerificationResponse, VerificationStats,
};

const RECENT_LOGS: usize = 20;
const RECENT_ATTEMPTS: usize = 10;
const DEFAULT_LOG_LINES: usize = 100;
const MAX_LOG_LINES: usize = 1000;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/api/verification/complete", post(complete_verification))
        .route(
            "/api/guilds/:guild_id/verification",
            get(dashboard).post(dashboard_action),
        )
        .route("/api/logs", get(recent_logs))
}

/// Failure of a dashboard request
#[derive(Debug)]
enum ApiError {
    Unauthorized,
    BadRequest(String),
    Bot(BotError),
}

impl From<BotError> for ApiError {
    fn from(e: BotError) -> Self {
        ApiError::Bot(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Missing or invalid API key".to_string()),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Bot(e) => (status_for(&e), e.to_string()),
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("API request failed: {}", message);
        }
        (status, Json(serde_json::json!({ "success": false, "error": message }))).into_response()
    }
}

/// HTTP status for a domain error
fn status_for(error: &BotError) -> StatusCode {
    match error {
        BotError::InvalidTiming { .. } | BotError::ConfigValidation { .. } => StatusCode::BAD_REQUEST,
        BotError::SuspiciousBehavior { .. } | BotError::CaptchaMismatch => StatusCode::FORBIDDEN,
        BotError::NotFound { .. } => StatusCode::NOT_FOUND,
        BotError::NotConfigured { .. } => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

fn require_api_key(headers: &HeaderMap, state: &AppState) -> Result<(), ApiError> {
    match &state.api_key {
        None => Ok(()),
        Some(key) if bearer_token(headers) == Some(&**key) => Ok(()),
        Some(_) => {
            warn!("Rejected dashboard request with missing or invalid API key");
            Err(ApiError::Unauthorized)
        }
    }
}

fn parse_guild_path(raw: &str) -> Result<GuildId, ApiError> {
    raw.parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .map(GuildId::new)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid guild id: {}", raw)))
}

/// POST /api/verification/complete
async fn complete_verification(
    State(state): State<AppState>,
    Json(claim): Json<VerificationClaim>,
) -> Response {
    match state.verification_manager.complete(&claim).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            let status = status_for(&e);
            if status == StatusCode::INTERNAL_SERVER_ERROR {
                error!(guild_id = %claim.guild_id, "Verification completion failed: {}", e);
            }
            let body = VerificationResponse {
                success: false,
                message: e.to_string(),
            };
            (status, Json(body)).into_response()
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DashboardView {
    config: Option<VerificationConfig>,
    stats: VerificationStats,
    recent_logs: Vec<AuditEntry>,
    recent_attempts: Vec<AttemptEntry>,
}

/// GET /api/guilds/{guildId}/verification
async fn dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(guild_id): Path<String>,
) -> Result<Json<DashboardView>, ApiError> {
    require_api_key(&headers, &state)?;
    let guild_id = parse_guild_path(&guild_id)?;

    Ok(Json(DashboardView {
        config: state.config_manager.get_config(guild_id)?,
        stats: guild_stats(&state.audit_log, guild_id)?,
        recent_logs: state.audit_log.recent(guild_id, RECENT_LOGS)?,
        recent_attempts: state.audit_log.recent_attempts(guild_id, RECENT_ATTEMPTS)?,
    }))
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum DashboardAction {
    UpdateSettings,
    ToggleEnabled,
    ClearLogs,
}

#[derive(Debug, Deserialize)]
struct ActionRequest {
    action: DashboardAction,
    #[serde(default)]
    settings: Option<SettingsUpdate>,
}

#[derive(Debug, Serialize)]
struct ActionResponse {
    success: bool,
    config: Option<VerificationConfig>,
}

/// POST /api/guilds/{guildId}/verification
async fn dashboard_action(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(guild_id): Path<String>,
    Json(request): Json<ActionRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    require_api_key(&headers, &state)?;
    let guild_id = parse_guild_path(&guild_id)?;

    let config = match request.action {
        DashboardAction::UpdateSettings => {
            let settings = request
                .settings
                .ok_or_else(|| ApiError::BadRequest("update_settings requires settings".to_string()))?;
            Some(state.config_manager.update_settings(guild_id, &settings).await?)
        }
        DashboardAction::ToggleEnabled => Some(state.config_manager.toggle_enabled(guild_id).await?),
        DashboardAction::ClearLogs => {
            state.config_manager.clear_logs(guild_id).await?;
            state.config_manager.get_config(guild_id)?
        }
    };

    info!(guild_id = %guild_id, "Dashboard action {:?} applied", request.action);
    Ok(Json(ActionResponse {
        success: true,
        config,
    }))
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    count: Option<usize>,
    guild_id: Option<String>,
}

/// GET /api/logs?count=n&guild_id=g
async fn recent_logs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Vec<LogEntry>>, ApiError> {
    require_api_key(&headers, &state)?;
    let count = query.count.unwrap_or(DEFAULT_LOG_LINES).min(MAX_LOG_LINES);
    Ok(Json(state.log_buffer.get_recent(count, query.guild_id.as_deref())))
}
