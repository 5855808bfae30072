use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    // Configuration errors
    #[error("Verification is not configured for guild {guild_id}")]
    NotConfigured { guild_id: String },

    #[error("Invalid verification config: {message}")]
    ConfigValidation { message: String },

    #[error("Configured {kind} {id} no longer exists in guild {guild_id}")]
    StaleReference {
        kind: &'static str,
        id: String,
        guild_id: String,
    },

    #[error("Failed to parse state file '{path}': {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    // State errors
    #[error("Failed to save state to '{path}': {source}")]
    StateSave {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load state from '{path}': {source}")]
    StateLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // Verification errors
    #[error("Suspicious behavior detected (score {score})")]
    SuspiciousBehavior { score: f64 },

    #[error("Verification took {seconds}s, outside the allowed window")]
    InvalidTiming { seconds: f64 },

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Captcha answer was incorrect")]
    CaptchaMismatch,

    // Discord errors
    #[error("Could not deliver direct message to {user_id}: {message}")]
    DeliveryFailure { user_id: String, message: String },

    #[error("Discord API error: {message}")]
    Discord { message: String },

    // Generic errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl BotError {
    /// Short reason recorded in the audit log for a failed attempt
    pub fn audit_reason(&self) -> String {
        match self {
            BotError::SuspiciousBehavior { .. } => "suspicious_behavior".to_string(),
            BotError::InvalidTiming { .. } => "invalid_timing".to_string(),
            BotError::NotFound { .. } => "not_found".to_string(),
            BotError::NotConfigured { .. } => "not_configured".to_string(),
            BotError::CaptchaMismatch => "captcha_mismatch".to_string(),
            other => other.to_string(),
        }
    }

    /// Whether the error was caused by the request rather than by the bot
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            BotError::SuspiciousBehavior { .. }
                | BotError::InvalidTiming { .. }
                | BotError::NotFound { .. }
                | BotError::NotConfigured { .. }
                | BotError::CaptchaMismatch
                | BotError::ConfigValidation { .. }
        )
    }
}

impl From<serenity::Error> for BotError {
    fn from(err: serenity::Error) -> Self {
        BotError::Discord {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for BotError {
    fn from(err: std::io::Error) -> Self {
        BotError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        BotError::Internal {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;

use poise::serenity_prelude as serenity;
