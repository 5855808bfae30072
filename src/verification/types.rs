// src/verification/types.rs
use chrono::{DateTime, Utc};
use poise::serenity_prelude::{ChannelId, GuildId, RoleId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::{BotError, Result};

/// Current schema version of [`VerificationConfig`]
pub const CONFIG_VERSION: u32 = 1;

/// How a member proves they are human
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, poise::ChoiceParameter)]
#[serde(rename_all = "lowercase")]
pub enum VerificationMethod {
    #[name = "Button"]
    Button,
    #[name = "Captcha"]
    Captcha,
}

impl Default for VerificationMethod {
    fn default() -> Self {
        VerificationMethod::Button
    }
}

/// Per-guild verification settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationConfig {
    /// Schema version for migrations
    #[serde(default = "default_version")]
    pub version: u32,
    pub guild_id: GuildId,
    pub enabled: bool,
    pub channel_id: ChannelId,
    pub role_id: RoleId,
    #[serde(default)]
    pub method: VerificationMethod,
    pub dm_welcome: bool,
    #[serde(default)]
    pub welcome_message: String,
    pub remove_unverified: bool,
    pub timeout_hours: f64,
    pub updated_at: DateTime<Utc>,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

impl VerificationConfig {
    /// Build a fresh, enabled config from `/verify setup` input
    pub fn new(guild_id: GuildId, setup: VerificationSetup) -> Result<Self> {
        let config = Self {
            version: CONFIG_VERSION,
            guild_id,
            enabled: true,
            channel_id: setup.channel_id,
            role_id: setup.role_id,
            method: setup.method,
            dm_welcome: setup.dm_welcome,
            welcome_message: setup.welcome_message,
            remove_unverified: setup.remove_unverified,
            timeout_hours: setup.timeout_hours,
            updated_at: Utc::now(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants a stored config must uphold
    pub fn validate(&self) -> Result<()> {
        if self.remove_unverified && !(self.timeout_hours.is_finite() && self.timeout_hours > 0.0) {
            return Err(BotError::ConfigValidation {
                message: format!(
                    "timeoutHours must be greater than 0 when removeUnverified is set (got {})",
                    self.timeout_hours
                ),
            });
        }
        if !self.timeout_hours.is_finite() || self.timeout_hours < 0.0 {
            return Err(BotError::ConfigValidation {
                message: format!("timeoutHours must be a non-negative number (got {})", self.timeout_hours),
            });
        }
        Ok(())
    }

    /// Merge the present fields of `update`. Does not validate or stamp.
    pub fn apply(&mut self, update: &SettingsUpdate) {
        if let Some(channel_id) = update.channel_id {
            self.channel_id = channel_id;
        }
        if let Some(role_id) = update.role_id {
            self.role_id = role_id;
        }
        if let Some(method) = update.method {
            self.method = method;
        }
        if let Some(dm_welcome) = update.dm_welcome {
            self.dm_welcome = dm_welcome;
        }
        if let Some(message) = &update.welcome_message {
            self.welcome_message = message.clone();
        }
        if let Some(remove) = update.remove_unverified {
            self.remove_unverified = remove;
        }
        if let Some(hours) = update.timeout_hours {
            self.timeout_hours = hours;
        }
    }

    /// Set `updated_at` to now, keeping it strictly increasing
    pub fn touch(&mut self) {
        let now = Utc::now();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + chrono::Duration::milliseconds(1)
        };
    }

    /// Timeout before an unverified member is removed
    pub fn removal_delay(&self) -> std::time::Duration {
        // Out-of-range values never fire
        std::time::Duration::try_from_secs_f64(self.timeout_hours * 3600.0)
            .unwrap_or(std::time::Duration::MAX)
    }
}

/// Input for creating a verification config
#[derive(Debug, Clone)]
pub struct VerificationSetup {
    pub channel_id: ChannelId,
    pub role_id: RoleId,
    pub method: VerificationMethod,
    pub dm_welcome: bool,
    pub welcome_message: String,
    pub remove_unverified: bool,
    pub timeout_hours: f64,
}

/// Partial settings; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub channel_id: Option<ChannelId>,
    pub role_id: Option<RoleId>,
    pub method: Option<VerificationMethod>,
    pub dm_welcome: Option<bool>,
    pub welcome_message: Option<String>,
    pub remove_unverified: Option<bool>,
    pub timeout_hours: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEntryType {
    MemberJoin,
    VerifySuccess,
    VerifyFail,
}

/// One join/verify lifecycle event.
///
/// Users are stored as an id plus the tag they had at the time, so history
/// keeps showing the name a member joined with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: uuid::Uuid,
    pub user_id: String,
    pub user_tag: String,
    #[serde(rename = "type")]
    pub entry_type: AuditEntryType,
    /// `None` while a join is still pending
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub guild_id: String,
}

impl AuditEntry {
    pub fn member_join(guild_id: GuildId, user_id: UserId, user_tag: &str) -> Self {
        Self::new(guild_id, &user_id.to_string(), user_tag, AuditEntryType::MemberJoin, None, None)
    }

    pub fn verify_success(guild_id: GuildId, user_id: UserId, user_tag: &str) -> Self {
        Self::new(
            guild_id,
            &user_id.to_string(),
            user_tag,
            AuditEntryType::VerifySuccess,
            Some(true),
            None,
        )
    }

    pub fn verify_fail(guild_id: GuildId, user_id: &str, user_tag: &str, reason: String) -> Self {
        Self::new(
            guild_id,
            user_id,
            user_tag,
            AuditEntryType::VerifyFail,
            Some(false),
            Some(reason),
        )
    }

    fn new(
        guild_id: GuildId,
        user_id: &str,
        user_tag: &str,
        entry_type: AuditEntryType,
        success: Option<bool>,
        reason: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            user_id: user_id.to_string(),
            user_tag: user_tag.to_string(),
            entry_type,
            success,
            reason,
            timestamp: Utc::now(),
            guild_id: guild_id.to_string(),
        }
    }
}

/// One completion attempt, successful or not
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptEntry {
    pub id: uuid::Uuid,
    pub user_id: String,
    pub user_tag: String,
    pub guild_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub time_spent: f64,
    pub behavior_score: f64,
    pub timestamp: DateTime<Utc>,
}

/// Inbound verification-completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationClaim {
    pub token: String,
    pub guild_id: String,
    /// Seconds between the page being shown and the claim being sent
    pub time_spent: f64,
    /// 0-100, higher looks more human
    pub behavior_score: f64,
    #[serde(default)]
    pub captcha_answer: Option<i64>,
}

/// Reply to a verification-completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResponse {
    pub success: bool,
    pub message: String,
}

/// Derived dashboard numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct VerificationStats {
    pub total_verifications: usize,
    pub pending_verifications: usize,
    pub failed_attempts: usize,
    pub verification_rate: u32,
}
