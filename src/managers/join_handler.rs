use poise::serenity_prelude::{GuildId, UserId};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{BotError, Result};
use crate::guild::SharedGuildGateway;
use crate::managers::audit_log::SharedAuditLog;
use crate::managers::config_manager::SharedConfigManager;
use crate::managers::removal_scheduler::SharedPendingRemovals;
use crate::messages::{removal_warning, welcome_dm};
use crate::verification::{AuditEntry, VerificationConfig};

pub const REMOVAL_REASON: &str = "Failed to verify within time limit";

/// A member-joined event
#[derive(Debug, Clone)]
pub struct MemberJoin {
    pub guild_id: GuildId,
    pub user_id: UserId,
    pub user_tag: String,
}

/// What the join handler did with an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Verification is off or not set up for the guild
    Skipped,
    /// Member already holds the verified role
    AlreadyVerified,
    /// Member is now pending verification
    Pending { removal_armed: bool },
}

/// Reacts to members joining: DM, removal timer, audit entry
pub struct JoinHandler {
    config_manager: SharedConfigManager,
    audit_log: SharedAuditLog,
    gateway: SharedGuildGateway,
    removals: SharedPendingRemovals,
}

impl JoinHandler {
    pub fn new(
        config_manager: SharedConfigManager,
        audit_log: SharedAuditLog,
        gateway: SharedGuildGateway,
        removals: SharedPendingRemovals,
    ) -> Self {
        Self {
            config_manager,
            audit_log,
            gateway,
            removals,
        }
    }

    /// Handle a join. Never fails: errors are logged and the event dropped.
    pub async fn on_member_join(&self, join: MemberJoin) -> JoinOutcome {
        let config = match self.config_manager.get_config(join.guild_id) {
            Ok(Some(config)) if config.enabled => config,
            Ok(_) => return JoinOutcome::Skipped,
            Err(e) => {
                error!("Failed to load verification config for guild {}: {}", join.guild_id, e);
                return JoinOutcome::Skipped;
            }
        };

        match self.process_join(&join, &config).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    "Failed to handle join of {} ({}) in guild {}: {}",
                    join.user_tag, join.user_id, join.guild_id, e
                );
                JoinOutcome::Skipped
            }
        }
    }

    async fn process_join(&self, join: &MemberJoin, config: &VerificationConfig) -> Result<JoinOutcome> {
        let guild_id = join.guild_id;

        if !self.gateway.channel_exists(guild_id, config.channel_id).await? {
            return Err(BotError::StaleReference {
                kind: "channel",
                id: config.channel_id.to_string(),
                guild_id: guild_id.to_string(),
            });
        }
        if !self.gateway.role_exists(guild_id, config.role_id).await? {
            return Err(BotError::StaleReference {
                kind: "role",
                id: config.role_id.to_string(),
                guild_id: guild_id.to_string(),
            });
        }

        let roles = self.gateway.member_roles(guild_id, join.user_id).await?;
        if roles.map(|r| r.contains(&config.role_id)).unwrap_or(false) {
            debug!("{} rejoined guild {} already verified", join.user_tag, guild_id);
            return Ok(JoinOutcome::AlreadyVerified);
        }

        if config.dm_welcome {
            let mut content = welcome_dm(&join.user_tag, &config.welcome_message, config.channel_id);
            if config.remove_unverified {
                content.push('\n');
                content.push_str(&removal_warning(config.timeout_hours));
            }
            if let Err(e) = self.gateway.send_dm(join.user_id, &content).await {
                warn!("Verification DM not delivered to {}: {}", join.user_tag, e);
            }
        }

        // No removal is armed for a join that never made it into the log
        self.audit_log
            .append(guild_id, AuditEntry::member_join(guild_id, join.user_id, &join.user_tag))
            .await?;

        let removal_armed = config.remove_unverified;
        if removal_armed {
            if self.removals.is_armed(guild_id, join.user_id) {
                debug!("Replacing pending removal of {} in guild {}", join.user_tag, guild_id);
            }
            self.arm_removal(join, config);
        }

        info!(
            guild_id = %guild_id,
            user_id = %join.user_id,
            "{} joined and is pending verification",
            join.user_tag
        );
        Ok(JoinOutcome::Pending { removal_armed })
    }

    fn arm_removal(&self, join: &MemberJoin, config: &VerificationConfig) {
        let gateway = Arc::clone(&self.gateway);
        let audit_log = Arc::clone(&self.audit_log);
        let role_id = config.role_id;
        let join = join.clone();

        self.removals.arm(
            join.guild_id,
            join.user_id,
            config.removal_delay(),
            async move {
                // Re-check at fire time: the member may have verified or left
                let roles = match gateway.member_roles(join.guild_id, join.user_id).await {
                    Ok(Some(roles)) => roles,
                    Ok(None) => {
                        debug!("{} left guild {} before the deadline", join.user_tag, join.guild_id);
                        return;
                    }
                    Err(e) => {
                        warn!("Could not re-check {} before removal: {}", join.user_tag, e);
                        return;
                    }
                };
                if roles.contains(&role_id) {
                    return;
                }

                if let Err(e) = gateway.kick(join.guild_id, join.user_id, REMOVAL_REASON).await {
                    warn!("Failed to remove unverified {} from guild {}: {}", join.user_tag, join.guild_id, e);
                    return;
                }
                info!("Removed unverified {} from guild {}", join.user_tag, join.guild_id);

                if let Err(e) = audit_log.resolve_join(join.guild_id, join.user_id, false).await {
                    warn!("Failed to settle join of removed {}: {}", join.user_tag, e);
                }
                let entry = AuditEntry::verify_fail(
                    join.guild_id,
                    &join.user_id.to_string(),
                    &join.user_tag,
                    REMOVAL_REASON.to_string(),
                );
                if let Err(e) = audit_log.append(join.guild_id, entry).await {
                    warn!("Failed to record removal of {}: {}", join.user_tag, e);
                }
            },
        );
    }
}

/// Shared join handler type
pub type SharedJoinHandler = Arc<JoinHandler>;

pub fn create_shared_join_handler(
    config_manager: SharedConfigManager,
    audit_log: SharedAuditLog,
    gateway: SharedGuildGateway,
    removals: SharedPendingRemovals,
) -> SharedJoinHandler {
    Arc::new(JoinHandler::new(config_manager, audit_log, gateway, removals))
}
