use dashmap::DashMap;
use poise::serenity_prelude::{GuildId, UserId};
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{BotError, Result};
use crate::guild::SharedGuildGateway;
use crate::managers::audit_log::SharedAuditLog;
use crate::managers::config_manager::SharedConfigManager;
use crate::managers::removal_scheduler::SharedPendingRemovals;
use crate::messages::success_message;
use crate::verification::{
    AttemptEntry, AuditEntry, VerificationClaim, VerificationConfig, VerificationMethod,
    VerificationResponse,
};

/// Lowest behavior score accepted as human
pub const MIN_BEHAVIOR_SCORE: f64 = 50.0;
/// Faster than this looks automated
pub const MIN_TIME_SPENT_SECS: f64 = 5.0;
/// Slower than this is a stale session
pub const MAX_TIME_SPENT_SECS: f64 = 300.0;
/// Score given to claims made through a Discord interaction
pub const INTERACTION_BEHAVIOR_SCORE: f64 = 100.0;

const TOKEN_TTL: Duration = Duration::from_secs(3600);

/// A simple arithmetic challenge
#[derive(Debug, Clone)]
pub struct Captcha {
    pub question: String,
    pub answer: i64,
    /// Shuffled choices, one of which is the answer
    pub options: Vec<i64>,
}

impl Captcha {
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let a: i64 = rng.random_range(2..=12);
        let b: i64 = rng.random_range(2..=12);
        let answer = a + b;

        let mut options = vec![answer];
        while options.len() < 4 {
            let candidate = answer + rng.random_range(-5..=5);
            if candidate > 0 && !options.contains(&candidate) {
                options.push(candidate);
            }
        }
        options.shuffle(&mut rng);

        Self {
            question: format!("What is {} + {}?", a, b),
            answer,
            options,
        }
    }
}

/// Identity token handed to a member who started verification
#[derive(Debug, Clone)]
pub struct PendingToken {
    pub token: String,
    pub guild_id: GuildId,
    pub user_id: UserId,
    pub user_tag: String,
    pub issued_at: Instant,
    pub captcha: Option<Captcha>,
}

/// Validates verification claims and grants the verified role
pub struct VerificationManager {
    config_manager: SharedConfigManager,
    audit_log: SharedAuditLog,
    gateway: SharedGuildGateway,
    removals: SharedPendingRemovals,

    /// Outstanding tokens (token -> pending state)
    tokens: DashMap<String, PendingToken>,
}

impl VerificationManager {
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
            tokens: DashMap::new(),
        }
    }

    /// Start a verification, replacing any earlier token of the same member
    pub fn issue_token(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        user_tag: &str,
        method: VerificationMethod,
    ) -> PendingToken {
        self.cleanup_stale_tokens();
        self.tokens
            .retain(|_, t| !(t.guild_id == guild_id && t.user_id == user_id));

        let pending = PendingToken {
            token: uuid::Uuid::new_v4().to_string(),
            guild_id,
            user_id,
            user_tag: user_tag.to_string(),
            issued_at: Instant::now(),
            captcha: (method == VerificationMethod::Captcha).then(Captcha::generate),
        };
        self.tokens.insert(pending.token.clone(), pending.clone());
        debug!(
            "Issued verification token for {} in guild {} ({} open)",
            user_tag,
            guild_id,
            self.pending_count()
        );
        pending
    }

    /// Look up an outstanding, unexpired token
    pub fn get_token(&self, token: &str) -> Option<PendingToken> {
        self.tokens
            .get(token)
            .filter(|t| t.issued_at.elapsed() < TOKEN_TTL)
            .map(|t| t.clone())
    }

    /// Complete a verification started from a Discord interaction.
    ///
    /// Elapsed time is measured here from token issue instead of being
    /// taken from the client.
    pub async fn complete_from_interaction(
        &self,
        token: &str,
        guild_id: GuildId,
        captcha_answer: Option<i64>,
    ) -> Result<VerificationResponse> {
        let time_spent = self
            .get_token(token)
            .map(|t| t.issued_at.elapsed().as_secs_f64())
            .unwrap_or(MIN_TIME_SPENT_SECS);

        let claim = VerificationClaim {
            token: token.to_string(),
            guild_id: guild_id.to_string(),
            time_spent,
            behavior_score: INTERACTION_BEHAVIOR_SCORE,
            captcha_answer,
        };
        self.complete(&claim).await
    }

    /// Validate a claim and, on success, grant the verified role.
    ///
    /// A rejected claim that carries a live token for its guild is written to
    /// the audit and attempt logs before the error is returned.
    pub async fn complete(&self, claim: &VerificationClaim) -> Result<VerificationResponse> {
        let guild_id = parse_guild_id(&claim.guild_id);
        let pending = self.get_token(&claim.token);

        let config = match self.validate(claim, guild_id, pending.as_ref()).await {
            Ok(config) => config,
            Err(e) => {
                if e.is_rejection() {
                    self.record_failure(claim, guild_id, pending.as_ref(), &e).await;
                }
                return Err(e);
            }
        };
        // validate() only succeeds with a token
        let Some(pending) = pending else {
            return Err(BotError::Internal {
                message: "validated claim without a token".to_string(),
            });
        };

        // Claim the token before granting so a concurrent submit of the same
        // token finds it gone
        if self
            .tokens
            .remove_if(&pending.token, |_, t| t.guild_id == pending.guild_id)
            .is_none()
        {
            debug!(
                guild_id = %pending.guild_id,
                user_id = %pending.user_id,
                "Verification token of {} was already redeemed",
                pending.user_tag
            );
            return Err(BotError::NotFound {
                what: "verification session".to_string(),
            });
        }

        if let Err(e) = self
            .gateway
            .add_role(pending.guild_id, pending.user_id, config.role_id)
            .await
        {
            // The member may retry with the same token
            self.tokens.insert(pending.token.clone(), pending.clone());
            return Err(e);
        }
        self.removals.cancel(pending.guild_id, pending.user_id);

        if !self
            .audit_log
            .resolve_join(pending.guild_id, pending.user_id, true)
            .await?
        {
            self.audit_log
                .append(
                    pending.guild_id,
                    AuditEntry::verify_success(pending.guild_id, pending.user_id, &pending.user_tag),
                )
                .await?;
        }
        self.audit_log
            .append_attempt(
                pending.guild_id,
                attempt(claim, &pending.guild_id, &pending.user_id.to_string(), &pending.user_tag, None),
            )
            .await?;

        info!(
            guild_id = %pending.guild_id,
            user_id = %pending.user_id,
            "{} completed verification in {:.1}s",
            pending.user_tag,
            claim.time_spent
        );

        Ok(VerificationResponse {
            success: true,
            message: success_message(),
        })
    }

    /// Checks run in order, stopping at the first failure
    async fn validate(
        &self,
        claim: &VerificationClaim,
        guild_id: Option<GuildId>,
        pending: Option<&PendingToken>,
    ) -> Result<VerificationConfig> {
        // NaN fails both checks
        if !(claim.behavior_score >= MIN_BEHAVIOR_SCORE) {
            return Err(BotError::SuspiciousBehavior {
                score: claim.behavior_score,
            });
        }
        if !(MIN_TIME_SPENT_SECS..=MAX_TIME_SPENT_SECS).contains(&claim.time_spent) {
            return Err(BotError::InvalidTiming {
                seconds: claim.time_spent,
            });
        }

        let guild_id = guild_id.ok_or_else(|| BotError::NotFound {
            what: format!("guild '{}'", claim.guild_id),
        })?;
        let pending = pending
            .filter(|p| p.guild_id == guild_id)
            .ok_or_else(|| BotError::NotFound {
                what: "verification session".to_string(),
            })?;

        let config = self
            .config_manager
            .get_config(guild_id)?
            .filter(|c| c.enabled)
            .ok_or_else(|| BotError::NotConfigured {
                guild_id: guild_id.to_string(),
            })?;

        if self
            .gateway
            .member_roles(guild_id, pending.user_id)
            .await?
            .is_none()
        {
            return Err(BotError::NotFound {
                what: format!("member {}", pending.user_id),
            });
        }

        if config.method == VerificationMethod::Captcha {
            let expected = pending.captcha.as_ref().map(|c| c.answer);
            if expected.is_none() || claim.captcha_answer != expected {
                return Err(BotError::CaptchaMismatch);
            }
        }

        Ok(config)
    }

    async fn record_failure(
        &self,
        claim: &VerificationClaim,
        guild_id: Option<GuildId>,
        pending: Option<&PendingToken>,
        error: &BotError,
    ) {
        // Only claims carrying a live token of this guild reach the logs
        let Some(pending) = pending.filter(|p| Some(p.guild_id) == guild_id) else {
            warn!(
                "Rejected verification claim without a valid session for guild '{}': {}",
                claim.guild_id, error
            );
            return;
        };
        let guild_id = pending.guild_id;
        let user_id = pending.user_id.to_string();
        let user_tag = pending.user_tag.clone();
        let reason = error.audit_reason();

        info!(
            guild_id = %guild_id,
            user_id = %user_id,
            "Verification attempt by {} rejected: {}",
            user_tag,
            error
        );

        let entry = AuditEntry::verify_fail(guild_id, &user_id, &user_tag, reason.clone());
        if let Err(e) = self.audit_log.append(guild_id, entry).await {
            warn!("Failed to record failed verification: {}", e);
        }
        let attempt = attempt(claim, &guild_id, &user_id, &user_tag, Some(reason));
        if let Err(e) = self.audit_log.append_attempt(guild_id, attempt).await {
            warn!("Failed to record verification attempt: {}", e);
        }
    }

    /// Number of outstanding tokens
    pub fn pending_count(&self) -> usize {
        self.tokens.len()
    }

    /// Drop tokens older than an hour
    pub fn cleanup_stale_tokens(&self) {
        self.tokens.retain(|_, t| t.issued_at.elapsed() < TOKEN_TTL);
    }
}

fn parse_guild_id(raw: &str) -> Option<GuildId> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0 && *id != u64::MAX)
        .map(GuildId::new)
}

fn attempt(
    claim: &VerificationClaim,
    guild_id: &GuildId,
    user_id: &str,
    user_tag: &str,
    failure: Option<String>,
) -> AttemptEntry {
    AttemptEntry {
        id: uuid::Uuid::new_v4(),
        user_id: user_id.to_string(),
        user_tag: user_tag.to_string(),
        guild_id: guild_id.to_string(),
        success: failure.is_none(),
        reason: failure,
        time_spent: claim.time_spent,
        behavior_score: claim.behavior_score,
        timestamp: chrono::Utc::now(),
    }
}

/// Shared verification manager type
pub type SharedVerificationManager = Arc<VerificationManager>;

pub fn create_shared_verification_manager(
    config_manager: SharedConfigManager,
    audit_log: SharedAuditLog,
    gateway: SharedGuildGateway,
    removals: SharedPendingRemovals,
) -> SharedVerificationManager {
    Arc::new(VerificationManager::new(config_manager, audit_log, gateway, removals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guild::gateway::mock::MockGateway;
    use crate::guild::GuildGateway;
    use crate::managers::audit_log::AuditLog;
    use crate::managers::config_manager::ConfigManager;
    use crate::managers::join_handler::{JoinHandler, MemberJoin};
    use crate::managers::removal_scheduler::PendingRemovals;
    use crate::managers::stats::guild_stats;
    use crate::state::DocumentStore;
    use crate::verification::{AuditEntryType, SettingsUpdate, VerificationSetup};
    use async_trait::async_trait;
    use poise::serenity_prelude::{ChannelId, RoleId};

    const GUILD: GuildId = GuildId::new(100);
    const CHANNEL: ChannelId = ChannelId::new(200);
    const ROLE: RoleId = RoleId::new(300);
    const USER: UserId = UserId::new(400);

    struct Harness {
        manager: VerificationManager,
        joins: JoinHandler,
        config: SharedConfigManager,
        audit: SharedAuditLog,
        gateway: Arc<MockGateway>,
        removals: SharedPendingRemovals,
    }

    async fn harness(method: VerificationMethod) -> Harness {
        let store = Arc::new(DocumentStore::in_memory());
        let config = Arc::new(ConfigManager::new(store.clone()));
        let audit = Arc::new(AuditLog::new(store));
        let gateway = Arc::new(MockGateway::new().with_channel(GUILD, CHANNEL).with_role(GUILD, ROLE));
        let removals = Arc::new(PendingRemovals::new());
        config
            .setup(
                GUILD,
                VerificationSetup {
                    channel_id: CHANNEL,
                    role_id: ROLE,
                    method,
                    dm_welcome: false,
                    welcome_message: String::new(),
                    remove_unverified: true,
                    timeout_hours: 24.0,
                },
            )
            .await
            .unwrap();
        gateway.add_member(GUILD, USER, vec![]);

        let manager = VerificationManager::new(config.clone(), audit.clone(), gateway.clone(), removals.clone());
        let joins = JoinHandler::new(config.clone(), audit.clone(), gateway.clone(), removals.clone());
        Harness {
            manager,
            joins,
            config,
            audit,
            gateway,
            removals,
        }
    }

    /// Hands control back to the runtime before every Discord call
    struct YieldingGateway(Arc<MockGateway>);

    #[async_trait]
    impl GuildGateway for YieldingGateway {
        async fn channel_exists(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<bool> {
            tokio::task::yield_now().await;
            self.0.channel_exists(guild_id, channel_id).await
        }

        async fn role_exists(&self, guild_id: GuildId, role_id: RoleId) -> Result<bool> {
            tokio::task::yield_now().await;
            self.0.role_exists(guild_id, role_id).await
        }

        async fn member_roles(&self, guild_id: GuildId, user_id: UserId) -> Result<Option<Vec<RoleId>>> {
            tokio::task::yield_now().await;
            self.0.member_roles(guild_id, user_id).await
        }

        async fn send_dm(&self, user_id: UserId, content: &str) -> Result<()> {
            tokio::task::yield_now().await;
            self.0.send_dm(user_id, content).await
        }

        async fn add_role(&self, guild_id: GuildId, user_id: UserId, role_id: RoleId) -> Result<()> {
            tokio::task::yield_now().await;
            self.0.add_role(guild_id, user_id, role_id).await
        }

        async fn kick(&self, guild_id: GuildId, user_id: UserId, reason: &str) -> Result<()> {
            tokio::task::yield_now().await;
            self.0.kick(guild_id, user_id, reason).await
        }
    }

    fn claim(token: &str, time_spent: f64, behavior_score: f64) -> VerificationClaim {
        VerificationClaim {
            token: token.to_string(),
            guild_id: GUILD.to_string(),
            time_spent,
            behavior_score,
            captcha_answer: None,
        }
    }

    fn issue(h: &Harness) -> String {
        h.manager
            .issue_token(GUILD, USER, "newbie", VerificationMethod::Button)
            .token
    }

    #[tokio::test]
    async fn test_timing_boundaries() {
        let h = harness(VerificationMethod::Button).await;

        for seconds in [4.0, 301.0, f64::NAN] {
            let token = issue(&h);
            let err = h.manager.complete(&claim(&token, seconds, 80.0)).await.unwrap_err();
            assert!(matches!(err, BotError::InvalidTiming { .. }), "{} should fail", seconds);
        }

        for seconds in [5.0, 300.0] {
            let token = issue(&h);
            let response = h.manager.complete(&claim(&token, seconds, 80.0)).await.unwrap();
            assert!(response.success, "{} should pass", seconds);
        }
    }

    #[tokio::test]
    async fn test_behavior_score_boundaries() {
        let h = harness(VerificationMethod::Button).await;

        let token = issue(&h);
        let err = h.manager.complete(&claim(&token, 30.0, 49.0)).await.unwrap_err();
        assert!(matches!(err, BotError::SuspiciousBehavior { .. }));

        let response = h.manager.complete(&claim(&token, 30.0, 50.0)).await.unwrap();
        assert!(response.success);
    }

    #[tokio::test]
    async fn test_behavior_checked_before_timing() {
        let h = harness(VerificationMethod::Button).await;
        let err = h.manager.complete(&claim("missing", 1.0, 10.0)).await.unwrap_err();
        assert!(matches!(err, BotError::SuspiciousBehavior { .. }));
    }

    #[tokio::test]
    async fn test_unknown_token_or_guild_is_not_found() {
        let h = harness(VerificationMethod::Button).await;
        let err = h.manager.complete(&claim("missing", 30.0, 80.0)).await.unwrap_err();
        assert!(matches!(err, BotError::NotFound { .. }));

        let token = issue(&h);
        let mut other_guild = claim(&token, 30.0, 80.0);
        other_guild.guild_id = "555".to_string();
        let err = h.manager.complete(&other_guild).await.unwrap_err();
        assert!(matches!(err, BotError::NotFound { .. }));

        h.gateway.remove_member(GUILD, USER);
        let err = h.manager.complete(&claim(&token, 30.0, 80.0)).await.unwrap_err();
        assert!(matches!(err, BotError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_success_grants_role_cancels_timer_and_resolves_join() {
        let h = harness(VerificationMethod::Button).await;
        h.joins
            .on_member_join(MemberJoin {
                guild_id: GUILD,
                user_id: USER,
                user_tag: "newbie".to_string(),
            })
            .await;
        assert!(h.removals.is_armed(GUILD, USER));

        let token = issue(&h);
        h.manager.complete(&claim(&token, 20.0, 90.0)).await.unwrap();

        assert!(h.gateway.has_role(GUILD, USER, ROLE));
        assert!(!h.removals.is_armed(GUILD, USER));

        let entries = h.audit.entries(GUILD).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entry_type, AuditEntryType::MemberJoin);
        assert_eq!(entries[0].success, Some(true));

        let attempts = h.audit.attempts(GUILD).unwrap();
        assert_eq!(attempts.len(), 1);
        assert!(attempts[0].success);

        // Tokens are single use
        let err = h.manager.complete(&claim(&token, 20.0, 90.0)).await.unwrap_err();
        assert!(matches!(err, BotError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_success_without_join_entry_appends_success() {
        let h = harness(VerificationMethod::Button).await;
        let token = issue(&h);
        h.manager.complete(&claim(&token, 20.0, 90.0)).await.unwrap();

        let entries = h.audit.entries(GUILD).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entry_type, AuditEntryType::VerifySuccess);
        assert_eq!(entries[0].success, Some(true));
    }

    #[tokio::test]
    async fn test_failures_are_logged_and_counted() {
        let h = harness(VerificationMethod::Button).await;
        let token = issue(&h);
        let _ = h.manager.complete(&claim(&token, 2.0, 90.0)).await;

        let entries = h.audit.entries(GUILD).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entry_type, AuditEntryType::VerifyFail);
        assert_eq!(entries[0].user_id, USER.to_string());
        assert_eq!(entries[0].reason.as_deref(), Some("invalid_timing"));

        let stats = guild_stats(&h.audit, GUILD).unwrap();
        assert_eq!(stats.failed_attempts, 1);

        // The member keeps the token and may retry
        assert!(h.manager.get_token(&token).is_some());
        assert!(!h.gateway.has_role(GUILD, USER, ROLE));
    }

    #[tokio::test]
    async fn test_disabled_guild_is_not_configured() {
        let h = harness(VerificationMethod::Button).await;
        let token = issue(&h);
        h.config.toggle_enabled(GUILD).await.unwrap();

        let err = h.manager.complete(&claim(&token, 20.0, 90.0)).await.unwrap_err();
        assert!(matches!(err, BotError::NotConfigured { .. }));
    }

    #[tokio::test]
    async fn test_captcha_answer_required() {
        let h = harness(VerificationMethod::Captcha).await;
        let pending = h
            .manager
            .issue_token(GUILD, USER, "newbie", VerificationMethod::Captcha);
        let captcha = pending.captcha.clone().unwrap();
        assert!(captcha.options.contains(&captcha.answer));
        assert_eq!(captcha.options.len(), 4);

        let mut wrong = claim(&pending.token, 20.0, 90.0);
        wrong.captcha_answer = Some(captcha.answer + 1);
        let err = h.manager.complete(&wrong).await.unwrap_err();
        assert!(matches!(err, BotError::CaptchaMismatch));

        let mut right = claim(&pending.token, 20.0, 90.0);
        right.captcha_answer = Some(captcha.answer);
        assert!(h.manager.complete(&right).await.unwrap().success);
    }

    #[tokio::test]
    async fn test_method_switch_invalidates_button_token() {
        let h = harness(VerificationMethod::Button).await;
        let token = issue(&h);
        h.config
            .update_settings(
                GUILD,
                &SettingsUpdate {
                    method: Some(VerificationMethod::Captcha),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = h.manager.complete(&claim(&token, 20.0, 90.0)).await.unwrap_err();
        assert!(matches!(err, BotError::CaptchaMismatch));
    }

    #[tokio::test]
    async fn test_reissue_replaces_previous_token() {
        let h = harness(VerificationMethod::Button).await;
        let first = issue(&h);
        let second = issue(&h);
        assert_ne!(first, second);
        assert!(h.manager.get_token(&first).is_none());
        assert_eq!(h.manager.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_submits_redeem_token_once() {
        let h = harness(VerificationMethod::Button).await;
        let manager = VerificationManager::new(
            h.config.clone(),
            h.audit.clone(),
            Arc::new(YieldingGateway(h.gateway.clone())),
            h.removals.clone(),
        );
        let token = manager
            .issue_token(GUILD, USER, "newbie", VerificationMethod::Button)
            .token;
        let c = claim(&token, 20.0, 90.0);

        let (first, second) = tokio::join!(manager.complete(&c), manager.complete(&c));
        assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);
        let err = first.err().or(second.err()).unwrap();
        assert!(matches!(err, BotError::NotFound { .. }));

        let entries = h.audit.entries(GUILD).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entry_type, AuditEntryType::VerifySuccess);
        let attempts = h.audit.attempts(GUILD).unwrap();
        assert_eq!(attempts.iter().filter(|a| a.success).count(), 1);
        assert_eq!(attempts.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_token_is_rejected() {
        let h = harness(VerificationMethod::Button).await;
        let token = issue(&h);

        tokio::time::sleep(Duration::from_secs(59 * 60)).await;
        assert!(h.manager.get_token(&token).is_some());

        tokio::time::sleep(Duration::from_secs(2 * 60)).await;
        assert!(h.manager.get_token(&token).is_none());
        let err = h.manager.complete(&claim(&token, 20.0, 90.0)).await.unwrap_err();
        assert!(matches!(err, BotError::NotFound { .. }));
        assert!(!h.gateway.has_role(GUILD, USER, ROLE));
    }

    #[tokio::test]
    async fn test_claims_without_session_are_not_logged() {
        let h = harness(VerificationMethod::Button).await;

        let _ = h.manager.complete(&claim("missing", 2.0, 90.0)).await;
        let _ = h.manager.complete(&claim("missing", 20.0, 10.0)).await;

        let mut unconfigured = claim("missing", 20.0, 90.0);
        unconfigured.guild_id = "555".to_string();
        let _ = h.manager.complete(&unconfigured).await;

        // A real token presented for another guild is not a session there
        let token = issue(&h);
        let mut other_guild = claim(&token, 20.0, 90.0);
        other_guild.guild_id = "555".to_string();
        let _ = h.manager.complete(&other_guild).await;

        assert!(h.audit.entries(GUILD).unwrap().is_empty());
        assert!(h.audit.attempts(GUILD).unwrap().is_empty());
        assert!(h.audit.entries(GuildId::new(555)).unwrap().is_empty());
        assert!(h.audit.attempts(GuildId::new(555)).unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_interaction_measures_time_server_side() {
        let h = harness(VerificationMethod::Button).await;

        let token = issue(&h);
        let err = h
            .manager
            .complete_from_interaction(&token, GUILD, None)
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::InvalidTiming { .. }));

        tokio::time::sleep(Duration::from_secs(6)).await;
        let response = h
            .manager
            .complete_from_interaction(&token, GUILD, None)
            .await
            .unwrap();
        assert!(response.success);
    }
}
