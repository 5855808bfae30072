use poise::serenity_prelude::GuildId;

use crate::error::Result;
use crate::managers::audit_log::AuditLog;
use crate::verification::{AttemptEntry, AuditEntry, VerificationStats};

/// Derive dashboard numbers from a scan of both logs.
///
/// The logs are capped, so this is recomputed on every request.
pub fn compute_stats(entries: &[AuditEntry], attempts: &[AttemptEntry]) -> VerificationStats {
    let successful = entries.iter().filter(|e| e.success == Some(true)).count();
    let pending = entries.iter().filter(|e| e.success.is_none()).count();
    let failed_attempts = attempts.iter().filter(|a| !a.success).count();

    let verification_rate = if entries.is_empty() {
        0
    } else {
        (successful as f64 / entries.len() as f64 * 100.0).round() as u32
    };

    VerificationStats {
        total_verifications: successful,
        pending_verifications: pending,
        failed_attempts,
        verification_rate,
    }
}

/// Stats for one guild
pub fn guild_stats(audit_log: &AuditLog, guild_id: GuildId) -> Result<VerificationStats> {
    let entries = audit_log.entries(guild_id)?;
    let attempts = audit_log.attempts(guild_id)?;
    Ok(compute_stats(&entries, &attempts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use poise::serenity_prelude::UserId;

    fn attempt(success: bool) -> AttemptEntry {
        AttemptEntry {
            id: uuid::Uuid::new_v4(),
            user_id: "1".to_string(),
            user_tag: "one".to_string(),
            guild_id: "1".to_string(),
            success,
            reason: None,
            time_spent: 10.0,
            behavior_score: 80.0,
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_stats_from_mixed_log() {
        let guild = GuildId::new(1);
        let mut entries = Vec::new();
        for user in 1..=3 {
            let mut entry = AuditEntry::member_join(guild, UserId::new(user), "member");
            entry.success = Some(true);
            entries.push(entry);
        }
        entries.push(AuditEntry::member_join(guild, UserId::new(4), "pending"));
        entries.push(AuditEntry::verify_fail(guild, "5", "bot", "suspicious_behavior".to_string()));

        let stats = compute_stats(&entries, &[attempt(false), attempt(true)]);
        assert_eq!(stats.total_verifications, 3);
        assert_eq!(stats.pending_verifications, 1);
        assert_eq!(stats.failed_attempts, 1);
        assert_eq!(stats.verification_rate, 60);
    }

    #[test]
    fn test_empty_log_has_zero_rate() {
        assert_eq!(compute_stats(&[], &[]), VerificationStats::default());
    }

    #[test]
    fn test_rate_rounds() {
        let guild = GuildId::new(1);
        let mut verified = AuditEntry::member_join(guild, UserId::new(1), "a");
        verified.success = Some(true);
        let entries = vec![
            verified,
            AuditEntry::member_join(guild, UserId::new(2), "b"),
            AuditEntry::member_join(guild, UserId::new(3), "c"),
        ];
        // 1/3 -> 33.3
        assert_eq!(compute_stats(&entries, &[]).verification_rate, 33);
    }
}
