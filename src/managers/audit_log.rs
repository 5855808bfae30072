//! Append-only, size-capped verification history per guild.
//!
//! Two logs are kept: the audit log of join/verify events and the log of
//! completion attempts. Both keep only the newest [`MAX_LOG_ENTRIES`].

use poise::serenity_prelude::{GuildId, UserId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;
use crate::state::{Collection, SharedDocumentStore};
use crate::verification::{AttemptEntry, AuditEntry, AuditEntryType};

/// Maximum entries kept per guild in each log
pub const MAX_LOG_ENTRIES: usize = 1000;

/// Stored form of the audit log, oldest entry first
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditLogDocument {
    pub entries: Vec<AuditEntry>,
}

/// Stored form of the attempt log, oldest entry first
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttemptLog {
    pub entries: Vec<AttemptEntry>,
}

fn push_capped<T>(entries: &mut Vec<T>, entry: T, cap: usize) {
    entries.push(entry);
    if entries.len() > cap {
        let excess = entries.len() - cap;
        entries.drain(..excess);
    }
}

fn newest_first<T: Clone>(entries: &[T], count: usize) -> Vec<T> {
    entries.iter().rev().take(count).cloned().collect()
}

pub struct AuditLog {
    store: SharedDocumentStore,
    cap: usize,
}

impl AuditLog {
    pub fn new(store: SharedDocumentStore) -> Self {
        Self::with_capacity(store, MAX_LOG_ENTRIES)
    }

    pub fn with_capacity(store: SharedDocumentStore, cap: usize) -> Self {
        Self { store, cap }
    }

    /// Append an entry, evicting the oldest beyond the cap
    pub async fn append(&self, guild_id: GuildId, entry: AuditEntry) -> Result<()> {
        debug!(
            "Audit {:?} for user {} in guild {}",
            entry.entry_type, entry.user_id, guild_id
        );
        let cap = self.cap;
        self.store
            .modify::<AuditLogDocument, _, _>(Collection::VerificationLogs, guild_id, |log| {
                push_capped(&mut log.entries, entry, cap)
            })?;
        self.persist().await;
        Ok(())
    }

    /// Settle the newest pending join of `user_id` as verified or failed.
    ///
    /// Returns false when there is no pending join to resolve, e.g. the
    /// member joined before verification was enabled.
    pub async fn resolve_join(&self, guild_id: GuildId, user_id: UserId, verified: bool) -> Result<bool> {
        let user_id = user_id.to_string();
        let resolved = self
            .store
            .modify::<AuditLogDocument, _, _>(Collection::VerificationLogs, guild_id, |log| {
                match log.entries.iter_mut().rev().find(|e| {
                    e.entry_type == AuditEntryType::MemberJoin
                        && e.success.is_none()
                        && e.user_id == user_id
                }) {
                    Some(entry) => {
                        entry.success = Some(verified);
                        true
                    }
                    None => false,
                }
            })?;
        if resolved {
            self.persist().await;
        }
        Ok(resolved)
    }

    /// Most recent `count` entries, newest first
    pub fn recent(&self, guild_id: GuildId, count: usize) -> Result<Vec<AuditEntry>> {
        Ok(newest_first(&self.entries(guild_id)?, count))
    }

    /// All entries, oldest first
    pub fn entries(&self, guild_id: GuildId) -> Result<Vec<AuditEntry>> {
        Ok(self
            .store
            .get_as::<AuditLogDocument>(Collection::VerificationLogs, guild_id)?
            .unwrap_or_default()
            .entries)
    }

    /// Record a completion attempt
    pub async fn append_attempt(&self, guild_id: GuildId, attempt: AttemptEntry) -> Result<()> {
        let cap = self.cap;
        self.store
            .modify::<AttemptLog, _, _>(Collection::VerificationAttempts, guild_id, |log| {
                push_capped(&mut log.entries, attempt, cap)
            })?;
        self.persist().await;
        Ok(())
    }

    /// Most recent `count` attempts, newest first
    pub fn recent_attempts(&self, guild_id: GuildId, count: usize) -> Result<Vec<AttemptEntry>> {
        Ok(newest_first(&self.attempts(guild_id)?, count))
    }

    /// All attempts, oldest first
    pub fn attempts(&self, guild_id: GuildId) -> Result<Vec<AttemptEntry>> {
        Ok(self
            .store
            .get_as::<AttemptLog>(Collection::VerificationAttempts, guild_id)?
            .unwrap_or_default()
            .entries)
    }

    async fn persist(&self) {
        if let Err(e) = self.store.persist().await {
            warn!("Failed to persist verification logs: {}", e);
        }
    }
}

/// Shared audit log type
pub type SharedAuditLog = Arc<AuditLog>;

pub fn create_shared_audit_log(store: SharedDocumentStore) -> SharedAuditLog {
    Arc::new(AuditLog::new(store))
}
