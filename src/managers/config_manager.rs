use poise::serenity_prelude::GuildId;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{BotError, Result};
use crate::state::{Collection, SharedDocumentStore};
use crate::verification::{SettingsUpdate, VerificationConfig, VerificationSetup};

/// Reads and writes per-guild verification settings.
///
/// Channel and role ids are stored as given; whether they still resolve is
/// checked by the join handler at use time.
pub struct ConfigManager {
    store: SharedDocumentStore,
}

impl ConfigManager {
    pub fn new(store: SharedDocumentStore) -> Self {
        Self { store }
    }

    /// Get the config for a guild, if verification was ever set up there
    pub fn get_config(&self, guild_id: GuildId) -> Result<Option<VerificationConfig>> {
        self.store.get_as(Collection::Verification, guild_id)
    }

    /// Create (or replace) the config for a guild. New configs start enabled.
    pub async fn setup(&self, guild_id: GuildId, setup: VerificationSetup) -> Result<VerificationConfig> {
        let mut config = VerificationConfig::new(guild_id, setup)?;
        let config = self
            .store
            .modify::<Option<VerificationConfig>, _, _>(Collection::Verification, guild_id, |slot| {
                if let Some(previous) = slot {
                    // Keep updated_at monotonic across re-setup
                    config.updated_at = previous.updated_at;
                    config.touch();
                }
                *slot = Some(config.clone());
                config
            })?;

        info!(
            "Verification set up for guild {} (channel {}, role {}, method {:?})",
            guild_id, config.channel_id, config.role_id, config.method
        );
        self.persist().await;
        Ok(config)
    }

    /// Merge `update` into the existing config
    pub async fn update_settings(
        &self,
        guild_id: GuildId,
        update: &SettingsUpdate,
    ) -> Result<VerificationConfig> {
        let config = self.modify_existing(guild_id, |config| {
            config.apply(update);
            config.validate()
        })?;

        info!("Updated verification settings for guild {}", guild_id);
        self.persist().await;
        Ok(config)
    }

    /// Flip the enabled flag
    pub async fn toggle_enabled(&self, guild_id: GuildId) -> Result<VerificationConfig> {
        let config = self.modify_existing(guild_id, |config| {
            config.enabled = !config.enabled;
            Ok(())
        })?;

        info!(
            "Verification {} for guild {}",
            if config.enabled { "enabled" } else { "disabled" },
            guild_id
        );
        self.persist().await;
        Ok(config)
    }

    /// Reset the audit log and the attempt log to empty
    pub async fn clear_logs(&self, guild_id: GuildId) -> Result<()> {
        self.store.delete(Collection::VerificationLogs, guild_id);
        self.store.delete(Collection::VerificationAttempts, guild_id);

        info!("Cleared verification logs for guild {}", guild_id);
        self.persist().await;
        Ok(())
    }

    /// Apply `f` to a copy of the stored config and write it back stamped,
    /// only if `f` succeeds.
    fn modify_existing<F>(&self, guild_id: GuildId, f: F) -> Result<VerificationConfig>
    where
        F: FnOnce(&mut VerificationConfig) -> Result<()>,
    {
        self.store
            .modify::<Option<VerificationConfig>, _, _>(Collection::Verification, guild_id, |slot| {
                let Some(current) = slot else {
                    return Err(BotError::NotConfigured {
                        guild_id: guild_id.to_string(),
                    });
                };
                let mut next = current.clone();
                f(&mut next)?;
                next.touch();
                *current = next.clone();
                Ok(next)
            })?
    }

    async fn persist(&self) {
        if let Err(e) = self.store.persist().await {
            warn!("Failed to persist verification store: {}", e);
        }
    }
}

/// Shared config manager type
pub type SharedConfigManager = Arc<ConfigManager>;

pub fn create_shared_config_manager(store: SharedDocumentStore) -> SharedConfigManager {
    Arc::new(ConfigManager::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::DocumentStore;
    use crate::verification::VerificationMethod;
    use poise::serenity_prelude::{ChannelId, RoleId};

    fn setup_input() -> VerificationSetup {
        VerificationSetup {
            channel_id: ChannelId::new(10),
            role_id: RoleId::new(20),
            method: VerificationMethod::Button,
            dm_welcome: true,
            welcome_message: "Welcome!".to_string(),
            remove_unverified: false,
            timeout_hours: 24.0,
        }
    }

    fn manager() -> ConfigManager {
        ConfigManager::new(Arc::new(DocumentStore::in_memory()))
    }

    #[tokio::test]
    async fn test_update_requires_existing_config() {
        let manager = manager();
        let guild = GuildId::new(1);

        let err = manager
            .update_settings(guild, &SettingsUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::NotConfigured { .. }));

        let err = manager.toggle_enabled(guild).await.unwrap_err();
        assert!(matches!(err, BotError::NotConfigured { .. }));

        // A failed update must not leave a config behind
        assert!(manager.get_config(guild).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_settings_merges_and_stamps() {
        let manager = manager();
        let guild = GuildId::new(1);
        let created = manager.setup(guild, setup_input()).await.unwrap();

        let update = SettingsUpdate {
            role_id: Some(RoleId::new(99)),
            welcome_message: Some("Hello there".to_string()),
            ..Default::default()
        };
        manager.update_settings(guild, &update).await.unwrap();

        let stored = manager.get_config(guild).unwrap().unwrap();
        assert_eq!(stored.role_id, RoleId::new(99));
        assert_eq!(stored.welcome_message, "Hello there");
        // Untouched fields survive the merge
        assert_eq!(stored.channel_id, ChannelId::new(10));
        assert!(stored.dm_welcome);
        assert!(stored.updated_at > created.updated_at);
    }

    #[tokio::test]
    async fn test_update_rejects_removal_without_timeout() {
        let manager = manager();
        let guild = GuildId::new(1);
        manager.setup(guild, setup_input()).await.unwrap();

        let update = SettingsUpdate {
            remove_unverified: Some(true),
            timeout_hours: Some(0.0),
            ..Default::default()
        };
        let err = manager.update_settings(guild, &update).await.unwrap_err();
        assert!(matches!(err, BotError::ConfigValidation { .. }));

        // Rejected update leaves the stored config unchanged
        let stored = manager.get_config(guild).unwrap().unwrap();
        assert!(!stored.remove_unverified);
        assert_eq!(stored.timeout_hours, 24.0);
    }

    #[tokio::test]
    async fn test_setup_validates_invariant() {
        let manager = manager();
        let mut input = setup_input();
        input.remove_unverified = true;
        input.timeout_hours = 0.0;
        assert!(manager.setup(GuildId::new(1), input).await.is_err());
    }

    #[tokio::test]
    async fn test_toggle_enabled() {
        let manager = manager();
        let guild = GuildId::new(1);
        assert!(manager.setup(guild, setup_input()).await.unwrap().enabled);

        assert!(!manager.toggle_enabled(guild).await.unwrap().enabled);
        assert!(manager.toggle_enabled(guild).await.unwrap().enabled);
    }

    #[tokio::test]
    async fn test_clear_logs_empties_both_logs() {
        let store = Arc::new(DocumentStore::in_memory());
        let manager = ConfigManager::new(store.clone());
        let guild = GuildId::new(1);
        store.set(Collection::VerificationLogs, guild, serde_json::json!({"entries": [1]}));

        manager.clear_logs(guild).await.unwrap();

        assert!(store.get(Collection::VerificationLogs, guild).is_none());
        assert!(store.get(Collection::VerificationAttempts, guild).is_none());
    }
}
