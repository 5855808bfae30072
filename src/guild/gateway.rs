//! Access to the live guild: role/channel resolution, membership, DMs and
//! moderation actions.

use async_trait::async_trait;
use poise::serenity_prelude::{self as serenity, ChannelId, GuildId, Http, RoleId, UserId};
use std::sync::Arc;

use crate::error::{BotError, Result};

#[async_trait]
pub trait GuildGateway: Send + Sync {
    /// Whether `channel_id` is a channel of `guild_id`
    async fn channel_exists(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<bool>;

    /// Whether `role_id` is a role of `guild_id`
    async fn role_exists(&self, guild_id: GuildId, role_id: RoleId) -> Result<bool>;

    /// Roles of a member, or `None` if the user is not in the guild
    async fn member_roles(&self, guild_id: GuildId, user_id: UserId) -> Result<Option<Vec<RoleId>>>;

    async fn send_dm(&self, user_id: UserId, content: &str) -> Result<()>;

    async fn add_role(&self, guild_id: GuildId, user_id: UserId, role_id: RoleId) -> Result<()>;

    async fn kick(&self, guild_id: GuildId, user_id: UserId, reason: &str) -> Result<()>;
}

/// Gateway backed by Discord's REST API
pub struct SerenityGateway {
    http: Arc<Http>,
}

impl SerenityGateway {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

fn is_not_found(err: &serenity::Error) -> bool {
    match err {
        serenity::Error::Http(http_err) => http_err.status_code().map(|s| s.as_u16()) == Some(404),
        _ => false,
    }
}

#[async_trait]
impl GuildGateway for SerenityGateway {
    async fn channel_exists(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<bool> {
        let channels = guild_id.channels(&self.http).await?;
        Ok(channels.contains_key(&channel_id))
    }

    async fn role_exists(&self, guild_id: GuildId, role_id: RoleId) -> Result<bool> {
        let roles = guild_id.roles(&self.http).await?;
        Ok(roles.contains_key(&role_id))
    }

    async fn member_roles(&self, guild_id: GuildId, user_id: UserId) -> Result<Option<Vec<RoleId>>> {
        match guild_id.member(&self.http, user_id).await {
            Ok(member) => Ok(Some(member.roles)),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn send_dm(&self, user_id: UserId, content: &str) -> Result<()> {
        let delivery_failure = |e: serenity::Error| BotError::DeliveryFailure {
            user_id: user_id.to_string(),
            message: e.to_string(),
        };

        let dm_channel = user_id
            .create_dm_channel(&self.http)
            .await
            .map_err(delivery_failure)?;
        dm_channel
            .send_message(&self.http, serenity::CreateMessage::new().content(content))
            .await
            .map_err(delivery_failure)?;
        Ok(())
    }

    async fn add_role(&self, guild_id: GuildId, user_id: UserId, role_id: RoleId) -> Result<()> {
        self.http
            .add_member_role(guild_id, user_id, role_id, Some("Completed verification"))
            .await?;
        Ok(())
    }

    async fn kick(&self, guild_id: GuildId, user_id: UserId, reason: &str) -> Result<()> {
        guild_id.kick_with_reason(&self.http, user_id, reason).await?;
        Ok(())
    }
}

/// Shared gateway type
pub type SharedGuildGateway = Arc<dyn GuildGateway>;

#[cfg(test)]
pub mod mock {
    //! In-memory guild used by handler tests.

    use super::*;
    use parking_lot::Mutex;
    use std::collections::{HashMap, HashSet};

    #[derive(Default)]
    struct MockGuildState {
        channels: HashSet<(GuildId, ChannelId)>,
        roles: HashSet<(GuildId, RoleId)>,
        members: HashMap<(GuildId, UserId), Vec<RoleId>>,
        dms: Vec<(UserId, String)>,
        kicks: Vec<(GuildId, UserId, String)>,
        fail_dms: bool,
    }

    #[derive(Default)]
    pub struct MockGateway {
        state: Mutex<MockGuildState>,
    }

    impl MockGateway {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_channel(self, guild_id: GuildId, channel_id: ChannelId) -> Self {
            self.state.lock().channels.insert((guild_id, channel_id));
            self
        }

        pub fn with_role(self, guild_id: GuildId, role_id: RoleId) -> Self {
            self.state.lock().roles.insert((guild_id, role_id));
            self
        }

        pub fn add_member(&self, guild_id: GuildId, user_id: UserId, roles: Vec<RoleId>) {
            self.state.lock().members.insert((guild_id, user_id), roles);
        }

        pub fn remove_member(&self, guild_id: GuildId, user_id: UserId) {
            self.state.lock().members.remove(&(guild_id, user_id));
        }

        pub fn fail_dms(&self) {
            self.state.lock().fail_dms = true;
        }

        pub fn dm_count(&self) -> usize {
            self.state.lock().dms.len()
        }

        pub fn kicks(&self) -> Vec<(GuildId, UserId, String)> {
            self.state.lock().kicks.clone()
        }

        pub fn has_role(&self, guild_id: GuildId, user_id: UserId, role_id: RoleId) -> bool {
            self.state
                .lock()
                .members
                .get(&(guild_id, user_id))
                .map(|roles| roles.contains(&role_id))
                .unwrap_or(false)
        }
    }

    #[async_trait]
    impl GuildGateway for MockGateway {
        async fn channel_exists(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<bool> {
            Ok(self.state.lock().channels.contains(&(guild_id, channel_id)))
        }

        async fn role_exists(&self, guild_id: GuildId, role_id: RoleId) -> Result<bool> {
            Ok(self.state.lock().roles.contains(&(guild_id, role_id)))
        }

        async fn member_roles(&self, guild_id: GuildId, user_id: UserId) -> Result<Option<Vec<RoleId>>> {
            Ok(self.state.lock().members.get(&(guild_id, user_id)).cloned())
        }

        async fn send_dm(&self, user_id: UserId, content: &str) -> Result<()> {
            let mut state = self.state.lock();
            if state.fail_dms {
                return Err(BotError::DeliveryFailure {
                    user_id: user_id.to_string(),
                    message: "Cannot send messages to this user".to_string(),
                });
            }
            state.dms.push((user_id, content.to_string()));
            Ok(())
        }

        async fn add_role(&self, guild_id: GuildId, user_id: UserId, role_id: RoleId) -> Result<()> {
            let mut state = self.state.lock();
            match state.members.get_mut(&(guild_id, user_id)) {
                Some(roles) => {
                    if !roles.contains(&role_id) {
                        roles.push(role_id);
                    }
                    Ok(())
                }
                None => Err(BotError::Discord {
                    message: "Unknown Member".to_string(),
                }),
            }
        }

        async fn kick(&self, guild_id: GuildId, user_id: UserId, reason: &str) -> Result<()> {
            let mut state = self.state.lock();
            if state.members.remove(&(guild_id, user_id)).is_none() {
                return Err(BotError::Discord {
                    message: "Unknown Member".to_string(),
                });
            }
            state.kicks.push((guild_id, user_id, reason.to_string()));
            Ok(())
        }
    }
}
