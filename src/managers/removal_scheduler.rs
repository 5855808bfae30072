//! Deferred removal of members who never verify.
//!
//! Each pending removal is a tokio task keyed by `(guild, user)`. Arming a
//! key that is already armed replaces the old task. Timers live in memory
//! only and are lost on restart.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use poise::serenity_prelude::{GuildId, UserId};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;
use tracing::debug;

type RemovalKey = (GuildId, UserId);

struct ArmedRemoval {
    id: uuid::Uuid,
    handle: AbortHandle,
}

#[derive(Default)]
pub struct PendingRemovals {
    tasks: DashMap<RemovalKey, ArmedRemoval>,
}

impl PendingRemovals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `action` after `delay` unless cancelled first.
    ///
    /// The entry is dropped from the table just before `action` runs, so a
    /// cancel that arrives while the action is executing is a no-op; the
    /// action must re-check its own preconditions.
    pub fn arm<F>(self: &Arc<Self>, guild_id: GuildId, user_id: UserId, delay: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let key = (guild_id, user_id);
        let id = uuid::Uuid::new_v4();
        let removals = Arc::clone(self);

        // Hold the entry while spawning so the task cannot look itself up
        // before it is registered.
        let entry = self.tasks.entry(key);
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if removals.tasks.remove_if(&key, |_, armed| armed.id == id).is_none() {
                return;
            }
            debug!("Removal timer fired for user {} in guild {}", user_id, guild_id);
            action.await;
        });

        let armed = ArmedRemoval {
            id,
            handle: task.abort_handle(),
        };
        match entry {
            Entry::Occupied(mut occupied) => occupied.insert(armed).handle.abort(),
            Entry::Vacant(vacant) => {
                vacant.insert(armed);
            }
        }

        debug!(
            "Armed removal for user {} in guild {} ({}s)",
            user_id,
            guild_id,
            delay.as_secs()
        );
    }

    /// Cancel a pending removal; returns whether one was armed
    pub fn cancel(&self, guild_id: GuildId, user_id: UserId) -> bool {
        match self.tasks.remove(&(guild_id, user_id)) {
            Some((_, armed)) => {
                armed.handle.abort();
                debug!("Cancelled removal for user {} in guild {}", user_id, guild_id);
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self, guild_id: GuildId, user_id: UserId) -> bool {
        self.tasks.contains_key(&(guild_id, user_id))
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Abort every pending removal (used at shutdown)
    pub fn shutdown(&self) {
        let count = self.tasks.len();
        self.tasks.retain(|_, armed| {
            armed.handle.abort();
            false
        });
        debug!("Aborted {} pending removals", count);
    }
}

/// Shared removal scheduler type
pub type SharedPendingRemovals = Arc<PendingRemovals>;

pub fn create_shared_pending_removals() -> SharedPendingRemovals {
    Arc::new(PendingRemovals::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter_action(counter: &Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let removals = create_shared_pending_removals();
        let fired = Arc::new(AtomicUsize::new(0));
        let (guild, user) = (GuildId::new(1), UserId::new(2));

        removals.arm(guild, user, Duration::from_secs(10), counter_action(&fired));
        assert!(removals.is_armed(guild, user));

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!removals.is_armed(guild, user));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_action() {
        let removals = create_shared_pending_removals();
        let fired = Arc::new(AtomicUsize::new(0));
        let (guild, user) = (GuildId::new(1), UserId::new(2));

        removals.arm(guild, user, Duration::from_secs(10), counter_action(&fired));
        assert!(removals.cancel(guild, user));
        assert!(!removals.cancel(guild, user));

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(removals.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_previous_timer() {
        let removals = create_shared_pending_removals();
        let fired = Arc::new(AtomicUsize::new(0));
        let (guild, user) = (GuildId::new(1), UserId::new(2));

        removals.arm(guild, user, Duration::from_secs(5), counter_action(&fired));
        removals.arm(guild, user, Duration::from_secs(30), counter_action(&fired));
        assert_eq!(removals.len(), 1);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_aborts_everything() {
        let removals = create_shared_pending_removals();
        let fired = Arc::new(AtomicUsize::new(0));
        for user in 1..=3 {
            removals.arm(GuildId::new(1), UserId::new(user), Duration::from_secs(5), counter_action(&fired));
        }
        removals.shutdown();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(removals.len(), 0);
    }
}
