//! Lifecycle handler: turns session events into cache updates.
//!
//! The session layer sends one [`SessionEvent`] per verification or
//! disconnect. A single task consumes them in order:
//!   1. `Verified` → wait for a free lookup slot, start the verification,
//!      then run the remote lookup in its own task
//!   2. `Disconnected` → evict the record immediately
//!
//! Starting the verification before spawning is what makes a disconnect
//! later in the stream win over a lookup that is still in flight.

use std::sync::Arc;

use sponsors_cache::SponsorsManager;
use sponsors_protocol::{ConfigReader, UserId};
use sponsors_remote::EntitlementService;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;

/// A connection lifecycle notification from the session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The player finished authentication.
    Verified(UserId),
    /// The player's connection closed.
    Disconnected(UserId),
}

/// Consumes session events until the channel closes.
///
/// Lookups still running when the channel closes are awaited before this
/// returns.
pub(crate) async fn run_lifecycle<S: EntitlementService>(
    manager: Arc<SponsorsManager<S>>,
    mut config: ConfigReader,
    mut events: mpsc::Receiver<SessionEvent>,
) {
    let limit = config.current().max_concurrent_lookups.max(1);
    let lookups = Arc::new(Semaphore::new(limit));
    let mut tasks = JoinSet::new();
    let mut enabled = config.current().enabled;
    let mut watching = true;

    tracing::info!(enabled, max_concurrent_lookups = limit, "sponsors lifecycle running");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(SessionEvent::Verified(user_id)) => {
                    // With every lookup slot busy, stop reading events until
                    // one frees up. The semaphore is never closed.
                    let Ok(permit) = Arc::clone(&lookups).acquire_owned().await else {
                        continue;
                    };
                    let Some(ticket) = manager.begin_verification(user_id) else {
                        continue;
                    };
                    let manager = Arc::clone(&manager);
                    tasks.spawn(async move {
                        let _permit = permit;
                        manager.complete_verification(ticket).await;
                    });
                }
                Some(SessionEvent::Disconnected(user_id)) => {
                    manager.on_player_disconnected(user_id);
                }
                None => break,
            },
            changed = config.changed(), if watching => match changed {
                Some(current) => {
                    if current.enabled != enabled {
                        enabled = current.enabled;
                        tracing::info!(enabled, "sponsorship toggled");
                    }
                }
                None => watching = false,
            },
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "sponsor lookup task panicked");
                }
            }
        }
    }

    tracing::debug!(outstanding = tasks.len(), "session events closed, finishing lookups");
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            tracing::error!(error = %e, "sponsor lookup task panicked");
        }
    }
    tracing::info!("sponsors lifecycle stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use sponsors_protocol::{
        LORD_SPONSOR_ROLE, RoleId, RoleMapping, SponsorsConfig,
    };
    use sponsors_remote::RemoteError;

    use super::*;

    /// Every player is a lord sponsor, but each roles lookup waits for a
    /// permit on `gate`.
    struct GatedLords {
        gate: Semaphore,
        lookups: AtomicUsize,
    }

    impl EntitlementService for GatedLords {
        async fn fetch_roles(&self, _: UserId) -> Result<Vec<RoleId>, RemoteError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.gate.acquire().await.expect("gate open").forget();
            Ok(vec![RoleId::from(LORD_SPONSOR_ROLE)])
        }

        async fn fetch_granted(&self, _: UserId) -> Result<bool, RemoteError> {
            Ok(false)
        }

        async fn set_granted(&self, _: UserId, _: bool) -> Result<(), RemoteError> {
            Ok(())
        }

        async fn wipe_granted(&self) -> Result<(), RemoteError> {
            Ok(())
        }
    }

    fn gated_manager(max_concurrent_lookups: usize) -> (Arc<SponsorsManager<GatedLords>>, ConfigReader) {
        let config = ConfigReader::fixed(SponsorsConfig {
            enabled: true,
            max_concurrent_lookups,
            ..SponsorsConfig::default()
        });
        let service = GatedLords {
            gate: Semaphore::new(0),
            lookups: AtomicUsize::new(0),
        };
        let manager = SponsorsManager::new(service, config.clone(), RoleMapping::builtin());
        (Arc::new(manager), config)
    }

    async fn wait_until(cond: impl Fn() -> bool) {
        for _ in 0..1000 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("condition never became true");
    }

    #[tokio::test]
    async fn test_run_lifecycle_busy_lookups_stop_taking_events() {
        let (manager, config) = gated_manager(1);
        let (events, rx) = mpsc::channel(4);
        let handle = tokio::spawn(run_lifecycle(Arc::clone(&manager), config, rx));
        let users: Vec<UserId> = (0..4).map(|_| UserId::new_random()).collect();

        for &user in &users {
            events.send(SessionEvent::Verified(user)).await.unwrap();
        }
        // The first event holds the only slot and the second waits for it;
        // the rest stay queued in the channel.
        wait_until(|| events.capacity() == 2).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(events.capacity(), 2);
        assert_eq!(manager.service().lookups.load(Ordering::SeqCst), 1);

        manager.service().gate.add_permits(users.len());
        drop(events);
        handle.await.unwrap();

        assert_eq!(manager.service().lookups.load(Ordering::SeqCst), 4);
        for user in users {
            assert!(manager.try_get_record(user).is_some());
        }
    }

    #[tokio::test]
    async fn test_run_lifecycle_disconnect_after_verify_wins() {
        let (manager, config) = gated_manager(4);
        let (events, rx) = mpsc::channel(4);
        let handle = tokio::spawn(run_lifecycle(Arc::clone(&manager), config, rx));
        let user = UserId::new_random();

        events.send(SessionEvent::Verified(user)).await.unwrap();
        events.send(SessionEvent::Disconnected(user)).await.unwrap();
        drop(events);
        wait_until(|| manager.service().lookups.load(Ordering::SeqCst) == 1).await;
        manager.service().gate.add_permits(1);
        handle.await.unwrap();

        assert!(manager.try_get_record(user).is_none());
    }

    #[tokio::test]
    async fn test_run_lifecycle_disabled_takes_no_lookup() {
        let config = ConfigReader::fixed(SponsorsConfig::default());
        let service = GatedLords {
            gate: Semaphore::new(0),
            lookups: AtomicUsize::new(0),
        };
        let manager = Arc::new(SponsorsManager::new(service, config.clone(), RoleMapping::builtin()));
        let (events, rx) = mpsc::channel(4);
        let handle = tokio::spawn(run_lifecycle(Arc::clone(&manager), config, rx));

        events.send(SessionEvent::Verified(UserId::new_random())).await.unwrap();
        drop(events);
        handle.await.unwrap();

        assert_eq!(manager.service().lookups.load(Ordering::SeqCst), 0);
        assert!(manager.is_empty());
    }
}
