#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Feed synchronizer.
//!
//! Owns the single live subscription to the event feed, turns each
//! delivery into an immutable [`FeedSnapshot`] and republishes it on a
//! [`tokio::sync::watch`] channel. Downstream consumers (analytics views,
//! the map presenter, the HTTP API) only ever read published snapshots.
//!
//! Whenever live data is unavailable (no client, an empty node, or a feed
//! error) the demo set is published instead, so after the initial loading
//! snapshot the published collection is never empty.

pub mod snapshot;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use city_pulse_geography::Gazetteer;
use city_pulse_source::feed::{EventFeed, FeedEvent};
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub use snapshot::{FeedSnapshot, StatusIndicator, SyncState};

use snapshot::{NO_BACKEND_MESSAGE, connection_failed_message, setup_failed_message};

/// Configures and starts the synchronizer.
pub struct FeedSynchronizer {
    feed: Option<Arc<dyn EventFeed>>,
}

impl FeedSynchronizer {
    /// Creates a synchronizer for `feed`. `None` means no backend is
    /// configured and only the demo set is ever published.
    #[must_use]
    pub fn new(feed: Option<Arc<dyn EventFeed>>) -> Self {
        Self { feed }
    }

    /// Starts synchronizing. Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(self) -> SyncHandle {
        let now = Utc::now();
        let (sender, receiver) =
            watch::channel(Arc::new(FeedSnapshot::loading(SyncState::Uninitialized, now)));
        let shared = Arc::new(Shared {
            generation: Mutex::new(Generation {
                current: 1,
                shut_down: false,
            }),
            sender,
        });
        let generation = 1;

        let task = match self.feed {
            None => {
                log::warn!("{NO_BACKEND_MESSAGE}");
                shared.publish(
                    generation,
                    FeedSnapshot::fallback(
                        SyncState::NoBackend,
                        Some(NO_BACKEND_MESSAGE.to_string()),
                        now,
                    ),
                );
                None
            }
            Some(feed) => {
                shared.publish(
                    generation,
                    FeedSnapshot::loading(SyncState::Connecting, now),
                );
                Some(tokio::spawn(run(
                    feed,
                    Arc::clone(&shared),
                    generation,
                    Gazetteer::bengaluru(),
                )))
            }
        };

        SyncHandle {
            receiver,
            shared,
            task: Mutex::new(task),
        }
    }
}

struct Generation {
    current: u64,
    shut_down: bool,
}

struct Shared {
    generation: Mutex<Generation>,
    sender: watch::Sender<Arc<FeedSnapshot>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Generation> {
        self.generation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Publishes `snapshot` if `generation` is still current. The lock is
    /// held across the send so nothing is published after teardown.
    fn publish(&self, generation: u64, snapshot: FeedSnapshot) -> bool {
        let guard = self.lock();
        if guard.shut_down || guard.current != generation {
            return false;
        }
        self.sender.send_replace(Arc::new(snapshot));
        true
    }
}

async fn run(
    feed: Arc<dyn EventFeed>,
    shared: Arc<Shared>,
    generation: u64,
    gazetteer: &'static Gazetteer,
) {
    let mut subscription = match feed.subscribe().await {
        Ok(subscription) => subscription,
        Err(e) => {
            log::error!("Failed to subscribe to {} feed: {e}", feed.name());
            shared.publish(
                generation,
                FeedSnapshot::fallback(
                    SyncState::Error,
                    Some(setup_failed_message(&e.to_string())),
                    Utc::now(),
                ),
            );
            return;
        }
    };
    log::info!("Subscribed to {} feed", feed.name());

    while let Some(event) = subscription.next().await {
        let now = Utc::now();
        let snapshot = match event {
            FeedEvent::Snapshot(records) => {
                let snapshot = FeedSnapshot::from_records(&records, now, gazetteer);
                if snapshot.using_fallback {
                    log::info!("Feed is empty, publishing demo data");
                } else {
                    log::debug!("Publishing {} incidents", snapshot.incidents.len());
                }
                snapshot
            }
            FeedEvent::Error(message) => {
                log::error!("{} feed error: {message}", feed.name());
                FeedSnapshot::fallback(
                    SyncState::Error,
                    Some(connection_failed_message(&message)),
                    now,
                )
            }
        };

        if !shared.publish(generation, snapshot) {
            log::debug!("Dropping delivery for stale generation {generation}");
            break;
        }
    }

    subscription.unsubscribe();
    log::debug!("{} feed subscription ended", feed.name());
}

/// A running synchronizer.
///
/// Dropping the handle shuts the synchronizer down.
pub struct SyncHandle {
    receiver: watch::Receiver<Arc<FeedSnapshot>>,
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SyncHandle {
    /// The most recently published snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<FeedSnapshot> {
        Arc::clone(&self.receiver.borrow())
    }

    /// A receiver that observes every future publication.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<FeedSnapshot>> {
        self.receiver.clone()
    }

    /// Stops the subscription. Safe to call any number of times and after
    /// an error; returns `true` only for the call that did the work. No
    /// snapshot is published after this returns.
    pub fn shutdown(&self) -> bool {
        {
            let mut generation = self.shared.lock();
            if generation.shut_down {
                return false;
            }
            generation.shut_down = true;
            generation.current += 1;
        }

        if let Some(task) = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
        log::info!("Feed synchronizer shut down");
        true
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use city_pulse_incident_models::{FeedRecord, RawEvent, Severity};
    use city_pulse_source::FeedError;
    use city_pulse_source::feed::Subscription;
    use city_pulse_source::memory::MemoryFeed;

    struct RejectingFeed;

    #[async_trait]
    impl EventFeed for RejectingFeed {
        fn name(&self) -> &str {
            "rejecting"
        }

        async fn subscribe(&self) -> Result<Subscription, FeedError> {
            Err(FeedError::PermissionDenied { status: 401 })
        }
    }

    fn fire_response() -> RawEvent {
        RawEvent {
            category: Some("Public Safety".to_string()),
            impact: Some(3.0),
            geolocation: Some("12.9279,77.6271".to_string()),
            context: Some("Fire response".to_string()),
            ..RawEvent::default()
        }
    }

    async fn wait_for_state(handle: &SyncHandle, state: SyncState) -> Arc<FeedSnapshot> {
        let mut receiver = handle.subscribe();
        let snapshot = receiver.wait_for(|s| s.state == state).await.unwrap();
        Arc::clone(&snapshot)
    }

    #[tokio::test]
    async fn no_backend_publishes_demo_set() {
        let handle = FeedSynchronizer::new(None).start();
        let snapshot = handle.current();

        assert_eq!(snapshot.state, SyncState::NoBackend);
        assert!(snapshot.using_fallback);
        assert_eq!(snapshot.incidents.len(), 5);
        assert_eq!(snapshot.error.as_deref(), Some(NO_BACKEND_MESSAGE));
        assert_eq!(snapshot.indicator(), StatusIndicator::DemoData);
    }

    #[tokio::test]
    async fn empty_feed_falls_back_then_goes_live() {
        let feed = Arc::new(MemoryFeed::new());
        let handle = FeedSynchronizer::new(Some(feed.clone())).start();

        let demo = wait_for_state(&handle, SyncState::Demo).await;
        assert!(demo.using_fallback);
        assert_eq!(demo.incidents.len(), 5);

        feed.insert("-fire", fire_response());
        let live = wait_for_state(&handle, SyncState::Live).await;
        assert!(!live.using_fallback);
        assert_eq!(live.incidents.len(), 1);
        assert_eq!(live.incidents[0].severity, Severity::High);
        assert_eq!(live.incidents[0].description, "Fire response");
    }

    #[tokio::test]
    async fn feed_error_keeps_subscription_alive() {
        let feed = Arc::new(MemoryFeed::with_records([FeedRecord::new(
            "-fire",
            fire_response(),
        )]));
        let handle = FeedSynchronizer::new(Some(feed.clone())).start();
        wait_for_state(&handle, SyncState::Live).await;

        feed.fail("permission denied");
        let failed = wait_for_state(&handle, SyncState::Error).await;
        assert!(failed.using_fallback);
        assert_eq!(
            failed.error.as_deref(),
            Some("Feed connection failed: permission denied - using demo data")
        );
        assert_eq!(failed.indicator(), StatusIndicator::ConnectionIssue);

        feed.insert("-other", RawEvent::default());
        let recovered = wait_for_state(&handle, SyncState::Live).await;
        assert_eq!(recovered.error, None);
        assert_eq!(recovered.incidents.len(), 2);
    }

    #[tokio::test]
    async fn subscribe_failure_publishes_setup_error() {
        let handle = FeedSynchronizer::new(Some(Arc::new(RejectingFeed))).start();
        let snapshot = wait_for_state(&handle, SyncState::Error).await;

        assert!(snapshot.using_fallback);
        assert_eq!(
            snapshot.error.as_deref(),
            Some("Feed setup error: permission denied (HTTP 401) - using demo data")
        );
        assert!(handle.shutdown());
    }

    #[tokio::test]
    async fn nothing_is_published_after_shutdown() {
        let feed = Arc::new(MemoryFeed::new());
        let handle = FeedSynchronizer::new(Some(feed.clone())).start();
        wait_for_state(&handle, SyncState::Demo).await;

        assert!(handle.shutdown());
        assert!(!handle.shutdown());

        feed.insert("-late", fire_response());
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert_eq!(handle.current().state, SyncState::Demo);
        assert_eq!(feed.subscriber_count(), 0);
    }
}
