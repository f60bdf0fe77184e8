//! In-process event feed.
//!
//! Behaves like the remote feed: every subscriber immediately receives the
//! current node content and a full snapshot after every change. Used when
//! running without a backend and as the feed in tests.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use city_pulse_incident_models::{FeedRecord, RawEvent};

use crate::feed::{EventFeed, FeedEvent, FeedSink, Subscription, subscription_channel};
use crate::store::{EventStore, validate_key};
use crate::{FeedError, StoreError};

#[derive(Default)]
struct State {
    records: BTreeMap<String, RawEvent>,
    subscribers: Vec<FeedSink>,
    next_key: u64,
}

impl State {
    fn snapshot(&self) -> Vec<FeedRecord> {
        self.records
            .iter()
            .map(|(key, event)| FeedRecord::new(key.clone(), event.clone()))
            .collect()
    }

    fn broadcast(&mut self, event: &FeedEvent) {
        self.subscribers.retain(|sink| sink.send(event.clone()));
    }

    fn publish(&mut self) {
        let snapshot = FeedEvent::Snapshot(self.snapshot());
        self.broadcast(&snapshot);
    }
}

/// A feed node held in memory.
#[derive(Default)]
pub struct MemoryFeed {
    state: Mutex<State>,
}

impl MemoryFeed {
    /// Creates an empty feed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a feed pre-populated with `records`.
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = FeedRecord>) -> Self {
        let feed = Self::new();
        {
            let mut state = feed.lock();
            for record in records {
                state.records.insert(record.key, record.event);
            }
        }
        feed
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts or replaces a record under an explicit key and notifies
    /// subscribers.
    pub fn insert(&self, key: impl Into<String>, event: RawEvent) {
        let mut state = self.lock();
        state.records.insert(key.into(), event);
        state.publish();
    }

    /// Delivers a transport error to every subscriber.
    pub fn fail(&self, message: impl Into<String>) {
        let event = FeedEvent::Error(message.into());
        self.lock().broadcast(&event);
    }

    /// Current record count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    /// Whether the node is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    /// Number of subscribers still listening.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        let mut state = self.lock();
        state.subscribers.retain(|sink| !sink.is_closed());
        state.subscribers.len()
    }

    /// Returns the stored event for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<RawEvent> {
        self.lock().records.get(key).cloned()
    }
}

#[async_trait]
impl EventFeed for MemoryFeed {
    fn name(&self) -> &str {
        "memory"
    }

    async fn subscribe(&self) -> Result<Subscription, FeedError> {
        let (sink, subscription) = subscription_channel();
        let mut state = self.lock();
        if sink.send(FeedEvent::Snapshot(state.snapshot())) {
            state.subscribers.push(sink);
        }
        Ok(subscription)
    }
}

#[async_trait]
impl EventStore for MemoryFeed {
    async fn create(&self, event: RawEvent) -> Result<String, StoreError> {
        let mut state = self.lock();
        state.next_key += 1;
        let key = format!("mem-{:08}", state.next_key);
        state.records.insert(key.clone(), event);
        state.publish();
        Ok(key)
    }

    async fn update(&self, key: &str, patch: RawEvent) -> Result<(), StoreError> {
        validate_key(key)?;
        let mut state = self.lock();
        let Some(existing) = state.records.get_mut(key) else {
            return Err(StoreError::NotFound {
                key: key.to_string(),
            });
        };

        merge(existing, patch);
        state.publish();
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        let mut state = self.lock();
        if state.records.remove(key).is_some() {
            state.publish();
        }
        Ok(())
    }
}

fn merge(existing: &mut RawEvent, patch: RawEvent) {
    let RawEvent {
        category,
        context,
        headline,
        geolocation,
        impact,
        confidence,
        timestamp,
    } = patch;

    if category.is_some() {
        existing.category = category;
    }
    if context.is_some() {
        existing.context = context;
    }
    if headline.is_some() {
        existing.headline = headline;
    }
    if geolocation.is_some() {
        existing.geolocation = geolocation;
    }
    if impact.is_some() {
        existing.impact = impact;
    }
    if confidence.is_some() {
        existing.confidence = confidence;
    }
    if timestamp.is_some() {
        existing.timestamp = timestamp;
    }
}
