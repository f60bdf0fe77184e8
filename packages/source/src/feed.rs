//! The remote event feed seam.
//!
//! A feed pushes [`FeedEvent`]s onto a channel. The consuming side holds a
//! [`Subscription`]; the producing side holds the matching [`FeedSink`] and
//! stops producing once the subscription is gone.

use async_trait::async_trait;
use city_pulse_incident_models::FeedRecord;
use tokio::sync::mpsc;

use crate::FeedError;

/// A change notification from the feed.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// The full current content of the feed node, in key order.
    Snapshot(Vec<FeedRecord>),
    /// The transport or backend reported an error. The subscription stays
    /// open; the feed may still deliver snapshots afterwards.
    Error(String),
}

/// Creates a connected sink/subscription pair.
#[must_use]
pub fn subscription_channel() -> (FeedSink, Subscription) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        FeedSink { tx },
        Subscription {
            events: rx,
            active: true,
        },
    )
}

/// Producer half of a subscription.
#[derive(Debug, Clone)]
pub struct FeedSink {
    tx: mpsc::UnboundedSender<FeedEvent>,
}

impl FeedSink {
    /// Delivers an event. Returns `false` once the subscriber is gone.
    pub fn send(&self, event: FeedEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Whether the subscriber has unsubscribed or been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves when the subscriber unsubscribes or is dropped.
    pub async fn closed(&self) {
        self.tx.closed().await;
    }
}

/// Consumer half of a subscription.
///
/// Dropping a subscription unsubscribes it.
#[derive(Debug)]
pub struct Subscription {
    events: mpsc::UnboundedReceiver<FeedEvent>,
    active: bool,
}

impl Subscription {
    /// Waits for the next event. Returns `None` after unsubscribing or when
    /// the feed has stopped producing.
    pub async fn next(&mut self) -> Option<FeedEvent> {
        if !self.active {
            return None;
        }
        self.events.recv().await
    }

    /// Stops delivery. Safe to call any number of times; returns `true`
    /// only for the call that actually closed the subscription.
    pub fn unsubscribe(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        self.events.close();
        true
    }

    /// Whether [`Self::unsubscribe`] has not been called yet.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// A remote key-value node whose children are raw events.
#[async_trait]
pub trait EventFeed: Send + Sync {
    /// Short name used in logs (e.g. `"firebase"`).
    fn name(&self) -> &str;

    /// Opens a subscription. Implementations deliver the current node
    /// content as the first snapshot and a new full snapshot on every
    /// change.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] if the subscription cannot be established.
    async fn subscribe(&self) -> Result<Subscription, FeedError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_events_in_order() {
        let (sink, mut subscription) = subscription_channel();
        assert!(sink.send(FeedEvent::Snapshot(Vec::new())));
        assert!(sink.send(FeedEvent::Error("boom".to_string())));

        assert_eq!(subscription.next().await, Some(FeedEvent::Snapshot(Vec::new())));
        assert_eq!(
            subscription.next().await,
            Some(FeedEvent::Error("boom".to_string()))
        );
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent_and_closes_sink() {
        let (sink, mut subscription) = subscription_channel();
        assert!(subscription.unsubscribe());
        assert!(!subscription.unsubscribe());
        assert!(!subscription.is_active());
        assert!(sink.is_closed());
        assert!(!sink.send(FeedEvent::Snapshot(Vec::new())));
        assert_eq!(subscription.next().await, None);
    }

    #[tokio::test]
    async fn dropping_subscription_closes_sink() {
        let (sink, subscription) = subscription_channel();
        drop(subscription);
        sink.closed().await;
        assert!(sink.is_closed());
    }
}
