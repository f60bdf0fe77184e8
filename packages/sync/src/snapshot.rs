//! The immutable value the synchronizer publishes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use city_pulse_analytics::{aggregate, fallback::fallback_analytics};
use city_pulse_analytics_models::AnalyticsSnapshot;
use city_pulse_geography::Gazetteer;
use city_pulse_incident_models::{FeedRecord, Incident};
use city_pulse_source::fallback::fallback_incidents;
use city_pulse_source::normalize::normalize_snapshot;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Status message published when no feed client is configured.
pub const NO_BACKEND_MESSAGE: &str = "Event feed not configured - using demo data";

/// Status message for an error reported by a running subscription.
#[must_use]
pub fn connection_failed_message(error: &str) -> String {
    format!("Feed connection failed: {error} - using demo data")
}

/// Status message for a subscription that could not be opened.
#[must_use]
pub fn setup_failed_message(error: &str) -> String {
    format!("Feed setup error: {error} - using demo data")
}

/// Synchronizer lifecycle state.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SyncState {
    /// Nothing published yet.
    Uninitialized,
    /// No feed client; demo data until restart.
    NoBackend,
    /// Waiting for the subscription's first snapshot.
    Connecting,
    /// Publishing live feed data.
    Live,
    /// Subscribed, but the feed is empty.
    Demo,
    /// The feed reported an error; demo data until the next snapshot.
    Error,
}

/// Coarse status shown to the user.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StatusIndicator {
    /// Still waiting for data.
    Connecting,
    /// Showing live data.
    Connected,
    /// Showing demo data because the feed is absent or empty.
    DemoData,
    /// Showing demo data because the feed failed.
    ConnectionIssue,
}

/// One published state of the pipeline.
///
/// Replaced wholesale on every update; never mutated after publishing.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSnapshot {
    /// Incidents in published order.
    pub incidents: Arc<[Incident]>,
    /// Analytics for `incidents` (or the demo analytics in fallback mode).
    pub analytics: AnalyticsSnapshot,
    /// Whether `incidents` is the demo set.
    pub using_fallback: bool,
    /// Whether the first snapshot is still pending.
    pub loading: bool,
    /// Non-fatal status message to display.
    pub error: Option<String>,
    /// State that produced this snapshot.
    pub state: SyncState,
    /// When this snapshot was built.
    pub updated_at: DateTime<Utc>,
}

impl FeedSnapshot {
    /// The pre-subscription placeholder.
    #[must_use]
    pub fn loading(state: SyncState, now: DateTime<Utc>) -> Self {
        Self {
            incidents: Arc::from(Vec::new()),
            analytics: AnalyticsSnapshot::default(),
            using_fallback: false,
            loading: true,
            error: None,
            state,
            updated_at: now,
        }
    }

    /// The demo incident set with the demo analytics.
    #[must_use]
    pub fn fallback(state: SyncState, error: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            incidents: Arc::from(fallback_incidents(now)),
            analytics: fallback_analytics(),
            using_fallback: true,
            loading: false,
            error,
            state,
            updated_at: now,
        }
    }

    /// Builds the snapshot for one full feed delivery. An empty delivery
    /// publishes the demo set instead.
    #[must_use]
    pub fn from_records(records: &[FeedRecord], now: DateTime<Utc>, gazetteer: &Gazetteer) -> Self {
        if records.is_empty() {
            return Self::fallback(SyncState::Demo, None, now);
        }

        let incidents = normalize_snapshot(records, now, gazetteer);
        Self {
            analytics: aggregate(&incidents),
            incidents: Arc::from(incidents),
            using_fallback: false,
            loading: false,
            error: None,
            state: SyncState::Live,
            updated_at: now,
        }
    }

    /// Indicator derived from the state.
    #[must_use]
    pub const fn indicator(&self) -> StatusIndicator {
        match self.state {
            SyncState::Uninitialized | SyncState::Connecting => StatusIndicator::Connecting,
            SyncState::Live => StatusIndicator::Connected,
            SyncState::NoBackend | SyncState::Demo => StatusIndicator::DemoData,
            SyncState::Error => StatusIndicator::ConnectionIssue,
        }
    }

    /// Looks up an incident by id.
    #[must_use]
    pub fn incident(&self, id: &str) -> Option<&Incident> {
        self.incidents.iter().find(|i| i.id == id)
    }
}
