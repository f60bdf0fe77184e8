//! Write-back operations used by the report and alert forms.
//!
//! These are fire-and-forget requests against the same feed node the
//! pipeline reads from. Their outcome is reported to the caller only; the
//! resulting change reaches the pipeline through the normal subscription.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use city_pulse_incident_models::{Coordinate, RawEvent, Severity};
use serde::{Deserialize, Serialize};

use crate::StoreError;

/// Category assigned to drafts submitted without one.
pub const DEFAULT_DRAFT_CATEGORY: &str = "Administrative Announcements";

/// Confidence assigned to drafts submitted without one.
pub const DEFAULT_DRAFT_CONFIDENCE: f64 = 0.8;

/// Create, update and delete single event records.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Stores a new event and returns the key the feed generated for it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend rejects the write.
    async fn create(&self, event: RawEvent) -> Result<String, StoreError>;

    /// Overwrites the fields present in `patch`; absent fields are kept.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the key is invalid or the write fails.
    async fn update(&self, key: &str, patch: RawEvent) -> Result<(), StoreError>;

    /// Removes an event. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the key is invalid or the write fails.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Checks that `key` is usable as a single path segment in the feed.
///
/// # Errors
///
/// Returns [`StoreError::InvalidKey`] for empty keys and keys containing
/// `.`, `$`, `#`, `[`, `]`, `/` or control characters.
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    let invalid = key.is_empty()
        || key
            .chars()
            .any(|c| matches!(c, '.' | '$' | '#' | '[' | ']' | '/') || c.is_control());

    if invalid {
        return Err(StoreError::InvalidKey {
            key: key.to_string(),
        });
    }
    Ok(())
}

/// A new incident as submitted by a reporting form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentDraft {
    /// Latitude of the reported location.
    pub lat: f64,
    /// Longitude of the reported location.
    pub lng: f64,
    /// What happened. Becomes the event context.
    pub description: String,
    /// Reporter's severity estimate, used when no impact is given.
    pub severity: Severity,
    /// Category label.
    #[serde(default)]
    pub category: Option<String>,
    /// Short headline. Defaults to the description.
    #[serde(default)]
    pub headline: Option<String>,
    /// Confidence in `[0, 1]`.
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Explicit impact score.
    #[serde(default)]
    pub impact: Option<i64>,
}

impl IncidentDraft {
    /// Converts the draft to the stored event shape, stamped with `now`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidDraft`] if the description is blank, the
    /// coordinate is not finite, or the confidence is outside `[0, 1]`.
    pub fn into_event(self, now: DateTime<Utc>) -> Result<RawEvent, StoreError> {
        if self.description.trim().is_empty() {
            return Err(invalid("description must not be empty"));
        }
        let coordinate = Coordinate::new(self.lat, self.lng);
        if !coordinate.is_finite() {
            return Err(invalid("coordinate must be finite"));
        }
        if self
            .confidence
            .is_some_and(|c| !(0.0..=1.0).contains(&c))
        {
            return Err(invalid("confidence must be between 0 and 1"));
        }

        #[allow(clippy::cast_precision_loss)]
        let impact = self
            .impact
            .unwrap_or_else(|| self.severity.default_impact()) as f64;

        Ok(RawEvent {
            category: Some(
                self.category
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_DRAFT_CATEGORY.to_string()),
            ),
            headline: Some(
                self.headline
                    .filter(|h| !h.trim().is_empty())
                    .unwrap_or_else(|| self.description.clone()),
            ),
            context: Some(self.description),
            geolocation: Some(coordinate.to_geolocation()),
            impact: Some(impact),
            confidence: Some(self.confidence.unwrap_or(DEFAULT_DRAFT_CONFIDENCE)),
            timestamp: Some(now.timestamp_millis()),
        })
    }
}

/// Partial changes to an existing incident.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentUpdate {
    /// New description (stored as context).
    #[serde(default)]
    pub description: Option<String>,
    /// New headline.
    #[serde(default)]
    pub headline: Option<String>,
    /// New category.
    #[serde(default)]
    pub category: Option<String>,
    /// New confidence.
    #[serde(default)]
    pub confidence: Option<f64>,
    /// New impact score.
    #[serde(default)]
    pub impact: Option<i64>,
    /// New latitude; applied only together with `lng`.
    #[serde(default)]
    pub lat: Option<f64>,
    /// New longitude; applied only together with `lat`.
    #[serde(default)]
    pub lng: Option<f64>,
}

impl IncidentUpdate {
    /// Converts the update into a patch containing only the changed fields.
    #[must_use]
    pub fn into_patch(self) -> RawEvent {
        let geolocation = match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => {
                let coordinate = Coordinate::new(lat, lng);
                coordinate.is_finite().then(|| coordinate.to_geolocation())
            }
            _ => None,
        };

        #[allow(clippy::cast_precision_loss)]
        let impact = self.impact.map(|v| v as f64);

        RawEvent {
            category: self.category,
            context: self.description,
            headline: self.headline,
            geolocation,
            impact,
            confidence: self.confidence,
            timestamp: None,
        }
    }

    /// Whether the update changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clone().into_patch() == RawEvent::default()
    }
}

fn invalid(message: &str) -> StoreError {
    StoreError::InvalidDraft {
        message: message.to_string(),
    }
}
