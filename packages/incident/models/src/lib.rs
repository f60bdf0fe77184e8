#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Raw feed event and canonical incident types.
//!
//! The remote event feed delivers untrusted [`RawEvent`] records keyed by
//! the feed's own generated keys. Every record is normalized into an
//! [`Incident`], the fully-validated entity consumed by analytics, the map
//! presenter and the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumString};

/// Category label whose events are escalated one severity level.
pub const TRANSPORTATION_CATEGORY: &str = "Traffic & Transportation";

/// City-center coordinate substituted for missing or malformed locations.
pub const DEFAULT_COORDINATE: Coordinate = Coordinate {
    lat: 12.9716,
    lng: 77.5946,
};

/// Derived urgency of an incident.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    /// Informational, no escalation needed.
    Low = 1,
    /// Noticeable disruption.
    Medium = 2,
    /// Requires immediate attention.
    High = 3,
}

impl Severity {
    /// Returns the ordering rank (higher is more severe).
    #[must_use]
    pub const fn rank(self) -> u8 {
        self as u8
    }

    /// Returns all variants, most severe first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::High, Self::Medium, Self::Low]
    }

    /// Impact score used when writing an event of this severity back to
    /// the feed without an explicit impact.
    #[must_use]
    pub const fn default_impact(self) -> i64 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }
}

/// Lifecycle status of an incident.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IncidentStatus {
    /// Still ongoing. Every ingested event starts here.
    #[default]
    Active,
    /// Closed out by an operator.
    Resolved,
}

/// A WGS84 latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl Coordinate {
    /// Creates a coordinate without validation.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether both components are finite numbers.
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// Manhattan distance in degrees (`|Δlat| + |Δlng|`).
    #[must_use]
    pub fn manhattan_distance(&self, other: &Self) -> f64 {
        (self.lat - other.lat).abs() + (self.lng - other.lng).abs()
    }

    /// Formats the coordinate the way the feed stores it (`"lat,lng"`).
    #[must_use]
    pub fn to_geolocation(&self) -> String {
        format!("{},{}", self.lat, self.lng)
    }
}

/// An event record exactly as the remote feed stores it.
///
/// Every field is optional because the feed is untrusted: records may be
/// written by older clients, by hand, or partially.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    /// Category label (e.g. "Public Safety").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Free-text context describing the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Short headline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    /// `"lat,lng"` location string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geolocation: Option<String>,
    /// Unscaled impact score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<f64>,
    /// Confidence in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl RawEvent {
    /// Extracts an event from an arbitrary JSON value.
    ///
    /// Unlike `serde_json::from_value`, this never fails: fields with the
    /// wrong JSON type are treated as missing so one malformed field cannot
    /// drop the whole record.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        let text = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_string);
        let number = |name: &str| {
            value.get(name).and_then(|v| match v {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            })
        };

        #[allow(clippy::cast_possible_truncation)]
        let timestamp = value.get("timestamp").and_then(|v| {
            v.as_i64()
                .or_else(|| v.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
        });

        Self {
            category: text("category"),
            context: text("context"),
            headline: text("headline"),
            geolocation: text("geolocation"),
            impact: number("impact"),
            confidence: number("confidence"),
            timestamp,
        }
    }
}

/// One child of the feed node: the feed-assigned key and its event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedRecord {
    /// Key generated by the feed when the record was created.
    pub key: String,
    /// The untrusted record body.
    pub event: RawEvent,
}

impl FeedRecord {
    /// Creates a record from a key and an event.
    #[must_use]
    pub fn new(key: impl Into<String>, event: RawEvent) -> Self {
        Self {
            key: key.into(),
            event,
        }
    }

    /// Splits a feed node into records, preserving the node's key order.
    ///
    /// A node whose keys are all small integers arrives as a JSON array;
    /// its elements are keyed by index and `null` holes are skipped. Any
    /// other non-object node has no records.
    #[must_use]
    pub fn from_node(node: &Value) -> Vec<Self> {
        match node {
            Value::Object(children) => children
                .iter()
                .filter(|(_, child)| !child.is_null())
                .map(|(key, child)| Self::new(key.clone(), RawEvent::from_json(child)))
                .collect(),
            Value::Array(children) => children
                .iter()
                .enumerate()
                .filter(|(_, child)| !child.is_null())
                .map(|(index, child)| Self::new(index.to_string(), RawEvent::from_json(child)))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// A fully-validated incident.
///
/// Produced only by normalization; every field that downstream consumers
/// render is guaranteed populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    /// Feed key (or fallback id), unique within a collection.
    pub id: String,
    /// Always a finite coordinate.
    pub coordinate: Coordinate,
    /// Derived severity.
    pub severity: Severity,
    /// Category label, `"Unknown"` when the source had none.
    pub category: String,
    /// Short display type derived from the category.
    pub kind: String,
    /// Source headline, if any.
    pub headline: Option<String>,
    /// Never empty.
    pub description: String,
    /// Confidence in `[0, 1]`.
    pub confidence: Option<f64>,
    /// Integer impact score.
    pub impact: Option<i64>,
    /// When the event happened (ingest time if the source omitted it).
    pub timestamp: DateTime<Utc>,
    /// Human-readable age at normalization time.
    pub time_ago: String,
    /// Nearest named place.
    pub location_name: String,
    /// Lifecycle status.
    pub status: IncidentStatus,
}

impl Incident {
    /// Headline if present, otherwise the description.
    #[must_use]
    pub fn title(&self) -> &str {
        self.headline.as_deref().unwrap_or(&self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn severity_ranks_are_ordered() {
        assert!(Severity::High.rank() > Severity::Medium.rank());
        assert!(Severity::Medium.rank() > Severity::Low.rank());
    }

    #[test]
    fn severity_string_forms() {
        assert_eq!(Severity::Medium.to_string(), "medium");
        assert_eq!("high".parse::<Severity>().unwrap(), Severity::High);
        assert_eq!(
            serde_json::to_value(Severity::Low).unwrap(),
            json!("low")
        );
    }

    #[test]
    fn raw_event_tolerates_wrong_field_types() {
        let event = RawEvent::from_json(&json!({
            "category": 42,
            "context": "Fire response",
            "impact": "2",
            "confidence": [0.5],
            "timestamp": 1_700_000_000_000.0_f64,
        }));

        assert_eq!(event.category, None);
        assert_eq!(event.context.as_deref(), Some("Fire response"));
        assert_eq!(event.impact, Some(2.0));
        assert_eq!(event.confidence, None);
        assert_eq!(event.timestamp, Some(1_700_000_000_000));
    }

    #[test]
    fn raw_event_from_non_object_is_empty() {
        assert_eq!(RawEvent::from_json(&json!("garbage")), RawEvent::default());
    }

    #[test]
    fn feed_node_preserves_key_order() {
        let records = FeedRecord::from_node(&json!({
            "-a": { "category": "Public Safety" },
            "-b": { "category": "Infrastructure" },
        }));
        let keys: Vec<&str> = records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["-a", "-b"]);
        assert!(FeedRecord::from_node(&Value::Null).is_empty());
    }

    #[test]
    fn array_node_is_keyed_by_index() {
        let records = FeedRecord::from_node(&json!([
            null,
            { "category": "Public Safety", "impact": 3 },
            null,
            { "category": "Infrastructure" },
        ]));

        let keys: Vec<&str> = records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["1", "3"]);
        assert_eq!(records[0].event.impact, Some(3.0));
        assert!(FeedRecord::from_node(&json!("scalar")).is_empty());
    }

    #[test]
    fn raw_event_serialization_skips_missing_fields() {
        let event = RawEvent {
            headline: Some("Closure".to_string()),
            ..RawEvent::default()
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({ "headline": "Closure" })
        );
    }

    #[test]
    fn manhattan_distance_sums_axes() {
        let a = Coordinate::new(1.0, 2.0);
        let b = Coordinate::new(0.5, 3.0);
        assert!((a.manhattan_distance(&b) - 1.5).abs() < f64::EPSILON);
    }
}
