#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Summary statistics over the published incident collection.
//!
//! An [`AnalyticsSnapshot`] is recomputed from scratch whenever the
//! collection changes. Trend fields on [`TrendingCategory`] are only
//! populated by the demo snapshot; live snapshots have no historical
//! baseline to compare against and leave them empty.

use city_pulse_incident_models::Severity;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Direction a category's volume moved relative to a previous period.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TrendDirection {
    /// Volume increased.
    Up,
    /// Volume decreased.
    Down,
}

/// Number of incidents in one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    /// Category label.
    pub category: String,
    /// Incidents in this category.
    pub count: usize,
}

/// Incident counts per severity level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityCounts {
    /// High-severity incidents.
    pub high: usize,
    /// Medium-severity incidents.
    pub medium: usize,
    /// Low-severity incidents.
    pub low: usize,
}

impl SeverityCounts {
    /// Counts one more incident of `severity`.
    pub const fn record(&mut self, severity: Severity) {
        match severity {
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
    }

    /// Count for `severity`.
    #[must_use]
    pub const fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }

    /// Sum over all levels.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}

/// One of the most frequent categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingCategory {
    /// Category label.
    pub category: String,
    /// Incidents in this category.
    pub count: usize,
    /// Movement since the previous period, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend: Option<TrendDirection>,
    /// Percentage change since the previous period (e.g. `"+12%"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<String>,
}

/// One line of the recent-activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    /// Human-readable age of the incident.
    pub time: String,
    /// Short text describing the incident.
    pub event: String,
    /// Incident severity.
    pub severity: Severity,
}

/// Aggregate view of an incident collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    /// Number of incidents.
    pub total: usize,
    /// Incidents still active.
    pub active: usize,
    /// Incidents marked resolved.
    pub resolved: usize,
    /// Counts per category, in first-seen order.
    pub by_category: Vec<CategoryCount>,
    /// Counts per severity.
    pub by_severity: SeverityCounts,
    /// Up to five most frequent categories, most frequent first.
    pub trending: Vec<TrendingCategory>,
    /// Up to five most urgent incidents.
    pub recent_activity: Vec<RecentActivity>,
}

/// Ordering for incident list views. Every mode puts the largest value
/// first; missing confidence or impact counts as zero.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IncidentSort {
    /// Newest first.
    #[default]
    Timestamp,
    /// Most severe first.
    Severity,
    /// Most confident first.
    Confidence,
    /// Highest impact first.
    Impact,
}

/// Headline numbers for the in-city incident list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// In-city incidents.
    pub total: usize,
    /// In-city incidents per severity, serialized as `high`/`medium`/`low`.
    #[serde(flatten)]
    pub by_severity: SeverityCounts,
    /// In-city incidents reported within the last hour.
    pub recent: usize,
    /// Distinct categories among in-city incidents, in first-seen order.
    pub categories: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_counts_track_each_level() {
        let mut counts = SeverityCounts::default();
        counts.record(Severity::High);
        counts.record(Severity::High);
        counts.record(Severity::Low);

        assert_eq!(counts.get(Severity::High), 2);
        assert_eq!(counts.get(Severity::Medium), 0);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn trending_omits_unknown_trend_fields() {
        let trending = TrendingCategory {
            category: "Infrastructure".to_string(),
            count: 4,
            trend: None,
            change: None,
        };
        let json = serde_json::to_value(&trending).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "category": "Infrastructure", "count": 4 })
        );
    }

    #[test]
    fn dashboard_stats_flatten_severity_counts() {
        let stats = DashboardStats {
            total: 3,
            by_severity: SeverityCounts {
                high: 1,
                medium: 2,
                low: 0,
            },
            recent: 1,
            categories: vec!["Public Safety".to_string()],
        };
        assert_eq!(
            serde_json::to_value(&stats).unwrap(),
            serde_json::json!({
                "total": 3,
                "high": 1,
                "medium": 2,
                "low": 0,
                "recent": 1,
                "categories": ["Public Safety"],
            })
        );
    }

    #[test]
    fn sort_modes_parse_from_query_strings() {
        assert_eq!("impact".parse::<IncidentSort>().unwrap(), IncidentSort::Impact);
        assert_eq!(IncidentSort::default(), IncidentSort::Timestamp);
        assert!("newest".parse::<IncidentSort>().is_err());
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let json = serde_json::to_value(AnalyticsSnapshot::default()).unwrap();
        assert!(json.get("bySeverity").is_some());
        assert!(json.get("recentActivity").is_some());
    }
}
