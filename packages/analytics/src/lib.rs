#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Summary statistics derived from the incident collection.
//!
//! [`aggregate`] is a pure function of the collection it is given. It
//! relies on the collection already being in published order (severity
//! descending, then newest first) for the recent-activity feed.
//! [`dashboard`] holds the search, ordering and stats used by list views.

pub mod dashboard;
pub mod fallback;

use city_pulse_analytics_models::{
    AnalyticsSnapshot, CategoryCount, RecentActivity, SeverityCounts, TrendingCategory,
};
use city_pulse_incident_models::{Incident, IncidentStatus};

/// Maximum number of trending categories reported.
pub const TRENDING_LIMIT: usize = 5;

/// Maximum number of recent-activity entries reported.
pub const RECENT_ACTIVITY_LIMIT: usize = 5;

/// Computes the analytics snapshot for `incidents`.
#[must_use]
pub fn aggregate(incidents: &[Incident]) -> AnalyticsSnapshot {
    let mut by_category: Vec<CategoryCount> = Vec::new();
    let mut by_severity = SeverityCounts::default();
    let mut active = 0;
    let mut resolved = 0;

    for incident in incidents {
        by_severity.record(incident.severity);

        match incident.status {
            IncidentStatus::Active => active += 1,
            IncidentStatus::Resolved => resolved += 1,
        }

        if let Some(entry) = by_category
            .iter_mut()
            .find(|c| c.category == incident.category)
        {
            entry.count += 1;
        } else {
            by_category.push(CategoryCount {
                category: incident.category.clone(),
                count: 1,
            });
        }
    }

    log::trace!(
        "Aggregated {} incidents into {} categories",
        incidents.len(),
        by_category.len()
    );

    AnalyticsSnapshot {
        total: incidents.len(),
        active,
        resolved,
        trending: trending(&by_category),
        by_category,
        by_severity,
        recent_activity: incidents
            .iter()
            .take(RECENT_ACTIVITY_LIMIT)
            .map(|incident| RecentActivity {
                time: incident.time_ago.clone(),
                event: incident.title().to_string(),
                severity: incident.severity,
            })
            .collect(),
    }
}

/// Most frequent categories, count descending. `sort_by` is stable, so
/// equal counts keep first-seen order.
fn trending(by_category: &[CategoryCount]) -> Vec<TrendingCategory> {
    let mut ranked: Vec<&CategoryCount> = by_category.iter().collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));

    ranked
        .into_iter()
        .take(TRENDING_LIMIT)
        .map(|c| TrendingCategory {
            category: c.category.clone(),
            count: c.count,
            trend: None,
            change: None,
        })
        .collect()
}
