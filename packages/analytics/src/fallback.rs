//! Fixed analytics published alongside the demo incident set.

use city_pulse_analytics_models::{
    AnalyticsSnapshot, CategoryCount, RecentActivity, SeverityCounts, TrendDirection,
    TrendingCategory,
};
use city_pulse_incident_models::Severity;

const TRENDING: [(&str, usize, TrendDirection, &str); 5] = [
    ("Traffic & Transportation", 34, TrendDirection::Up, "+12%"),
    ("Administrative Announcements", 26, TrendDirection::Down, "-8%"),
    ("Weather & Environment", 19, TrendDirection::Up, "+15%"),
    ("Public Safety", 12, TrendDirection::Down, "-5%"),
    ("Infrastructure", 8, TrendDirection::Up, "+3%"),
];

const RECENT_ACTIVITY: [(&str, &str, Severity); 5] = [
    (
        "2 mins ago",
        "Traffic accident reported on MG Road (Demo)",
        Severity::High,
    ),
    (
        "15 mins ago",
        "Road closure on Brigade Road updated (Demo)",
        Severity::Medium,
    ),
    (
        "1 hour ago",
        "Water logging reported in Cubbon Park area (Demo)",
        Severity::Low,
    ),
    (
        "3 hours ago",
        "Emergency response completed in Koramangala (Demo)",
        Severity::High,
    ),
    (
        "6 hours ago",
        "Construction work started in HSR Layout (Demo)",
        Severity::Medium,
    ),
];

/// The demo analytics snapshot.
///
/// Totals and trends are illustrative and do not describe the demo
/// incidents. The demo has no severity breakdown, so `by_severity` is zero.
#[must_use]
pub fn fallback_analytics() -> AnalyticsSnapshot {
    AnalyticsSnapshot {
        total: 156,
        active: 89,
        resolved: 67,
        by_category: TRENDING
            .iter()
            .map(|(category, count, ..)| CategoryCount {
                category: (*category).to_string(),
                count: *count,
            })
            .collect(),
        by_severity: SeverityCounts::default(),
        trending: TRENDING
            .iter()
            .map(|(category, count, trend, change)| TrendingCategory {
                category: (*category).to_string(),
                count: *count,
                trend: Some(*trend),
                change: Some((*change).to_string()),
            })
            .collect(),
        recent_activity: RECENT_ACTIVITY
            .iter()
            .map(|(time, event, severity)| RecentActivity {
                time: (*time).to_string(),
                event: (*event).to_string(),
                severity: *severity,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_snapshot_is_fixed() {
        let snapshot = fallback_analytics();

        assert_eq!(
            (snapshot.total, snapshot.active, snapshot.resolved),
            (156, 89, 67)
        );
        assert_eq!(snapshot.trending.len(), 5);
        assert_eq!(snapshot.trending[0].category, "Traffic & Transportation");
        assert_eq!(snapshot.trending[0].trend, Some(TrendDirection::Up));
        assert_eq!(snapshot.trending[0].change.as_deref(), Some("+12%"));
        assert_eq!(snapshot.trending[3].change.as_deref(), Some("-5%"));
        assert_eq!(
            snapshot.recent_activity[2].event,
            "Water logging reported in Cubbon Park area (Demo)"
        );
        assert_eq!(snapshot, fallback_analytics());
    }
}
