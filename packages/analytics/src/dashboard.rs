//! Filtering, ordering and headline stats for incident list views.
//!
//! List views only show incidents inside the city's bounding box; the
//! published collection itself is never filtered.

use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};
use city_pulse_analytics_models::{DashboardStats, IncidentSort, SeverityCounts};
use city_pulse_geography::CityBounds;
use city_pulse_incident_models::{Incident, Severity};

/// Which incidents a list view shows.
#[derive(Debug, Clone, Default)]
pub struct IncidentFilter<'a> {
    /// Case-insensitive text matched against description, kind, location
    /// and headline. Blank matches everything.
    pub query: Option<&'a str>,
    /// Only this severity.
    pub severity: Option<Severity>,
    /// Only this category (exact match).
    pub category: Option<&'a str>,
    /// Only incidents inside these bounds.
    pub within: Option<&'a CityBounds>,
}

impl IncidentFilter<'_> {
    /// Whether `incident` passes every configured condition.
    #[must_use]
    pub fn matches(&self, incident: &Incident) -> bool {
        self.within
            .is_none_or(|bounds| bounds.contains(&incident.coordinate))
            && self.severity.is_none_or(|s| incident.severity == s)
            && self.category.is_none_or(|c| incident.category == c)
            && self.query.is_none_or(|q| matches_query(incident, q))
    }
}

fn matches_query(incident: &Incident, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }

    [
        Some(incident.description.as_str()),
        Some(incident.kind.as_str()),
        Some(incident.location_name.as_str()),
        incident.headline.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(&needle))
}

/// Incidents passing `filter`, in their original order.
#[must_use]
pub fn filter_incidents<'a>(
    incidents: &'a [Incident],
    filter: &IncidentFilter<'_>,
) -> Vec<&'a Incident> {
    incidents.iter().filter(|i| filter.matches(i)).collect()
}

/// Reorders `incidents` by `sort`, largest first. The sort is stable, so
/// ties keep their current order.
pub fn sort_incidents_by(incidents: &mut [&Incident], sort: IncidentSort) {
    incidents.sort_by(|a, b| compare(b, a, sort));
}

fn compare(a: &Incident, b: &Incident, sort: IncidentSort) -> Ordering {
    match sort {
        IncidentSort::Timestamp => a.timestamp.cmp(&b.timestamp),
        IncidentSort::Severity => a.severity.rank().cmp(&b.severity.rank()),
        IncidentSort::Confidence => a
            .confidence
            .unwrap_or(0.0)
            .total_cmp(&b.confidence.unwrap_or(0.0)),
        IncidentSort::Impact => a.impact.unwrap_or(0).cmp(&b.impact.unwrap_or(0)),
    }
}

/// Headline numbers over the incidents inside `bounds`. "Recent" means
/// reported less than an hour before `now`.
#[must_use]
pub fn dashboard_stats(
    incidents: &[Incident],
    bounds: &CityBounds,
    now: DateTime<Utc>,
) -> DashboardStats {
    let hour_ago = now - Duration::hours(1);
    let mut by_severity = SeverityCounts::default();
    let mut recent = 0;
    let mut categories: Vec<String> = Vec::new();

    for incident in incidents
        .iter()
        .filter(|i| bounds.contains(&i.coordinate))
    {
        by_severity.record(incident.severity);
        if incident.timestamp > hour_ago {
            recent += 1;
        }
        if !incident.category.is_empty() && !categories.contains(&incident.category) {
            categories.push(incident.category.clone());
        }
    }

    DashboardStats {
        total: by_severity.total(),
        by_severity,
        recent,
        categories,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use city_pulse_geography::Gazetteer;
    use city_pulse_incident_models::{Coordinate, IncidentStatus};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap()
    }

    fn incident(id: &str, severity: Severity, minutes_old: i64) -> Incident {
        Incident {
            id: id.to_string(),
            coordinate: Coordinate::new(12.9716, 77.5946),
            severity,
            category: "Public Safety".to_string(),
            kind: "Safety".to_string(),
            headline: None,
            description: format!("{id} description"),
            confidence: None,
            impact: None,
            timestamp: now() - Duration::minutes(minutes_old),
            time_ago: String::new(),
            location_name: "MG Road, Bengaluru".to_string(),
            status: IncidentStatus::Active,
        }
    }

    fn ids(incidents: &[&Incident]) -> Vec<String> {
        incidents.iter().map(|i| i.id.clone()).collect()
    }

    #[test]
    fn search_covers_description_kind_location_and_headline() {
        let mut flooded = incident("a", Severity::Low, 5);
        flooded.headline = Some("Waterlogging near Silk Board".to_string());
        let mut traffic = incident("b", Severity::Low, 5);
        traffic.kind = "Traffic".to_string();
        traffic.location_name = "Whitefield, Bengaluru".to_string();
        let incidents = vec![flooded, traffic];

        let search = |q: &str| {
            ids(&filter_incidents(
                &incidents,
                &IncidentFilter {
                    query: Some(q),
                    ..IncidentFilter::default()
                },
            ))
        };

        assert_eq!(search("silk board"), vec!["a"]);
        assert_eq!(search("TRAFFIC"), vec!["b"]);
        assert_eq!(search("whitefield"), vec!["b"]);
        assert_eq!(search("B DESCRIPTION"), vec!["b"]);
        assert_eq!(search("  "), vec!["a", "b"]);
        assert!(search("airport").is_empty());
    }

    #[test]
    fn bounds_filter_drops_out_of_city_incidents() {
        let mut mumbai = incident("far", Severity::High, 5);
        mumbai.coordinate = Coordinate::new(19.076, 72.8777);
        let incidents = vec![mumbai, incident("near", Severity::High, 5)];

        let filter = IncidentFilter {
            within: Some(Gazetteer::bengaluru().bounds()),
            severity: Some(Severity::High),
            ..IncidentFilter::default()
        };
        assert_eq!(ids(&filter_incidents(&incidents, &filter)), vec!["near"]);
    }

    #[test]
    fn sort_modes_put_largest_first() {
        let mut a = incident("a", Severity::Low, 30);
        a.confidence = Some(0.95);
        a.impact = None;
        let mut b = incident("b", Severity::High, 90);
        b.confidence = None;
        b.impact = Some(3);
        let mut c = incident("c", Severity::Medium, 1);
        c.confidence = Some(0.5);
        c.impact = Some(1);
        let incidents = [a, b, c];
        let sorted = |sort| {
            let mut list: Vec<&Incident> = incidents.iter().collect();
            sort_incidents_by(&mut list, sort);
            ids(&list)
        };

        assert_eq!(sorted(IncidentSort::Timestamp), vec!["c", "a", "b"]);
        assert_eq!(sorted(IncidentSort::Severity), vec!["b", "c", "a"]);
        assert_eq!(sorted(IncidentSort::Confidence), vec!["a", "c", "b"]);
        assert_eq!(sorted(IncidentSort::Impact), vec!["b", "c", "a"]);
    }

    #[test]
    fn stats_count_in_city_incidents_only() {
        let mut outside = incident("out", Severity::High, 5);
        outside.coordinate = Coordinate::new(28.6139, 77.209);
        let mut road = incident("road", Severity::Medium, 120);
        road.category = "Traffic & Transportation".to_string();
        let incidents = vec![
            incident("a", Severity::High, 5),
            road,
            incident("b", Severity::Low, 59),
            outside,
        ];

        let stats = dashboard_stats(&incidents, Gazetteer::bengaluru().bounds(), now());

        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_severity.get(Severity::High), 1);
        assert_eq!(stats.by_severity.get(Severity::Medium), 1);
        assert_eq!(stats.by_severity.get(Severity::Low), 1);
        assert_eq!(stats.recent, 2);
        assert_eq!(
            stats.categories,
            vec!["Public Safety", "Traffic & Transportation"]
        );
    }
}
