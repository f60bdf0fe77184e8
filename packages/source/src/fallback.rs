//! Fixed demo incidents published whenever live data is unavailable.
//!
//! Timestamps are relative to the moment the set is built; everything else
//! is constant so fallback-mode output is deterministic.

use chrono::{DateTime, Duration, Utc};
use city_pulse_incident_models::{Coordinate, Incident, IncidentStatus, Severity};

use crate::normalize::sort_incidents;

/// Number of incidents in the demo set.
pub const FALLBACK_INCIDENT_COUNT: usize = 5;

struct DemoIncident {
    id: &'static str,
    lat: f64,
    lng: f64,
    kind: &'static str,
    description: &'static str,
    severity: Severity,
    minutes_ago: i64,
    location: &'static str,
    time_ago: &'static str,
    category: &'static str,
    headline: &'static str,
    confidence: f64,
    impact: i64,
}

const DEMO_INCIDENTS: [DemoIncident; FALLBACK_INCIDENT_COUNT] = [
    DemoIncident {
        id: "demo-1",
        lat: 12.9716,
        lng: 77.5946,
        kind: "Traffic Accident",
        description: "Multi-vehicle collision on MG Road causing traffic delays (Demo Data)",
        severity: Severity::High,
        minutes_ago: 2,
        location: "MG Road, Bengaluru",
        time_ago: "2 mins ago",
        category: "Traffic & Transportation",
        headline: "Major Traffic Accident on MG Road",
        confidence: 0.9,
        impact: 3,
    },
    DemoIncident {
        id: "demo-2",
        lat: 12.9698,
        lng: 77.5986,
        kind: "Road Closure",
        description: "Construction work blocking two lanes on Brigade Road (Demo Data)",
        severity: Severity::Medium,
        minutes_ago: 15,
        location: "Brigade Road, Bengaluru",
        time_ago: "15 mins ago",
        category: "Administrative Announcements",
        headline: "Road Construction on Brigade Road",
        confidence: 0.85,
        impact: 2,
    },
    DemoIncident {
        id: "demo-3",
        lat: 12.975,
        lng: 77.59,
        kind: "Water Logging",
        description: "Heavy rainfall causing waterlogging in low-lying areas (Demo Data)",
        severity: Severity::Low,
        minutes_ago: 60,
        location: "Cubbon Park Area, Bengaluru",
        time_ago: "1 hour ago",
        category: "Weather & Environment",
        headline: "Waterlogging in Cubbon Park Area",
        confidence: 0.8,
        impact: 1,
    },
    DemoIncident {
        id: "demo-4",
        lat: 12.9352,
        lng: 77.6245,
        kind: "Public Event",
        description: "Cultural festival causing temporary road closures in Koramangala (Demo Data)",
        severity: Severity::Low,
        minutes_ago: 180,
        location: "Koramangala, Bengaluru",
        time_ago: "3 hours ago",
        category: "Events & Gatherings",
        headline: "Cultural Festival in Koramangala",
        confidence: 0.92,
        impact: 1,
    },
    DemoIncident {
        id: "demo-5",
        lat: 12.9279,
        lng: 77.6271,
        kind: "Emergency Response",
        description: "Fire department responding to emergency call in HSR Layout (Demo Data)",
        severity: Severity::High,
        minutes_ago: 45,
        location: "HSR Layout, Bengaluru",
        time_ago: "45 mins ago",
        category: "Public Safety",
        headline: "Emergency Response in HSR Layout",
        confidence: 0.95,
        impact: 3,
    },
];

/// Builds the demo set, already in publication order.
#[must_use]
pub fn fallback_incidents(now: DateTime<Utc>) -> Vec<Incident> {
    let mut incidents: Vec<Incident> = DEMO_INCIDENTS
        .iter()
        .map(|demo| Incident {
            id: demo.id.to_string(),
            coordinate: Coordinate::new(demo.lat, demo.lng),
            severity: demo.severity,
            category: demo.category.to_string(),
            kind: demo.kind.to_string(),
            headline: Some(demo.headline.to_string()),
            description: demo.description.to_string(),
            confidence: Some(demo.confidence),
            impact: Some(demo.impact),
            timestamp: now - Duration::minutes(demo.minutes_ago),
            time_ago: demo.time_ago.to_string(),
            location_name: demo.location.to_string(),
            status: IncidentStatus::Active,
        })
        .collect();

    sort_incidents(&mut incidents);
    incidents
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::age::time_ago;
    use crate::normalize::is_sorted;

    #[test]
    fn demo_set_has_five_sorted_incidents() {
        let incidents = fallback_incidents(Utc::now());
        assert_eq!(incidents.len(), FALLBACK_INCIDENT_COUNT);
        assert!(is_sorted(&incidents));

        let ids: Vec<&str> = incidents.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["demo-1", "demo-5", "demo-2", "demo-3", "demo-4"]);
    }

    #[test]
    fn demo_ages_match_offsets() {
        let now = Utc::now();
        for incident in fallback_incidents(now) {
            assert_eq!(incident.time_ago, time_ago(Some(incident.timestamp), now));
        }
    }

    #[test]
    fn demo_set_is_deterministic_for_a_given_instant() {
        let now = Utc::now();
        assert_eq!(fallback_incidents(now), fallback_incidents(now));
    }

    #[test]
    fn demo_descriptions_are_marked() {
        for incident in fallback_incidents(Utc::now()) {
            assert!(incident.description.ends_with("(Demo Data)"));
            assert_eq!(incident.status, IncidentStatus::Active);
        }
    }
}
