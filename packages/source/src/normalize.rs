//! Raw feed record to canonical [`Incident`] normalization.
//!
//! Normalization never fails. Every missing or malformed field degrades to a
//! documented default so a single bad record cannot abort a snapshot.

use chrono::{DateTime, Utc};
use city_pulse_geography::{Gazetteer, resolve_geolocation};
use city_pulse_incident_models::{FeedRecord, Incident, IncidentStatus, RawEvent};

use crate::age::time_ago;
use crate::severity::classify_severity;
use crate::type_mapping::{UNKNOWN_CATEGORY, kind_for_category};

/// Description used when a record has neither context nor headline.
pub const NO_DESCRIPTION: &str = "No description available";

/// Normalizes one feed record.
#[must_use]
pub fn normalize_event(
    key: &str,
    event: &RawEvent,
    now: DateTime<Utc>,
    gazetteer: &Gazetteer,
) -> Incident {
    let coordinate = resolve_geolocation(event.geolocation.as_deref());
    let severity = classify_severity(event.impact, event.category.as_deref().unwrap_or(""));
    let location_name = gazetteer.nearest_name(&coordinate).to_string();

    let source_timestamp = event
        .timestamp
        .filter(|ms| *ms != 0)
        .and_then(DateTime::from_timestamp_millis);

    let category = non_empty(event.category.as_deref())
        .unwrap_or(UNKNOWN_CATEGORY)
        .to_string();
    let kind = kind_for_category(&category).to_string();

    let description = non_empty(event.context.as_deref())
        .or_else(|| non_empty(event.headline.as_deref()))
        .unwrap_or(NO_DESCRIPTION)
        .to_string();

    #[allow(clippy::cast_possible_truncation)]
    let impact = event
        .impact
        .filter(|v| v.is_finite())
        .map(|v| v.round() as i64);

    Incident {
        id: key.to_string(),
        coordinate,
        severity,
        category,
        kind,
        headline: non_empty(event.headline.as_deref()).map(str::to_string),
        description,
        confidence: event
            .confidence
            .filter(|c| c.is_finite())
            .map(|c| c.clamp(0.0, 1.0)),
        impact,
        timestamp: source_timestamp.unwrap_or(now),
        time_ago: time_ago(source_timestamp, now),
        location_name,
        status: IncidentStatus::Active,
    }
}

/// Normalizes a full feed snapshot and orders it for publication.
#[must_use]
pub fn normalize_snapshot(
    records: &[FeedRecord],
    now: DateTime<Utc>,
    gazetteer: &Gazetteer,
) -> Vec<Incident> {
    let mut incidents: Vec<Incident> = records
        .iter()
        .map(|record| normalize_event(&record.key, &record.event, now, gazetteer))
        .collect();

    sort_incidents(&mut incidents);
    incidents
}

/// Sorts by severity (most severe first), then newest first.
///
/// The sort is stable, so records that tie on both keep feed order.
pub fn sort_incidents(incidents: &mut [Incident]) {
    incidents.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| b.timestamp.cmp(&a.timestamp))
    });
}

/// Whether `incidents` satisfies the publication ordering.
#[must_use]
pub fn is_sorted(incidents: &[Incident]) -> bool {
    incidents.windows(2).all(|pair| {
        let (a, b) = (&pair[0], &pair[1]);
        a.severity > b.severity || (a.severity == b.severity && a.timestamp >= b.timestamp)
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use city_pulse_incident_models::{DEFAULT_COORDINATE, Severity};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap()
    }

    fn normalize(event: &RawEvent) -> Incident {
        normalize_event("-key", event, now(), Gazetteer::bengaluru())
    }

    fn event_at(category: &str, impact: f64, minutes_ago: i64) -> RawEvent {
        RawEvent {
            category: Some(category.to_string()),
            impact: Some(impact),
            timestamp: Some((now() - Duration::minutes(minutes_ago)).timestamp_millis()),
            ..RawEvent::default()
        }
    }

    #[test]
    fn fire_response_scenario() {
        let incident = normalize(&RawEvent {
            category: Some("Public Safety".to_string()),
            impact: Some(3.0),
            geolocation: Some("12.9279,77.6271".to_string()),
            context: Some("Fire response".to_string()),
            ..RawEvent::default()
        });

        assert_eq!(incident.id, "-key");
        assert_eq!(incident.severity, Severity::High);
        assert_eq!(incident.location_name, "HSR Layout, Bengaluru");
        assert_eq!(incident.description, "Fire response");
        assert_eq!(incident.kind, "Emergency");
        assert_eq!(incident.status, IncidentStatus::Active);
    }

    #[test]
    fn malformed_geolocation_uses_default_coordinate() {
        let incident = normalize(&RawEvent {
            geolocation: Some("abc,def".to_string()),
            ..RawEvent::default()
        });
        assert_eq!(incident.coordinate, DEFAULT_COORDINATE);
        assert_eq!(incident.location_name, "MG Road, Bengaluru");
    }

    #[test]
    fn empty_record_is_fully_populated() {
        let incident = normalize(&RawEvent::default());

        assert_eq!(incident.coordinate, DEFAULT_COORDINATE);
        assert_eq!(incident.severity, Severity::Low);
        assert_eq!(incident.category, UNKNOWN_CATEGORY);
        assert_eq!(incident.description, NO_DESCRIPTION);
        assert_eq!(incident.timestamp, now());
        assert_eq!(incident.time_ago, crate::age::UNKNOWN_TIME);
        assert!(!incident.location_name.is_empty());
        assert_eq!(incident.headline, None);
        assert_eq!(incident.impact, None);
    }

    #[test]
    fn description_falls_back_to_headline() {
        let incident = normalize(&RawEvent {
            context: Some("   ".to_string()),
            headline: Some("Signal outage".to_string()),
            ..RawEvent::default()
        });
        assert_eq!(incident.description, "Signal outage");
        assert_eq!(incident.title(), "Signal outage");
    }

    #[test]
    fn confidence_is_clamped_and_impact_rounded() {
        let incident = normalize(&RawEvent {
            confidence: Some(1.4),
            impact: Some(2.6),
            ..RawEvent::default()
        });
        assert_eq!(incident.confidence, Some(1.0));
        assert_eq!(incident.impact, Some(3));
        assert_eq!(incident.severity, Severity::Medium);
    }

    #[test]
    fn timestamp_produces_age_text() {
        let incident = normalize(&event_at("Public Safety", 1.0, 15));
        assert_eq!(incident.time_ago, "15 mins ago");
        assert_eq!(incident.timestamp, now() - Duration::minutes(15));
    }

    #[test]
    fn snapshot_is_sorted_by_severity_then_recency() {
        let records = vec![
            FeedRecord::new("low-new", event_at("Education", 1.0, 1)),
            FeedRecord::new("high-old", event_at("Public Safety", 3.0, 90)),
            FeedRecord::new("medium", event_at("Infrastructure", 2.0, 5)),
            FeedRecord::new("high-new", event_at("Public Safety", 3.0, 2)),
        ];

        let incidents = normalize_snapshot(&records, now(), Gazetteer::bengaluru());
        let ids: Vec<&str> = incidents.iter().map(|i| i.id.as_str()).collect();

        assert_eq!(ids, vec!["high-new", "high-old", "medium", "low-new"]);
        assert!(is_sorted(&incidents));
    }

    #[test]
    fn exact_ties_keep_feed_order() {
        let records = vec![
            FeedRecord::new("b", event_at("Education", 1.0, 3)),
            FeedRecord::new("a", event_at("Education", 1.0, 3)),
            FeedRecord::new("c", event_at("Education", 1.0, 3)),
        ];

        let incidents = normalize_snapshot(&records, now(), Gazetteer::bengaluru());
        let ids: Vec<&str> = incidents.iter().map(|i| i.id.as_str()).collect();

        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn one_bad_record_does_not_affect_others() {
        let records = vec![
            FeedRecord::new(
                "bad",
                RawEvent {
                    geolocation: Some("not a location".to_string()),
                    impact: Some(f64::INFINITY),
                    timestamp: Some(i64::MAX),
                    ..RawEvent::default()
                },
            ),
            FeedRecord::new("good", event_at("Public Safety", 3.0, 10)),
        ];

        let incidents = normalize_snapshot(&records, now(), Gazetteer::bengaluru());

        assert_eq!(incidents.len(), 2);
        assert_eq!(incidents[0].id, "good");
        assert_eq!(incidents[1].coordinate, DEFAULT_COORDINATE);
    }
}
