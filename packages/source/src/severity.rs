//! Severity classification from impact score and category.

use city_pulse_incident_models::{Severity, TRANSPORTATION_CATEGORY};

/// Impact assumed for records that omit it (or store `0`).
pub const DEFAULT_IMPACT: f64 = 1.0;

/// Returns the impact score used for classification.
///
/// Missing, zero, and non-finite scores all count as [`DEFAULT_IMPACT`].
#[must_use]
#[allow(clippy::float_cmp)]
pub fn effective_impact(impact: Option<f64>) -> f64 {
    match impact {
        Some(value) if value.is_finite() && value != 0.0 => value,
        _ => DEFAULT_IMPACT,
    }
}

/// Derives a severity level.
///
/// Rules are applied in order; the transportation rule deliberately
/// escalates low-impact traffic events one level above the generic rule.
#[must_use]
pub fn classify_severity(impact: Option<f64>, category: &str) -> Severity {
    let impact = effective_impact(impact);

    if impact >= 3.0 {
        Severity::High
    } else if impact >= 2.0 {
        Severity::Medium
    } else if category == TRANSPORTATION_CATEGORY && impact >= 1.0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}
