#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the city pulse server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the pipeline types to allow independent evolution of the API
//! contract.

use chrono::{DateTime, Utc};
use city_pulse_analytics_models::IncidentSort;
use city_pulse_incident_models::{Incident, IncidentStatus, Severity};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Always `true` when the server answers.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// An incident as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiIncident {
    /// Feed key, or `demo-N` for demo incidents.
    pub id: String,
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
    /// Severity level.
    pub severity: Severity,
    /// Severity rank (1-3).
    pub severity_rank: u8,
    /// Category label.
    pub category: String,
    /// Short incident kind.
    #[serde(rename = "type")]
    pub kind: String,
    /// Headline, if any.
    pub headline: Option<String>,
    /// Description.
    pub description: String,
    /// Confidence in `[0, 1]`.
    pub confidence: Option<f64>,
    /// Impact score.
    pub impact: Option<i64>,
    /// When the incident was reported.
    pub timestamp: DateTime<Utc>,
    /// Human-readable age.
    pub time_ago: String,
    /// Nearest landmark name.
    pub location: String,
    /// Lifecycle status.
    pub status: IncidentStatus,
}

impl From<&Incident> for ApiIncident {
    fn from(incident: &Incident) -> Self {
        Self {
            id: incident.id.clone(),
            lat: incident.coordinate.lat,
            lng: incident.coordinate.lng,
            severity: incident.severity,
            severity_rank: incident.severity.rank(),
            category: incident.category.clone(),
            kind: incident.kind.clone(),
            headline: incident.headline.clone(),
            description: incident.description.clone(),
            confidence: incident.confidence,
            impact: incident.impact,
            timestamp: incident.timestamp,
            time_ago: incident.time_ago.clone(),
            location: incident.location_name.clone(),
            status: incident.status,
        }
    }
}

/// Query parameters for the incidents endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentQueryParams {
    /// Case-insensitive search over description, type, location and
    /// headline.
    pub q: Option<String>,
    /// Only incidents of this severity.
    pub severity: Option<Severity>,
    /// Only incidents in this category (exact match).
    pub category: Option<String>,
    /// Only incidents inside the city's bounding box.
    pub in_city: Option<bool>,
    /// Reorder before limiting. Absent keeps the published order.
    pub sort: Option<IncidentSort>,
    /// Maximum number of incidents returned.
    pub limit: Option<usize>,
}

/// Incident list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiIncidentList {
    /// Matching incidents in published order.
    pub incidents: Vec<ApiIncident>,
    /// Whether the list comes from the demo set.
    pub using_fallback: bool,
}

/// Pipeline status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStatus {
    /// Synchronizer state (e.g. `"live"`, `"no_backend"`).
    pub state: String,
    /// User-facing indicator (`"connected"`, `"demo_data"`, ...).
    pub indicator: String,
    /// Whether demo data is published.
    pub using_fallback: bool,
    /// Whether the first snapshot is still pending.
    pub loading: bool,
    /// Non-fatal status message.
    pub error: Option<String>,
    /// Number of published incidents.
    pub incident_count: usize,
    /// Name of the feed client, if one is configured.
    pub backend: Option<String>,
    /// When the current snapshot was published.
    pub updated_at: DateTime<Utc>,
}

/// Response to a successful create.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCreated {
    /// Key the feed generated for the new event.
    pub id: String,
}

/// Error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// What went wrong.
    pub error: String,
}

impl ApiError {
    /// Creates an error body.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
