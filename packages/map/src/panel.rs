//! Popup content for incident markers.

use std::fmt::Write as _;

use city_pulse_incident_models::{Incident, IncidentStatus, Severity};
use html_escape::encode_text;

use crate::surface::MarkerColor;

/// Muted text color.
const MUTED: &str = "#6b7280";

/// The fields shown in an incident's popup.
#[derive(Debug, Clone, PartialEq)]
pub struct InfoPanel {
    /// Severity badge.
    pub severity: Severity,
    /// Age text.
    pub time_ago: String,
    /// Headline, or the incident kind when there is none.
    pub title: String,
    /// Description.
    pub description: String,
    /// Nearest landmark name.
    pub location: String,
    /// Category label.
    pub category: String,
    /// Confidence, when reported and non-zero.
    pub confidence: Option<f64>,
    /// Lifecycle status.
    pub status: IncidentStatus,
    /// Impact, when reported and non-zero.
    pub impact: Option<i64>,
}

impl InfoPanel {
    /// Builds the panel for `incident`.
    #[must_use]
    pub fn for_incident(incident: &Incident) -> Self {
        Self {
            severity: incident.severity,
            time_ago: incident.time_ago.clone(),
            title: incident
                .headline
                .clone()
                .unwrap_or_else(|| incident.kind.clone()),
            description: incident.description.clone(),
            location: incident.location_name.clone(),
            category: incident.category.clone(),
            confidence: incident.confidence.filter(|c| *c > 0.0),
            status: incident.status,
            impact: incident.impact.filter(|i| *i != 0),
        }
    }

    /// Confidence as a whole percentage.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn confidence_percent(&self) -> Option<i64> {
        self.confidence.map(|c| (c * 100.0).round() as i64)
    }

    /// Renders the panel as HTML. All text is escaped.
    #[must_use]
    #[allow(clippy::missing_panics_doc)]
    pub fn render_html(&self) -> String {
        let badge = MarkerColor::for_severity(self.severity).hex();
        let mut html = String::with_capacity(1024);

        html.push_str(r#"<div class="incident-popup" style="min-width:280px;max-width:320px">"#);

        write!(
            html,
            r#"<div class="incident-popup-header"><span class="severity-badge" style="background-color:{badge};color:white">{}</span>"#,
            encode_text(self.severity.as_ref()),
        )
        .unwrap();
        if !self.time_ago.is_empty() {
            write!(
                html,
                r#"<span class="time-ago" style="color:{MUTED}">{}</span>"#,
                encode_text(&self.time_ago),
            )
            .unwrap();
        }
        html.push_str("</div>");

        write!(
            html,
            "<h3>{}</h3><p>{}</p>",
            encode_text(&self.title),
            encode_text(&self.description),
        )
        .unwrap();
        write!(
            html,
            r#"<div class="location" style="color:{MUTED}">{}</div>"#,
            encode_text(&self.location),
        )
        .unwrap();

        html.push_str(r#"<div class="incident-popup-footer">"#);
        write!(
            html,
            r#"<span class="category">{}</span>"#,
            encode_text(&self.category),
        )
        .unwrap();
        if let (Some(confidence), Some(percent)) = (self.confidence, self.confidence_percent()) {
            write!(
                html,
                r#"<span class="confidence" style="color:{}">{percent}% confidence</span>"#,
                confidence_color(confidence),
            )
            .unwrap();
        }
        let status_color = match self.status {
            IncidentStatus::Active => MarkerColor::Green.hex(),
            IncidentStatus::Resolved => MUTED,
        };
        write!(
            html,
            r#"<span class="status" style="color:{status_color}">{}</span></div>"#,
            encode_text(self.status.as_ref()),
        )
        .unwrap();

        if let Some(impact) = self.impact {
            write!(
                html,
                r#"<div class="impact" style="color:{MUTED}">Impact Level: <strong>{impact}/3</strong></div>"#,
            )
            .unwrap();
        }

        html.push_str("</div>");
        html
    }
}

fn confidence_color(confidence: f64) -> &'static str {
    if confidence >= 0.9 {
        MarkerColor::Green.hex()
    } else if confidence >= 0.7 {
        MarkerColor::Amber.hex()
    } else {
        MarkerColor::Red.hex()
    }
}
