//! The external map widget seam.

use city_pulse_incident_models::{Coordinate, Severity};
use geo::{BoundingRect, MultiPoint, Point};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::MapError;

/// Padding applied on each side when fitting the viewport, in pixels.
pub const FIT_PADDING_PX: u32 = 20;

/// Maximum zoom level the viewport fit may reach.
pub const FIT_MAX_ZOOM: u8 = 15;

/// Handle to a marker placed on a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MarkerId(pub u64);

impl std::fmt::Display for MarkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "marker-{}", self.0)
    }
}

/// Marker fill colors.
#[derive(
    Debug,
    Clone,
    Copy,
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
pub enum MarkerColor {
    /// High severity.
    Red,
    /// Medium severity.
    Amber,
    /// Low severity.
    Green,
    /// The location-pick marker.
    Blue,
}

impl MarkerColor {
    /// Color for an incident of `severity`.
    #[must_use]
    pub const fn for_severity(severity: Severity) -> Self {
        match severity {
            Severity::High => Self::Red,
            Severity::Medium => Self::Amber,
            Severity::Low => Self::Green,
        }
    }

    /// CSS hex form.
    #[must_use]
    pub const fn hex(self) -> &'static str {
        match self {
            Self::Red => "#ef4444",
            Self::Amber => "#f59e0b",
            Self::Green => "#10b981",
            Self::Blue => "#3b82f6",
        }
    }
}

/// What a marker stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerKind {
    /// An incident, by id.
    Incident(String),
    /// The user's picked location.
    Pick,
}

/// Everything a surface needs to draw a marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    /// Position.
    pub coordinate: Coordinate,
    /// Fill color.
    pub color: MarkerColor,
    /// What the marker represents.
    pub kind: MarkerKind,
}

/// A latitude/longitude box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    /// Minimum latitude and longitude.
    pub south_west: Coordinate,
    /// Maximum latitude and longitude.
    pub north_east: Coordinate,
}

impl Bounds {
    /// Smallest box containing every coordinate, or `None` when there are
    /// none.
    #[must_use]
    pub fn enclosing(coordinates: &[Coordinate]) -> Option<Self> {
        let points: MultiPoint<f64> = coordinates
            .iter()
            .map(|c| Point::new(c.lng, c.lat))
            .collect();

        points.bounding_rect().map(|rect| Self {
            south_west: Coordinate::new(rect.min().y, rect.min().x),
            north_east: Coordinate::new(rect.max().y, rect.max().x),
        })
    }
}

/// Viewport fit options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitOptions {
    /// Padding on each side, in pixels.
    pub padding: u32,
    /// Zoom cap.
    pub max_zoom: u8,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            padding: FIT_PADDING_PX,
            max_zoom: FIT_MAX_ZOOM,
        }
    }
}

/// An interactive map widget.
///
/// Clicks are not delivered through this trait; the host forwards them to
/// [`crate::presenter::MapPresenter::handle_click`].
pub trait MapSurface {
    /// Places a marker and returns its handle.
    ///
    /// # Errors
    ///
    /// Returns [`MapError`] if the widget cannot draw the marker.
    fn add_marker(&mut self, spec: MarkerSpec) -> Result<MarkerId, MapError>;

    /// Removes a marker.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::UnknownMarker`] if `id` is not on the surface.
    fn remove_marker(&mut self, id: MarkerId) -> Result<(), MapError>;

    /// Attaches popup markup to a marker.
    ///
    /// # Errors
    ///
    /// Returns [`MapError`] if the marker is unknown or the widget fails.
    fn bind_popup(&mut self, id: MarkerId, html: &str) -> Result<(), MapError>;

    /// Moves the viewport so `bounds` is visible.
    ///
    /// # Errors
    ///
    /// Returns [`MapError`] if the widget fails.
    fn fit_bounds(&mut self, bounds: Bounds, options: FitOptions) -> Result<(), MapError>;
}
