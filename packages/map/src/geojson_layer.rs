//! A [`MapSurface`] that renders to `GeoJSON`.
//!
//! The server keeps one layer in step with the published collection and
//! serves it to web clients, which draw each point feature with its
//! `color` property and attach `popupHtml` as the popup.

use std::collections::BTreeMap;

use geo::Point;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, feature::Id};

use crate::MapError;
use crate::surface::{Bounds, FitOptions, MapSurface, MarkerId, MarkerKind, MarkerSpec};

#[derive(Debug, Clone)]
struct LayerMarker {
    spec: MarkerSpec,
    popup: Option<String>,
}

/// In-memory marker layer.
#[derive(Debug, Clone, Default)]
pub struct GeoJsonLayer {
    markers: BTreeMap<MarkerId, LayerMarker>,
    viewport: Option<(Bounds, FitOptions)>,
    next_id: u64,
}

impl GeoJsonLayer {
    /// Creates an empty layer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of markers on the layer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Whether the layer has no markers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// The last viewport fit, if any.
    #[must_use]
    pub const fn viewport(&self) -> Option<&(Bounds, FitOptions)> {
        self.viewport.as_ref()
    }

    /// Renders every marker as a point feature, in placement order.
    ///
    /// The collection's `bbox` is the last fitted viewport; `padding` and
    /// `maxZoom` travel as foreign members.
    #[must_use]
    pub fn to_feature_collection(&self) -> FeatureCollection {
        let features = self
            .markers
            .iter()
            .map(|(id, marker)| to_feature(*id, marker))
            .collect();

        let (bbox, foreign_members) = self.viewport.map_or((None, None), |(bounds, fit)| {
            let mut members = JsonObject::new();
            members.insert("padding".to_string(), JsonValue::from(fit.padding));
            members.insert("maxZoom".to_string(), JsonValue::from(fit.max_zoom));
            (
                Some(vec![
                    bounds.south_west.lng,
                    bounds.south_west.lat,
                    bounds.north_east.lng,
                    bounds.north_east.lat,
                ]),
                Some(members),
            )
        });

        FeatureCollection {
            bbox,
            features,
            foreign_members,
        }
    }
}

fn to_feature(id: MarkerId, marker: &LayerMarker) -> Feature {
    let point = Point::new(marker.spec.coordinate.lng, marker.spec.coordinate.lat);

    let mut properties = JsonObject::new();
    properties.insert("markerId".to_string(), JsonValue::from(id.0));
    match &marker.spec.kind {
        MarkerKind::Incident(incident_id) => {
            properties.insert("kind".to_string(), JsonValue::from("incident"));
            properties.insert("incidentId".to_string(), JsonValue::from(incident_id.as_str()));
        }
        MarkerKind::Pick => {
            properties.insert("kind".to_string(), JsonValue::from("pick"));
        }
    }
    properties.insert(
        "color".to_string(),
        JsonValue::from(marker.spec.color.hex()),
    );
    if let Some(popup) = &marker.popup {
        properties.insert("popupHtml".to_string(), JsonValue::from(popup.as_str()));
    }

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::from(&point))),
        id: Some(Id::String(id.to_string())),
        properties: Some(properties),
        foreign_members: None,
    }
}

impl MapSurface for GeoJsonLayer {
    fn add_marker(&mut self, spec: MarkerSpec) -> Result<MarkerId, MapError> {
        if !spec.coordinate.is_finite() {
            return Err(MapError::InvalidCoordinate {
                lat: spec.coordinate.lat,
                lng: spec.coordinate.lng,
            });
        }

        self.next_id += 1;
        let id = MarkerId(self.next_id);
        self.markers.insert(id, LayerMarker { spec, popup: None });
        Ok(id)
    }

    fn remove_marker(&mut self, id: MarkerId) -> Result<(), MapError> {
        self.markers
            .remove(&id)
            .map(|_| ())
            .ok_or(MapError::UnknownMarker { id })
    }

    fn bind_popup(&mut self, id: MarkerId, html: &str) -> Result<(), MapError> {
        let marker = self
            .markers
            .get_mut(&id)
            .ok_or(MapError::UnknownMarker { id })?;
        marker.popup = Some(html.to_string());
        Ok(())
    }

    fn fit_bounds(&mut self, bounds: Bounds, options: FitOptions) -> Result<(), MapError> {
        self.viewport = Some((bounds, options));
        Ok(())
    }
}
