//! Marker reconciliation.
//!
//! Every update removes all incident markers and rebuilds them from the new
//! collection. At tens to low hundreds of markers a full rebuild is cheap;
//! a keyed diff would only pay off at much larger scales.

use city_pulse_incident_models::{Coordinate, Incident};

use crate::MapError;
use crate::panel::InfoPanel;
use crate::surface::{Bounds, FitOptions, MapSurface, MarkerColor, MarkerId, MarkerKind, MarkerSpec};

/// Callback invoked with each picked location.
pub type PickCallback = Box<dyn FnMut(Coordinate) + Send>;

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    /// Markers removed from the previous pass.
    pub removed: usize,
    /// Markers placed for this pass.
    pub placed: usize,
    /// Old markers the surface refused to remove. They are retried on
    /// the next pass.
    pub stale: usize,
    /// Ids of incidents that got no marker.
    pub skipped: Vec<String>,
    /// Viewport the surface was asked to fit, if any.
    pub bounds: Option<Bounds>,
}

struct PickMode {
    marker: Option<MarkerId>,
    on_pick: PickCallback,
}

/// Keeps a surface's incident markers in 1:1 correspondence with the
/// incident collection.
pub struct MapPresenter {
    markers: Vec<MarkerId>,
    /// Markers the surface failed to remove; retried on every pass.
    stale: Vec<MarkerId>,
    pick: Option<PickMode>,
}

impl Default for MapPresenter {
    fn default() -> Self {
        Self::new()
    }
}

impl MapPresenter {
    /// Creates a presenter with no markers placed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            markers: Vec::new(),
            stale: Vec::new(),
            pick: None,
        }
    }

    /// Number of incident markers currently placed.
    #[must_use]
    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Replaces all incident markers with markers for `incidents`, then
    /// fits the viewport to them.
    ///
    /// Incidents with non-finite coordinates and failing widget calls are
    /// logged and skipped; the pass always completes. An empty collection
    /// clears the markers and leaves the viewport alone. The pick marker
    /// is never touched.
    pub fn reconcile<S: MapSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        incidents: &[Incident],
    ) -> ReconcileReport {
        let mut report = ReconcileReport {
            removed: self.clear_markers(surface),
            ..ReconcileReport::default()
        };

        report.stale = self.stale.len();

        let mut plotted = Vec::with_capacity(incidents.len());
        for incident in incidents {
            match place(surface, incident) {
                Ok(id) => {
                    self.markers.push(id);
                    plotted.push(incident.coordinate);
                    report.placed += 1;
                }
                Err(e) => {
                    log::warn!("Skipping marker for incident {}: {e}", incident.id);
                    report.skipped.push(incident.id.clone());
                }
            }
        }

        if let Some(bounds) = Bounds::enclosing(&plotted) {
            match surface.fit_bounds(bounds, FitOptions::default()) {
                Ok(()) => report.bounds = Some(bounds),
                Err(e) => log::error!("Failed to fit map bounds: {e}"),
            }
        }

        log::debug!(
            "Reconciled map: removed {}, placed {}, skipped {}, stale {}",
            report.removed,
            report.placed,
            report.skipped.len(),
            report.stale
        );
        report
    }

    fn clear_markers<S: MapSurface + ?Sized>(&mut self, surface: &mut S) -> usize {
        let previous: Vec<MarkerId> = self.stale.drain(..).chain(self.markers.drain(..)).collect();
        let mut removed = 0;
        for id in previous {
            match surface.remove_marker(id) {
                Ok(()) => removed += 1,
                Err(e) => {
                    log::warn!("Failed to remove {id}, retrying next pass: {e}");
                    self.stale.push(id);
                }
            }
        }
        removed
    }

    /// Enables location picking. Each later click replaces the pick marker
    /// and invokes `on_pick` with the clicked coordinate.
    pub fn enable_pick(&mut self, on_pick: impl FnMut(Coordinate) + Send + 'static) {
        let marker = self.pick.take().and_then(|p| p.marker);
        self.pick = Some(PickMode {
            marker,
            on_pick: Box::new(on_pick),
        });
    }

    /// Disables location picking and removes the pick marker.
    pub fn disable_pick<S: MapSurface + ?Sized>(&mut self, surface: &mut S) {
        if let Some(id) = self.pick.take().and_then(|p| p.marker)
            && let Err(e) = surface.remove_marker(id)
        {
            log::warn!("Failed to remove pick marker: {e}");
        }
    }

    /// Whether location picking is enabled.
    #[must_use]
    pub const fn is_picking(&self) -> bool {
        self.pick.is_some()
    }

    /// The current pick marker, if one is placed.
    #[must_use]
    pub fn pick_marker(&self) -> Option<MarkerId> {
        self.pick.as_ref().and_then(|p| p.marker)
    }

    /// Handles a click on the map. Outside pick mode this does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`MapError`] if the coordinate is not finite or the widget
    /// cannot place the pick marker. The callback is not invoked then.
    pub fn handle_click<S: MapSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        coordinate: Coordinate,
    ) -> Result<Option<MarkerId>, MapError> {
        let Some(pick) = self.pick.as_mut() else {
            return Ok(None);
        };
        if !coordinate.is_finite() {
            return Err(MapError::InvalidCoordinate {
                lat: coordinate.lat,
                lng: coordinate.lng,
            });
        }

        if let Some(previous) = pick.marker.take()
            && let Err(e) = surface.remove_marker(previous)
        {
            log::warn!("Failed to remove previous pick marker: {e}");
        }

        let id = surface.add_marker(MarkerSpec {
            coordinate,
            color: MarkerColor::Blue,
            kind: MarkerKind::Pick,
        })?;
        pick.marker = Some(id);

        log::debug!("Picked location {},{}", coordinate.lat, coordinate.lng);
        (pick.on_pick)(coordinate);
        Ok(Some(id))
    }

    /// Removes every marker this presenter placed, including the pick
    /// marker.
    pub fn teardown<S: MapSurface + ?Sized>(&mut self, surface: &mut S) {
        self.clear_markers(surface);
        if let Some(pick) = self.pick.as_mut()
            && let Some(id) = pick.marker.take()
            && let Err(e) = surface.remove_marker(id)
        {
            log::warn!("Failed to remove pick marker: {e}");
        }
    }
}

fn place<S: MapSurface + ?Sized>(surface: &mut S, incident: &Incident) -> Result<MarkerId, MapError> {
    let coordinate = incident.coordinate;
    if !coordinate.is_finite() {
        return Err(MapError::InvalidCoordinate {
            lat: coordinate.lat,
            lng: coordinate.lng,
        });
    }

    let id = surface.add_marker(MarkerSpec {
        coordinate,
        color: MarkerColor::for_severity(incident.severity),
        kind: MarkerKind::Incident(incident.id.clone()),
    })?;

    let html = InfoPanel::for_incident(incident).render_html();
    if let Err(e) = surface.bind_popup(id, &html) {
        log::warn!("Failed to bind popup for incident {}: {e}", incident.id);
    }
    Ok(id)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    use super::*;
    use chrono::Utc;
    use city_pulse_incident_models::{IncidentStatus, Severity};

    /// Surface double recording every call.
    #[derive(Default)]
    pub struct RecordingSurface {
        pub markers: BTreeMap<MarkerId, (MarkerSpec, Option<String>)>,
        pub fits: Vec<Bounds>,
        pub fail_on_incident: Option<String>,
        pub fail_fit: bool,
        pub fail_removals: usize,
        next: u64,
    }

    impl MapSurface for RecordingSurface {
        fn add_marker(&mut self, spec: MarkerSpec) -> Result<MarkerId, MapError> {
            if let (Some(bad), MarkerKind::Incident(id)) = (&self.fail_on_incident, &spec.kind)
                && bad == id
            {
                return Err(MapError::Widget {
                    message: "icon failed".to_string(),
                });
            }
            self.next += 1;
            let id = MarkerId(self.next);
            self.markers.insert(id, (spec, None));
            Ok(id)
        }

        fn remove_marker(&mut self, id: MarkerId) -> Result<(), MapError> {
            if self.fail_removals > 0 {
                self.fail_removals -= 1;
                return Err(MapError::Widget {
                    message: "layer busy".to_string(),
                });
            }
            self.markers
                .remove(&id)
                .map(|_| ())
                .ok_or(MapError::UnknownMarker { id })
        }

        fn bind_popup(&mut self, id: MarkerId, html: &str) -> Result<(), MapError> {
            let entry = self
                .markers
                .get_mut(&id)
                .ok_or(MapError::UnknownMarker { id })?;
            entry.1 = Some(html.to_string());
            Ok(())
        }

        fn fit_bounds(&mut self, bounds: Bounds, _options: FitOptions) -> Result<(), MapError> {
            if self.fail_fit {
                return Err(MapError::Widget {
                    message: "map not ready".to_string(),
                });
            }
            self.fits.push(bounds);
            Ok(())
        }
    }

    impl RecordingSurface {
        fn positions(&self) -> Vec<(f64, f64)> {
            let mut positions: Vec<(f64, f64)> = self
                .markers
                .values()
                .map(|(spec, _)| (spec.coordinate.lat, spec.coordinate.lng))
                .collect();
            positions.sort_by(|a, b| a.partial_cmp(b).unwrap());
            positions
        }
    }

    pub fn incident(id: &str, lat: f64, lng: f64, severity: Severity) -> Incident {
        Incident {
            id: id.to_string(),
            coordinate: Coordinate::new(lat, lng),
            severity,
            category: "Infrastructure".to_string(),
            kind: "Construction".to_string(),
            headline: Some(format!("Incident {id}")),
            description: "Pothole".to_string(),
            confidence: Some(0.8),
            impact: Some(1),
            timestamp: Utc::now(),
            time_ago: "Just now".to_string(),
            location_name: "MG Road, Bengaluru".to_string(),
            status: IncidentStatus::Active,
        }
    }

    fn collection() -> Vec<Incident> {
        vec![
            incident("a", 12.9716, 77.5946, Severity::High),
            incident("b", 12.9352, 77.6245, Severity::Medium),
            incident("c", 12.8456, 77.6603, Severity::Low),
        ]
    }

    #[test]
    fn places_one_colored_marker_per_incident() {
        let mut surface = RecordingSurface::default();
        let mut presenter = MapPresenter::new();

        let report = presenter.reconcile(&mut surface, &collection());

        assert_eq!(report.placed, 3);
        assert_eq!(report.removed, 0);
        assert_eq!(surface.markers.len(), 3);
        let colors: Vec<MarkerColor> = surface.markers.values().map(|(s, _)| s.color).collect();
        assert_eq!(
            colors,
            vec![MarkerColor::Red, MarkerColor::Amber, MarkerColor::Green]
        );
        assert!(surface.markers.values().all(|(_, popup)| popup.is_some()));
        assert_eq!(surface.fits.len(), 1);
        assert_eq!(surface.fits[0].south_west, Coordinate::new(12.8456, 77.5946));
    }

    #[test]
    fn reconciling_twice_is_idempotent() {
        let mut surface = RecordingSurface::default();
        let mut presenter = MapPresenter::new();

        presenter.reconcile(&mut surface, &collection());
        let once = surface.positions();
        let report = presenter.reconcile(&mut surface, &collection());

        assert_eq!(report.removed, 3);
        assert_eq!(surface.markers.len(), 3);
        assert_eq!(surface.positions(), once);
        assert_eq!(presenter.marker_count(), 3);
    }

    #[test]
    fn skips_bad_incidents_without_aborting() {
        let mut surface = RecordingSurface {
            fail_on_incident: Some("b".to_string()),
            ..RecordingSurface::default()
        };
        let mut presenter = MapPresenter::new();
        let mut incidents = collection();
        incidents.push(incident("nan", f64::NAN, 77.6, Severity::High));

        let report = presenter.reconcile(&mut surface, &incidents);

        assert_eq!(report.placed, 2);
        assert_eq!(report.skipped, vec!["b".to_string(), "nan".to_string()]);
        assert!(report.bounds.is_some());
    }

    #[test]
    fn failed_removals_are_retried_next_pass() {
        let mut surface = RecordingSurface::default();
        let mut presenter = MapPresenter::new();
        presenter.reconcile(&mut surface, &collection());

        surface.fail_removals = 1;
        let report = presenter.reconcile(&mut surface, &collection());
        assert_eq!(report.removed, 2);
        assert_eq!(report.placed, 3);
        assert_eq!(report.stale, 1);
        assert_eq!(surface.markers.len(), 4);

        let report = presenter.reconcile(&mut surface, &collection());
        assert_eq!(report.removed, 4);
        assert_eq!(report.stale, 0);
        assert_eq!(surface.markers.len(), 3);
        assert_eq!(presenter.marker_count(), 3);
    }

    #[test]
    fn fit_failure_is_not_fatal() {
        let mut surface = RecordingSurface {
            fail_fit: true,
            ..RecordingSurface::default()
        };
        let report = MapPresenter::new().reconcile(&mut surface, &collection());
        assert_eq!(report.placed, 3);
        assert_eq!(report.bounds, None);
    }

    #[test]
    fn empty_collection_clears_markers_without_fitting() {
        let mut surface = RecordingSurface::default();
        let mut presenter = MapPresenter::new();
        presenter.reconcile(&mut surface, &collection());

        let report = presenter.reconcile(&mut surface, &[]);

        assert_eq!(report.removed, 3);
        assert!(surface.markers.is_empty());
        assert_eq!(surface.fits.len(), 1);
    }

    #[test]
    fn pick_marker_is_replaced_and_kept_apart() {
        let picked = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&picked);
        let mut surface = RecordingSurface::default();
        let mut presenter = MapPresenter::new();

        assert_eq!(
            presenter
                .handle_click(&mut surface, Coordinate::new(1.0, 1.0))
                .unwrap(),
            None
        );

        presenter.enable_pick(move |c| sink.lock().unwrap().push(c));
        let first = presenter
            .handle_click(&mut surface, Coordinate::new(12.9, 77.6))
            .unwrap()
            .unwrap();
        let second = presenter
            .handle_click(&mut surface, Coordinate::new(12.95, 77.65))
            .unwrap()
            .unwrap();

        assert_ne!(first, second);
        assert!(!surface.markers.contains_key(&first));
        assert_eq!(surface.markers[&second].0.color, MarkerColor::Blue);
        assert_eq!(picked.lock().unwrap().len(), 2);

        presenter.reconcile(&mut surface, &collection());
        presenter.reconcile(&mut surface, &collection());
        assert!(surface.markers.contains_key(&second));
        assert_eq!(surface.markers.len(), 4);

        presenter.disable_pick(&mut surface);
        assert_eq!(surface.markers.len(), 3);
        assert!(!presenter.is_picking());
    }

    #[test]
    fn teardown_removes_everything() {
        let mut surface = RecordingSurface::default();
        let mut presenter = MapPresenter::new();
        presenter.enable_pick(|_| {});
        presenter
            .handle_click(&mut surface, Coordinate::new(12.9, 77.6))
            .unwrap();
        presenter.reconcile(&mut surface, &collection());

        presenter.teardown(&mut surface);

        assert!(surface.markers.is_empty());
        assert_eq!(presenter.marker_count(), 0);
        assert_eq!(presenter.pick_marker(), None);
    }
}
