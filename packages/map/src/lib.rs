#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Map presentation of the incident collection.
//!
//! The [`presenter::MapPresenter`] drives any widget implementing
//! [`surface::MapSurface`]: on every collection update it tears down all
//! incident markers, places one colored marker per incident with an
//! [`panel::InfoPanel`] popup, and fits the viewport to the plotted points.
//! [`geojson_layer::GeoJsonLayer`] is a surface that renders to a `GeoJSON`
//! `FeatureCollection` for web clients.

pub mod geojson_layer;
pub mod panel;
pub mod presenter;
pub mod surface;

use surface::MarkerId;
use thiserror::Error;

/// Errors reported by a map surface.
#[derive(Debug, Error)]
pub enum MapError {
    /// The marker does not exist on the surface.
    #[error("unknown marker {id}")]
    UnknownMarker {
        /// The missing marker.
        id: MarkerId,
    },

    /// The coordinate cannot be plotted.
    #[error("coordinate ({lat}, {lng}) cannot be plotted")]
    InvalidCoordinate {
        /// Latitude.
        lat: f64,
        /// Longitude.
        lng: f64,
    },

    /// The widget failed for another reason.
    #[error("map widget error: {message}")]
    Widget {
        /// Description of the failure.
        message: String,
    },
}
