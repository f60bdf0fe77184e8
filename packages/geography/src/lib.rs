#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geolocation parsing and nearest-landmark naming.
//!
//! Feed records carry their location as a free-form `"lat,lng"` string.
//! [`resolve::resolve_geolocation`] turns that into a [`Coordinate`] that is
//! always usable, and [`gazetteer::Gazetteer`] labels it with the nearest
//! known landmark.
//!
//! [`Coordinate`]: city_pulse_incident_models::Coordinate

pub mod gazetteer;
pub mod resolve;

pub use gazetteer::{CityBounds, Gazetteer, Landmark};
pub use resolve::{GeolocationError, parse_geolocation, resolve_geolocation};
