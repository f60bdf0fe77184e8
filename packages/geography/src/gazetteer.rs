//! Fixed list of named landmarks and nearest-name lookup.
//!
//! The default gazetteer is embedded at compile time from
//! `gazetteers/bengaluru.toml`. Lookup is a linear nearest-neighbor scan by
//! Manhattan distance; the list is small enough that no spatial index is
//! needed, and the first entry wins ties regardless of list size.
//!
//! Every gazetteer also carries the city's bounding box. Deserializing a
//! [`Gazetteer`] runs the same validation as [`Gazetteer::from_toml`], so a
//! gazetteer value is never empty.

use std::sync::LazyLock;

use city_pulse_incident_models::Coordinate;
use serde::Deserialize;
use thiserror::Error;

const BENGALURU_TOML: &str = include_str!("../gazetteers/bengaluru.toml");

static BENGALURU: LazyLock<Gazetteer> = LazyLock::new(|| {
    Gazetteer::from_toml(BENGALURU_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse embedded gazetteer: {e}"))
});

/// A named reference point.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Landmark {
    /// Display name (e.g. `"MG Road, Bengaluru"`).
    pub name: String,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl Landmark {
    /// The landmark's position.
    #[must_use]
    pub const fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

/// Errors loading a gazetteer definition.
#[derive(Debug, Error)]
pub enum GazetteerError {
    /// The TOML could not be parsed.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The gazetteer has no landmarks.
    #[error("gazetteer for {city} has no landmarks")]
    Empty {
        /// City the gazetteer describes.
        city: String,
    },

    /// A landmark has a non-finite coordinate.
    #[error("landmark {name:?} has a non-finite coordinate")]
    InvalidLandmark {
        /// Landmark name.
        name: String,
    },

    /// The city bounds are not finite or are inverted.
    #[error("gazetteer for {city} has invalid bounds")]
    InvalidBounds {
        /// City the gazetteer describes.
        city: String,
    },
}

/// Latitude/longitude box around a city, edges inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CityBounds {
    /// Northern latitude limit.
    pub north: f64,
    /// Southern latitude limit.
    pub south: f64,
    /// Eastern longitude limit.
    pub east: f64,
    /// Western longitude limit.
    pub west: f64,
}

impl CityBounds {
    /// Whether `coordinate` lies inside the box.
    #[must_use]
    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        (self.south..=self.north).contains(&coordinate.lat)
            && (self.west..=self.east).contains(&coordinate.lng)
    }

    fn is_valid(&self) -> bool {
        [self.north, self.south, self.east, self.west]
            .iter()
            .all(|v| v.is_finite())
            && self.south <= self.north
            && self.west <= self.east
    }
}

#[derive(Deserialize)]
struct GazetteerDef {
    city: String,
    bounds: CityBounds,
    landmarks: Vec<Landmark>,
}

/// An ordered, non-empty list of landmarks for one city.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "GazetteerDef")]
pub struct Gazetteer {
    /// City the landmarks belong to.
    pub city: String,
    bounds: CityBounds,
    landmarks: Vec<Landmark>,
}

impl TryFrom<GazetteerDef> for Gazetteer {
    type Error = GazetteerError;

    fn try_from(def: GazetteerDef) -> Result<Self, Self::Error> {
        if def.landmarks.is_empty() {
            return Err(GazetteerError::Empty { city: def.city });
        }

        if let Some(bad) = def.landmarks.iter().find(|l| !l.coordinate().is_finite()) {
            return Err(GazetteerError::InvalidLandmark {
                name: bad.name.clone(),
            });
        }

        if !def.bounds.is_valid() {
            return Err(GazetteerError::InvalidBounds { city: def.city });
        }

        Ok(Self {
            city: def.city,
            bounds: def.bounds,
            landmarks: def.landmarks,
        })
    }
}

impl Gazetteer {
    /// Parses and validates a gazetteer definition.
    ///
    /// # Errors
    ///
    /// Returns [`GazetteerError`] if the TOML is malformed, has no
    /// landmarks, any landmark has a non-finite coordinate, or the bounds
    /// are invalid.
    pub fn from_toml(source: &str) -> Result<Self, GazetteerError> {
        let def: GazetteerDef = toml::de::from_str(source)?;
        Self::try_from(def)
    }

    /// The embedded Bengaluru gazetteer.
    #[must_use]
    pub fn bengaluru() -> &'static Self {
        &BENGALURU
    }

    /// The city's bounding box.
    #[must_use]
    pub const fn bounds(&self) -> &CityBounds {
        &self.bounds
    }

    /// All landmarks, in definition order.
    #[must_use]
    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }

    /// Returns the landmark nearest to `coordinate` by Manhattan distance.
    ///
    /// Strictly-smaller distances replace the current best, so the earliest
    /// entry wins ties.
    #[must_use]
    pub fn nearest(&self, coordinate: &Coordinate) -> &Landmark {
        let mut best = &self.landmarks[0];
        let mut best_distance = best.coordinate().manhattan_distance(coordinate);

        for landmark in &self.landmarks[1..] {
            let distance = landmark.coordinate().manhattan_distance(coordinate);
            if distance < best_distance {
                best = landmark;
                best_distance = distance;
            }
        }

        best
    }

    /// Name of the nearest landmark.
    #[must_use]
    pub fn nearest_name(&self, coordinate: &Coordinate) -> &str {
        &self.nearest(coordinate).name
    }
}
