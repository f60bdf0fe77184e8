//! `"lat,lng"` string parsing.

use city_pulse_incident_models::{Coordinate, DEFAULT_COORDINATE};
use thiserror::Error;

/// Why a geolocation string was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeolocationError {
    /// The string did not contain exactly two comma-separated parts.
    #[error("expected \"lat,lng\", got {0:?}")]
    Malformed(String),

    /// A component was not a finite decimal number.
    #[error("invalid {axis} component {value:?}")]
    InvalidComponent {
        /// `"latitude"` or `"longitude"`.
        axis: &'static str,
        /// The offending text.
        value: String,
    },

    /// A component parsed but lies outside the WGS84 range.
    #[error("{axis} {value} out of range")]
    OutOfRange {
        /// `"latitude"` or `"longitude"`.
        axis: &'static str,
        /// The offending value.
        value: String,
    },
}

/// Parses a `"lat,lng"` string into a validated coordinate.
///
/// # Errors
///
/// Returns [`GeolocationError`] if the string is not two comma-separated
/// finite numbers within latitude/longitude range.
pub fn parse_geolocation(raw: &str) -> Result<Coordinate, GeolocationError> {
    let mut parts = raw.split(',');
    let (Some(lat), Some(lng), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(GeolocationError::Malformed(raw.to_string()));
    };

    let lat = parse_component("latitude", lat, 90.0)?;
    let lng = parse_component("longitude", lng, 180.0)?;

    Ok(Coordinate::new(lat, lng))
}

fn parse_component(axis: &'static str, text: &str, limit: f64) -> Result<f64, GeolocationError> {
    let text = text.trim();
    let value = text
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| GeolocationError::InvalidComponent {
            axis,
            value: text.to_string(),
        })?;

    if value.abs() > limit {
        return Err(GeolocationError::OutOfRange {
            axis,
            value: text.to_string(),
        });
    }

    Ok(value)
}

/// Resolves an optional geolocation string, substituting
/// [`DEFAULT_COORDINATE`] when it is missing or invalid.
///
/// Never fails: one bad record must not halt ingestion.
#[must_use]
pub fn resolve_geolocation(raw: Option<&str>) -> Coordinate {
    let Some(raw) = raw else {
        return DEFAULT_COORDINATE;
    };

    match parse_geolocation(raw) {
        Ok(coordinate) => coordinate,
        Err(e) => {
            log::debug!("Using default coordinate: {e}");
            DEFAULT_COORDINATE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_pair() {
        let c = parse_geolocation("12.9279, 77.6271").unwrap();
        assert!((c.lat - 12.9279).abs() < f64::EPSILON);
        assert!((c.lng - 77.6271).abs() < f64::EPSILON);
    }

    #[test]
    fn non_numeric_pair_resolves_to_default() {
        assert_eq!(resolve_geolocation(Some("abc,def")), DEFAULT_COORDINATE);
    }

    #[test]
    fn missing_geolocation_resolves_to_default() {
        assert_eq!(resolve_geolocation(None), DEFAULT_COORDINATE);
        assert_eq!(resolve_geolocation(Some("")), DEFAULT_COORDINATE);
    }

    #[test]
    fn rejects_wrong_part_count() {
        assert!(matches!(
            parse_geolocation("12.97"),
            Err(GeolocationError::Malformed(_))
        ));
        assert!(matches!(
            parse_geolocation("1,2,3"),
            Err(GeolocationError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_non_finite_components() {
        assert!(parse_geolocation("NaN,77.5").is_err());
        assert!(parse_geolocation("12.9,inf").is_err());
        assert_eq!(resolve_geolocation(Some("12.9,inf")), DEFAULT_COORDINATE);
    }

    #[test]
    fn rejects_out_of_range_components() {
        assert!(matches!(
            parse_geolocation("91,0"),
            Err(GeolocationError::OutOfRange { axis: "latitude", .. })
        ));
        assert!(matches!(
            parse_geolocation("0,-180.5"),
            Err(GeolocationError::OutOfRange { axis: "longitude", .. })
        ));
    }
}
