//! Coordinate extraction from free-form text
//!
//! Pure and total: any input yields either a validated coordinate pair or
//! nothing. Candidates outside the service area bounding box are rejected
//! so a street number pair never becomes a map pin.

use std::sync::LazyLock;

use regex::Regex;

/// Service area bounds (Guyana and surrounding Caribbean coast)
pub const LAT_MIN: f64 = -10.0;
pub const LAT_MAX: f64 = 15.0;
pub const LNG_MIN: f64 = -70.0;
pub const LNG_MAX: f64 = -50.0;

/// Fallback centroid used when a location can't be parsed (Georgetown)
pub const DEFAULT_COORDS: (f64, f64) = (6.8013, -58.1551);

// Patterns are tried in order; the first match wins.
static DECIMAL_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(-?\d+\.?\d*),\s*(-?\d+\.?\d*)").expect("valid regex")
});

static LABELED_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)lat[:\s]*(-?\d+\.?\d*)[,\s]*lon[g]?[:\s]*(-?\d+\.?\d*)")
        .expect("valid regex")
});

static DEGREE_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+\.?\d*)[°]?\s*([NS])[,\s]*(\d+\.?\d*)[°]?\s*([EW])")
        .expect("valid regex")
});

/// Extract a coordinate pair from text
///
/// Recognizes bare decimal pairs ("6.8013, -58.1551"), labeled pairs
/// ("lat: 6.8 long: -58.1"), and degree notation ("6.8N, 58.1W").
#[must_use]
pub fn extract_coordinates(text: &str) -> Option<(f64, f64)> {
    if let Some(caps) = DECIMAL_PAIR.captures(text) {
        let lat: f64 = caps.get(1)?.as_str().parse().ok()?;
        let lng: f64 = caps.get(2)?.as_str().parse().ok()?;
        return validate(lat, lng);
    }

    if let Some(caps) = LABELED_PAIR.captures(text) {
        let lat: f64 = caps.get(1)?.as_str().parse().ok()?;
        let lng: f64 = caps.get(2)?.as_str().parse().ok()?;
        return validate(lat, lng);
    }

    if let Some(caps) = DEGREE_PAIR.captures(text) {
        let mut lat: f64 = caps.get(1)?.as_str().parse().ok()?;
        let mut lng: f64 = caps.get(3)?.as_str().parse().ok()?;
        if caps.get(2)?.as_str().eq_ignore_ascii_case("S") {
            lat = -lat;
        }
        if caps.get(4)?.as_str().eq_ignore_ascii_case("W") {
            lng = -lng;
        }
        return validate(lat, lng);
    }

    None
}

/// Accept a candidate pair only inside the service bounding box
const fn validate(lat: f64, lng: f64) -> Option<(f64, f64)> {
    if lat >= LAT_MIN && lat <= LAT_MAX && lng >= LNG_MIN && lng <= LNG_MAX {
        Some((lat, lng))
    } else {
        None
    }
}
