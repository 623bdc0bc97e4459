//! Coordinate utilities for marker placement.
//!
//! Provides longitude normalization, date-line mirroring for markers that
//! render near the antimeridian, and simple bounds/centroid/zoom estimation
//! from a set of marker positions. All functions are stateless.

use std::fmt;

/// Maximum valid latitude in degrees.
pub const MAX_LAT: f64 = 90.0;

/// Minimum valid latitude in degrees.
pub const MIN_LAT: f64 = -90.0;

/// Absolute longitude beyond which a marker gets a date-line duplicate.
///
/// Markers past this longitude are close enough to the antimeridian that a
/// mirrored copy is needed for continuous-looking rendering on both map edges.
pub const DATELINE_THRESHOLD_DEG: f64 = 140.0;

/// Errors for invalid geographic inputs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoordError {
    /// Latitude outside [-90, 90].
    #[error("invalid latitude: {0}")]
    InvalidLatitude(f64),

    /// Longitude is not a finite number.
    #[error("invalid longitude: {0}")]
    InvalidLongitude(f64),
}

/// Validates a latitude/longitude pair.
///
/// Longitudes outside [-180, 180] are accepted (they normalize), but both
/// values must be finite and latitude must be within [-90, 90].
pub fn validate(lat: f64, lon: f64) -> Result<(), CoordError> {
    if !lat.is_finite() || !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !lon.is_finite() {
        return Err(CoordError::InvalidLongitude(lon));
    }
    Ok(())
}

/// Wraps a longitude into the canonical [-180, 180] range.
///
/// Mirrored date-line duplicates store raw longitudes outside this range;
/// consumers normalize on render.
#[inline]
pub fn normalize_lon(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid maps exactly +180 to -180; keep +180 stable
    if wrapped == -180.0 && lon > 0.0 {
        180.0
    } else {
        wrapped
    }
}

/// Returns true if a marker at this longitude needs a date-line duplicate.
#[inline]
pub fn needs_dateline_mirror(lon: f64) -> bool {
    lon.abs() > DATELINE_THRESHOLD_DEG
}

/// Reflects a longitude across the ±180 meridian.
///
/// The result is deliberately left un-normalized (e.g. 175 mirrors to -185)
/// so the duplicate renders on the opposite numeric side of the map;
/// [`normalize_lon`] maps it back to the original position.
#[inline]
pub fn mirror_lon(lon: f64) -> f64 {
    if lon < 0.0 {
        180.0 + (180.0 + lon)
    } else {
        -180.0 - (180.0 - lon)
    }
}

/// Axis-aligned geographic bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl GeoBounds {
    /// Creates a degenerate bounds containing a single point.
    pub fn from_point(lat: f64, lon: f64) -> Self {
        Self {
            min_lat: lat,
            max_lat: lat,
            min_lon: lon,
            max_lon: lon,
        }
    }

    /// Extends the bounds to include another point.
    pub fn extend(&mut self, lat: f64, lon: f64) {
        self.min_lat = self.min_lat.min(lat);
        self.max_lat = self.max_lat.max(lat);
        self.min_lon = self.min_lon.min(lon);
        self.max_lon = self.max_lon.max(lon);
    }

    /// Center point of the bounds.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    /// Largest of the latitude/longitude spans, in degrees.
    pub fn span(&self) -> f64 {
        (self.max_lat - self.min_lat).max(self.max_lon - self.min_lon)
    }
}

impl fmt::Display for GeoBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.3},{:.3}]..[{:.3},{:.3}]",
            self.min_lat, self.min_lon, self.max_lat, self.max_lon
        )
    }
}

/// Computes the bounds of a set of positions.
///
/// Returns `None` for an empty iterator.
pub fn bounds_of(points: impl IntoIterator<Item = (f64, f64)>) -> Option<GeoBounds> {
    let mut iter = points.into_iter();
    let (lat, lon) = iter.next()?;
    let mut bounds = GeoBounds::from_point(lat, lon);
    for (lat, lon) in iter {
        bounds.extend(lat, lon);
    }
    Some(bounds)
}

/// Estimates a map zoom level that fits the given bounds.
///
/// Uses coarse span breakpoints; the rendering surface applies its own
/// clamping, so precision here is not important.
pub fn estimate_zoom(bounds: &GeoBounds) -> f64 {
    let span = bounds.span();
    match span {
        s if s > 120.0 => 2.0,
        s if s > 60.0 => 3.0,
        s if s > 30.0 => 4.0,
        s if s > 15.0 => 5.0,
        s if s > 7.0 => 6.0,
        s if s > 3.0 => 7.0,
        s if s > 1.5 => 8.0,
        s if s > 0.5 => 9.0,
        _ => 10.0,
    }
}
