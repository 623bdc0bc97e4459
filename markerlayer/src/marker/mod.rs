//! Marker records and refresh payloads.
//!
//! The wire format is permissive: records may omit ids (derived from the
//! positional index), coordinates (the record is then excluded entirely),
//! and metric values. [`Marker`] is the validated, fully-populated form the
//! reconciliation engine works with.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::coord;

/// Number of discrete icon glyphs available; the positional index wraps
/// around this to pick a glyph.
pub const ICON_GLYPH_COUNT: u32 = 16;

/// Suffix appended to a marker id for its date-line duplicate.
pub const DATELINE_ID_SUFFIX: &str = "_dateline";

// =============================================================================
// Identity
// =============================================================================

/// Stable marker identity within a live set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(String);

impl MarkerId {
    /// Creates an id from an explicit upstream value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derives an id from a positional index (`marker_{i}`).
    pub fn from_index(index: usize) -> Self {
        Self(format!("marker_{index}"))
    }

    /// Id of this marker's date-line duplicate.
    pub fn dateline(&self) -> Self {
        Self(format!("{}{}", self.0, DATELINE_ID_SUFFIX))
    }

    /// Whether this id names a date-line duplicate.
    pub fn is_dateline(&self) -> bool {
        self.0.ends_with(DATELINE_ID_SUFFIX)
    }

    /// String form of the id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Wire format
// =============================================================================

/// How a refresh payload asks to be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshMode {
    /// Force a full rebuild of the live set.
    Full,
    /// Prefer the incremental diff path.
    Incremental,
}

/// A marker record as supplied by the data source.
///
/// Everything is optional on the wire; [`Marker::from_raw`] validates and
/// fills in derived fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMarker {
    /// Explicit id; derived from the positional index when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Latitude in degrees. Records without one are excluded.
    #[serde(default)]
    pub lat: Option<f64>,

    /// Longitude in degrees. Records without one are excluded.
    #[serde(default)]
    pub lon: Option<f64>,

    /// State or metric value driving marker color.
    #[serde(default)]
    pub variant: Option<f64>,

    /// Marker category tag (e.g. "satellite").
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub marker_type: Option<String>,

    /// Human-readable name for popups and tooltips.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Refresh payload handed to the reconciliation engine.
///
/// An absent `list` is a no-op, not an error. A `map_url` or a full
/// `refreshMode` signals a structural change that forces a full rebuild.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefreshPayload {
    /// Incoming marker records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<Vec<RawMarker>>,

    /// New tile source URL, if the base map changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_url: Option<String>,

    /// Requested application mode.
    #[serde(
        default,
        rename = "refreshMode",
        skip_serializing_if = "Option::is_none"
    )]
    pub refresh_mode: Option<RefreshMode>,
}

impl RefreshPayload {
    /// Payload carrying just a marker list.
    pub fn with_list(list: Vec<RawMarker>) -> Self {
        Self {
            list: Some(list),
            ..Self::default()
        }
    }

    /// Whether this payload demands a full rebuild regardless of diff size.
    pub fn forces_rebuild(&self) -> bool {
        self.map_url.is_some() || self.refresh_mode == Some(RefreshMode::Full)
    }
}

// =============================================================================
// Validated marker
// =============================================================================

/// Marker category, selecting which icon metrics apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkerType {
    #[default]
    Standard,
    Satellite,
}

impl MarkerType {
    fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some("satellite") => Self::Satellite,
            _ => Self::Standard,
        }
    }
}

/// A validated marker with derived identity and icon fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    /// Unique id within the live set.
    pub id: MarkerId,
    pub lat: f64,
    /// Raw longitude; date-line duplicates store un-normalized values.
    pub lon: f64,
    /// State or metric value driving color.
    pub variant: f64,
    pub marker_type: MarkerType,
    /// Discrete glyph selector (`i mod 16`).
    pub icon_index: u8,
    /// Coarse color bucket (`floor(i / 16)`).
    pub color_bucket: u8,
    pub display_name: String,
}

impl Marker {
    /// Validates a raw record at a positional index.
    ///
    /// Returns `None` when the record has no usable coordinates; such
    /// records are excluded from the live set entirely.
    pub fn from_raw(raw: &RawMarker, index: usize) -> Option<Self> {
        let lat = raw.lat?;
        let lon = raw.lon?;
        if coord::validate(lat, lon).is_err() {
            return None;
        }
        let id = match &raw.id {
            Some(id) => MarkerId::new(id.clone()),
            None => MarkerId::from_index(index),
        };
        let display_name = raw.name.clone().unwrap_or_else(|| id.to_string());
        Some(Self {
            id,
            lat,
            lon,
            variant: raw.variant.unwrap_or(0.0),
            marker_type: MarkerType::from_tag(raw.marker_type.as_deref()),
            icon_index: (index as u32 % ICON_GLYPH_COUNT) as u8,
            color_bucket: (index as u32 / ICON_GLYPH_COUNT).min(u8::MAX as u32) as u8,
            display_name,
        })
    }

    /// Whether this marker sits close enough to ±180 to need a mirror copy.
    pub fn needs_dateline_duplicate(&self) -> bool {
        !self.id.is_dateline() && coord::needs_dateline_mirror(self.lon)
    }

    /// Builds the synthetic date-line duplicate for this marker.
    ///
    /// The duplicate is a regular marker subject to the normal lifecycle; its
    /// longitude is the raw mirrored value (see [`coord::mirror_lon`]).
    pub fn dateline_duplicate(&self) -> Option<Self> {
        if !self.needs_dateline_duplicate() {
            return None;
        }
        let mut dup = self.clone();
        dup.id = self.id.dateline();
        dup.lon = coord::mirror_lon(self.lon);
        Some(dup)
    }

    /// Whether an incoming marker carries changes that require an in-place
    /// update of the existing visual handle.
    pub fn differs_from(&self, other: &Self) -> bool {
        self.lat != other.lat
            || self.lon != other.lon
            || self.display_name != other.display_name
            || self.variant != other.variant
            || self.icon_index != other.icon_index
    }
}
