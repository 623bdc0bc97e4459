//! Marker color derivation.
//!
//! Markers render in one of two metric regimes:
//!
//! - **Discrete**: a small integer state indexes a fixed color table
//!   (default 10-entry palette).
//! - **Continuous**: a numeric value is scaled against a configured maximum
//!   and mapped to a red→yellow→green hue ramp; the `reverse` variant
//!   inverts the interpolation.

/// An RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// CSS hex form, e.g. `#ff8800`.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Default 10-entry state palette for the discrete regime.
pub const DEFAULT_STATE_PALETTE: [Color; 10] = [
    Color::new(0x2e, 0xcc, 0x71), // ok / green
    Color::new(0xf1, 0xc4, 0x0f), // warning / yellow
    Color::new(0xe7, 0x4c, 0x3c), // error / red
    Color::new(0x34, 0x98, 0xdb), // info / blue
    Color::new(0x9b, 0x59, 0xb6), // purple
    Color::new(0xe6, 0x7e, 0x22), // orange
    Color::new(0x1a, 0xbc, 0x9c), // teal
    Color::new(0x95, 0xa5, 0xa6), // gray
    Color::new(0x34, 0x49, 0x5e), // slate
    Color::new(0xd3, 0x54, 0x00), // rust
];

/// Which value regime drives marker color.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricRegime {
    /// Integer state indexing a color table.
    Discrete { palette: Vec<Color> },
    /// Numeric value scaled against `max`, hue-interpolated red→green.
    Continuous { max: f64, reverse: bool },
}

impl MetricRegime {
    /// Discrete regime with the default palette.
    pub fn discrete() -> Self {
        Self::Discrete {
            palette: DEFAULT_STATE_PALETTE.to_vec(),
        }
    }

    /// Continuous regime scaled against `max`.
    pub fn continuous(max: f64) -> Self {
        Self::Continuous {
            max,
            reverse: false,
        }
    }

    /// Continuous regime with inverted interpolation.
    pub fn continuous_reversed(max: f64) -> Self {
        Self::Continuous { max, reverse: true }
    }

    /// Color for a marker's variant value under this regime.
    pub fn color_for(&self, variant: f64) -> Color {
        match self {
            Self::Discrete { palette } => {
                if palette.is_empty() {
                    return Color::new(0x95, 0xa5, 0xa6);
                }
                let state = variant.max(0.0) as usize;
                palette[state % palette.len()]
            }
            Self::Continuous { max, reverse } => {
                let max = if *max > 0.0 { *max } else { 1.0 };
                let mut ratio = (variant / max).clamp(0.0, 1.0);
                if *reverse {
                    ratio = 1.0 - ratio;
                }
                // 0 => red (hue 0), 1 => green (hue 120)
                hue_to_rgb(ratio * 120.0)
            }
        }
    }

    /// Short tag distinguishing regimes in cache keys.
    pub fn cache_tag(&self) -> String {
        match self {
            Self::Discrete { palette } => format!("d{}", palette.len()),
            Self::Continuous { max, reverse } => {
                format!("c{}{}", max, if *reverse { "r" } else { "" })
            }
        }
    }
}

/// Converts a hue in degrees (0..=120, full saturation, mid lightness)
/// to RGB.
fn hue_to_rgb(hue: f64) -> Color {
    let h = hue.clamp(0.0, 360.0) / 60.0;
    let x = 1.0 - (h % 2.0 - 1.0).abs();
    let (r, g, b) = match h as u32 {
        0 => (1.0, x, 0.0),
        1 => (x, 1.0, 0.0),
        2 => (0.0, 1.0, x),
        3 => (0.0, x, 1.0),
        4 => (x, 0.0, 1.0),
        _ => (1.0, 0.0, x),
    };
    // Scale to mid lightness comparable to the discrete palette
    let scale = |v: f64| (v * 229.0).round() as u8;
    Color::new(scale(r), scale(g), scale(b))
}
