//! Zoom-dependent icon sizing.
//!
//! Icon sizes come from five discrete zoom tiers: the further out the view,
//! the larger the icon. Sizes are monotonically non-increasing as zoom
//! increases so markers never grow while zooming in.

/// Zoom breakpoints separating the five icon tiers.
///
/// Crossing any of these forces an icon-size recalculation even when the
/// resulting tier happens to be unchanged.
pub const ZOOM_TIER_BREAKPOINTS: [f64; 4] = [3.0, 5.0, 7.0, 9.0];

/// Pixel metrics for one icon variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconMetrics {
    /// Icon size in pixels (width, height).
    pub size: (u32, u32),
    /// Hot-spot inside the icon, in pixel coordinates.
    pub anchor: (u32, u32),
    /// Popup attachment point relative to the anchor.
    pub popup_anchor: (i32, i32),
}

impl IconMetrics {
    /// Builds square metrics with a bottom-center anchor.
    pub fn square(edge: u32) -> Self {
        Self {
            size: (edge, edge),
            anchor: (edge / 2, edge),
            popup_anchor: (0, -(edge as i32)),
        }
    }
}

/// Size profile for the two marker categories at the current zoom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconSizeProfile {
    /// Metrics for standard markers.
    pub icon: IconMetrics,
    /// Metrics for satellite markers (rendered slightly larger).
    pub satellite: IconMetrics,
}

impl IconSizeProfile {
    /// Profile for a zoom level.
    pub fn for_zoom(zoom: f64) -> Self {
        let edge = match zoom_tier(zoom) {
            0 => 40,
            1 => 34,
            2 => 28,
            3 => 22,
            _ => 18,
        };
        Self {
            icon: IconMetrics::square(edge),
            satellite: IconMetrics::square(edge + 6),
        }
    }
}

impl Default for IconSizeProfile {
    fn default() -> Self {
        // Mid-range zoom, matching a freshly fitted view
        Self::for_zoom(6.0)
    }
}

/// Discrete tier index (0..=4) for a zoom level; lower zoom, lower tier.
pub fn zoom_tier(zoom: f64) -> u8 {
    ZOOM_TIER_BREAKPOINTS
        .iter()
        .take_while(|&&b| zoom >= b)
        .count() as u8
}

/// Whether a zoom change crossed any forced-recalculation breakpoint.
pub fn crossed_breakpoint(from: f64, to: f64) -> bool {
    ZOOM_TIER_BREAKPOINTS
        .iter()
        .any(|&b| (from < b) != (to < b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_five_tiers() {
        assert_eq!(zoom_tier(1.0), 0);
        assert_eq!(zoom_tier(3.0), 1);
        assert_eq!(zoom_tier(5.0), 2);
        assert_eq!(zoom_tier(7.0), 3);
        assert_eq!(zoom_tier(9.0), 4);
        assert_eq!(zoom_tier(15.0), 4);
    }

    #[test]
    fn test_sizes_shrink_as_zoom_increases() {
        assert_eq!(IconSizeProfile::for_zoom(1.0).icon.size, (40, 40));
        assert_eq!(IconSizeProfile::for_zoom(10.0).icon.size, (18, 18));
    }

    #[test]
    fn test_satellite_larger_than_standard() {
        let profile = IconSizeProfile::for_zoom(6.0);
        assert!(profile.satellite.size.0 > profile.icon.size.0);
    }

    #[test]
    fn test_anchor_bottom_center() {
        let metrics = IconMetrics::square(40);
        assert_eq!(metrics.anchor, (20, 40));
        assert_eq!(metrics.popup_anchor, (0, -40));
    }

    #[test]
    fn test_crossed_breakpoint() {
        assert!(crossed_breakpoint(4.9, 5.1));
        assert!(crossed_breakpoint(5.1, 4.9));
        assert!(!crossed_breakpoint(5.1, 5.9));
        // A large jump crosses multiple breakpoints
        assert!(crossed_breakpoint(2.0, 10.0));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_size_monotonic_non_increasing(a in 0.0..18.0_f64, b in 0.0..18.0_f64) {
                let (low, high) = if a <= b { (a, b) } else { (b, a) };
                let closer = IconSizeProfile::for_zoom(high);
                let farther = IconSizeProfile::for_zoom(low);
                prop_assert!(closer.icon.size.0 <= farther.icon.size.0);
                prop_assert!(closer.satellite.size.0 <= farther.satellite.size.0);
            }

            #[test]
            fn test_tier_in_range(zoom in -5.0..30.0_f64) {
                prop_assert!(zoom_tier(zoom) <= 4);
            }
        }
    }
}
