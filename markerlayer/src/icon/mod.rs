//! Marker icon derivation: sizes, colors, and the rendered-icon cache.

mod cache;
mod color;
mod size;

pub use cache::{IconCache, IconCacheStats, IconKey, InvalidationReason, DEFAULT_ICON_CACHE_CAPACITY};
pub use color::{Color, MetricRegime, DEFAULT_STATE_PALETTE};
pub use size::{
    crossed_breakpoint, zoom_tier, IconMetrics, IconSizeProfile, ZOOM_TIER_BREAKPOINTS,
};
