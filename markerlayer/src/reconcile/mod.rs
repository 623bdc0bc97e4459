//! Marker reconciliation.
//!
//! The engine owns the authoritative live marker set and brings it in line
//! with incoming data by computing minimal add/update/remove diffs. State
//! that the data did not change (open popups, render handles, unaffected
//! markers) is preserved across refreshes.

mod engine;

pub use engine::{LiveMarker, ReconcileConfig, ReconcileEngine, RefreshOutcome};

use crate::icon::MetricRegime;
use crate::surface::RenderTarget;

/// Errors from engine-level operations.
///
/// Per-marker failures never surface here; they are logged and skipped
/// (best-effort batch semantics). Only failures that leave the live set in
/// an unusable state, like a failed wholesale clear, escalate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("surface error: {0}")]
    Surface(#[from] crate::surface::SurfaceError),
}

/// The combination of color-driving metric and clustering modifier that
/// governs marker rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayMode {
    /// Which value regime drives marker color.
    pub metric: MetricRegime,
    /// Whether markers render into the cluster group.
    pub clustered: bool,
}

impl DisplayMode {
    /// Discrete-state mode with the default palette, unclustered.
    pub fn discrete() -> Self {
        Self {
            metric: MetricRegime::discrete(),
            clustered: false,
        }
    }

    /// Continuous mode scaled against `max`, unclustered.
    pub fn continuous(max: f64) -> Self {
        Self {
            metric: MetricRegime::continuous(max),
            clustered: false,
        }
    }

    /// Same metric with the clustering modifier set.
    pub fn with_clustering(mut self, clustered: bool) -> Self {
        self.clustered = clustered;
        self
    }

    /// Render target implied by the clustering modifier.
    pub fn render_target(&self) -> RenderTarget {
        if self.clustered {
            RenderTarget::Clustered
        } else {
            RenderTarget::Individual
        }
    }

    /// Fingerprint for icon cache keys; any change in it invalidates all
    /// memoized icons.
    pub fn cache_tag(&self) -> String {
        let mut tag = self.metric.cache_tag();
        if self.clustered {
            tag.push_str("+cl");
        }
        tag
    }
}

impl Default for DisplayMode {
    fn default() -> Self {
        Self::discrete()
    }
}
