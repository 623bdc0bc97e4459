//! Rendering surface interface.
//!
//! The actual rendering surface (tile layers, vector drawing, DOM/SVG
//! composition) lives outside this crate. The reconciliation engine talks to
//! it through [`MarkerSurface`], a narrow trait covering marker lifecycle,
//! icon construction, popup/tooltip control, and render-target placement.
//!
//! The trait is synchronous: individual surface calls are expected to be
//! cheap. Batching and yielding across large marker sets is the engine's
//! responsibility.

use crate::icon::{Color, IconMetrics};
use crate::marker::MarkerId;

/// Opaque handle to a live marker on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(pub u64);

/// Opaque handle to a rendered icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IconHandle(pub u64);

/// Which rendering target a marker belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderTarget {
    /// Individual marker layer.
    #[default]
    Individual,
    /// Cluster group layer.
    Clustered,
}

/// Everything the surface needs to render one icon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IconSpec {
    /// Discrete glyph selector (0..16).
    pub glyph_index: u8,
    pub color: Color,
    pub metrics: IconMetrics,
    /// Whether to use the satellite glyph set.
    pub satellite: bool,
}

/// Errors reported by the rendering surface.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SurfaceError {
    #[error("icon construction failed: {0}")]
    Icon(String),

    #[error("unknown marker handle {0:?}")]
    UnknownHandle(HandleId),

    #[error("marker operation failed: {0}")]
    Marker(String),
}

/// Narrow interface to the external rendering surface.
pub trait MarkerSurface: Send {
    /// Renders an icon from a spec, returning a reusable handle.
    fn make_icon(&mut self, spec: &IconSpec) -> Result<IconHandle, SurfaceError>;

    /// Creates a marker and returns its handle.
    #[allow(clippy::too_many_arguments)]
    fn create_marker(
        &mut self,
        id: &MarkerId,
        lat: f64,
        lon: f64,
        icon: IconHandle,
        popup: &str,
        tooltip: &str,
        target: RenderTarget,
    ) -> Result<HandleId, SurfaceError>;

    /// Moves an existing marker.
    fn set_position(&mut self, handle: HandleId, lat: f64, lon: f64) -> Result<(), SurfaceError>;

    /// Swaps an existing marker's icon.
    fn set_icon(&mut self, handle: HandleId, icon: IconHandle) -> Result<(), SurfaceError>;

    /// Replaces popup content. An open popup stays open and shows the new
    /// content.
    fn set_popup_content(&mut self, handle: HandleId, content: &str) -> Result<(), SurfaceError>;

    /// Whether the marker's popup is currently open.
    fn is_popup_open(&self, handle: HandleId) -> bool;

    /// Toggles permanent tooltip display for one marker.
    fn set_tooltip_visible(&mut self, handle: HandleId, visible: bool)
        -> Result<(), SurfaceError>;

    /// Moves a marker between the individual and clustered targets without
    /// recreating it.
    fn set_render_target(
        &mut self,
        handle: HandleId,
        target: RenderTarget,
    ) -> Result<(), SurfaceError>;

    /// Removes one marker.
    fn remove_marker(&mut self, handle: HandleId) -> Result<(), SurfaceError>;

    /// Removes every marker.
    fn clear(&mut self) -> Result<(), SurfaceError>;
}
