//! The marker reconciliation engine.
//!
//! Owns the [`LiveMarkerSet`](ReconcileEngine) and applies incoming data
//! through two paths:
//!
//! - [`ReconcileEngine::process_all`] — full rebuild: clear everything and
//!   recreate every marker. Used for first load, metric switches, and
//!   payloads that differ too much from the current set.
//! - [`ReconcileEngine::refresh`] — incremental diff: index the current set,
//!   update changed markers in place (preserving open popups and render
//!   handles), create what is new, remove what disappeared.
//!
//! All batch operations are best-effort: a failure on one marker is logged
//! and skipped, and the batch continues.

use std::collections::{HashMap, HashSet};

use tokio::task::yield_now;
use tracing::{debug, info, warn};

use crate::coord;
use crate::coordinator::ProgressHandle;
use crate::icon::{
    IconCache, IconCacheStats, IconKey, IconSizeProfile, InvalidationReason, MetricRegime,
};
use crate::marker::{Marker, MarkerId, MarkerType, RawMarker, RefreshPayload};
use crate::surface::{HandleId, IconHandle, IconSpec, MarkerSurface, RenderTarget, SurfaceError};

use super::{DisplayMode, EngineError};

// =============================================================================
// Configuration
// =============================================================================

/// Default size difference beyond which `refresh` falls back to a full
/// rebuild. Preserved from the source as a tunable; no derivation is known.
pub const DEFAULT_REBUILD_THRESHOLD: usize = 10;

/// Default number of markers processed between progress updates and
/// cooperative yields.
pub const DEFAULT_PROGRESS_STRIDE: usize = 50;

/// Tunables for the reconciliation engine.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Size delta beyond which incremental diffing is not worth it.
    pub rebuild_threshold: usize,

    /// Batch stride for progress reporting and cooperative yielding.
    pub progress_stride: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            rebuild_threshold: DEFAULT_REBUILD_THRESHOLD,
            progress_stride: DEFAULT_PROGRESS_STRIDE,
        }
    }
}

impl ReconcileConfig {
    /// Sets the full-rebuild threshold.
    pub fn with_rebuild_threshold(mut self, threshold: usize) -> Self {
        self.rebuild_threshold = threshold;
        self
    }

    /// Sets the progress stride.
    pub fn with_progress_stride(mut self, stride: usize) -> Self {
        self.progress_stride = stride.max(1);
        self
    }
}

// =============================================================================
// Live set entries and outcomes
// =============================================================================

/// A marker currently present on the surface.
#[derive(Debug, Clone)]
pub struct LiveMarker {
    /// Last-applied marker data.
    pub data: Marker,
    /// Surface handle for in-place updates.
    pub handle: HandleId,
    /// Which rendering target currently holds the marker.
    pub target: RenderTarget,
}

/// Aggregate result of a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshOutcome {
    /// Markers newly created (date-line duplicates included).
    pub added: usize,
    /// Markers updated in place.
    pub updated: usize,
    /// Markers removed from the live set.
    pub removed: usize,
    /// Per-marker failures that were skipped.
    pub failed: usize,
    /// Whether the full-rebuild path ran instead of the diff.
    pub rebuilt: bool,
}

impl RefreshOutcome {
    /// Outcome of a payload with no list: nothing to do.
    pub fn noop() -> Self {
        Self::default()
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Owns the live marker set and reconciles it against incoming data.
///
/// The set is mutated only through the operations below, always from a
/// single active-event context; the engine itself needs no locking.
pub struct ReconcileEngine<S: MarkerSurface> {
    surface: S,
    live: HashMap<MarkerId, LiveMarker>,
    mode: DisplayMode,
    profile: IconSizeProfile,
    icon_cache: IconCache,
    tooltips_enabled: bool,
    config: ReconcileConfig,
}

impl<S: MarkerSurface> ReconcileEngine<S> {
    /// Creates an engine with default configuration.
    pub fn new(surface: S) -> Self {
        Self::with_config(surface, ReconcileConfig::default())
    }

    /// Creates an engine with explicit configuration.
    pub fn with_config(surface: S, config: ReconcileConfig) -> Self {
        Self {
            surface,
            live: HashMap::new(),
            mode: DisplayMode::default(),
            profile: IconSizeProfile::default(),
            icon_cache: IconCache::default(),
            tooltips_enabled: false,
            config,
        }
    }

    // -------------------------------------------------------------------------
    // Full rebuild
    // -------------------------------------------------------------------------

    /// Clears the live set and recreates every marker from `list`.
    ///
    /// Records without valid coordinates are discarded; markers beyond the
    /// date-line threshold gain a mirrored duplicate. Per-marker creation
    /// failures are skipped.
    pub async fn process_all(
        &mut self,
        list: &[RawMarker],
        progress: &ProgressHandle,
    ) -> Result<RefreshOutcome, EngineError> {
        let markers = expand_valid(list);
        debug!(
            incoming = list.len(),
            valid = markers.len(),
            "full marker rebuild"
        );

        self.surface.clear()?;
        self.live.clear();

        let mut outcome = RefreshOutcome {
            rebuilt: true,
            ..RefreshOutcome::default()
        };
        let total = markers.len().max(1);
        for (index, marker) in markers.into_iter().enumerate() {
            if index > 0 && index % self.config.progress_stride == 0 {
                progress.set((index * 100 / total) as u8);
                yield_now().await;
            }
            match self.create_one(marker) {
                Ok(()) => outcome.added += 1,
                Err(error) => {
                    warn!(%error, "marker creation failed, skipping");
                    outcome.failed += 1;
                }
            }
        }
        progress.set(100);
        Ok(outcome)
    }

    // -------------------------------------------------------------------------
    // Incremental refresh
    // -------------------------------------------------------------------------

    /// Applies a refresh payload, diffing where possible.
    ///
    /// Falls back to [`process_all`](Self::process_all) when the payload
    /// signals a structural change or when the size delta exceeds the
    /// rebuild threshold. An absent list is a no-op.
    pub async fn refresh(
        &mut self,
        payload: &RefreshPayload,
        progress: &ProgressHandle,
    ) -> Result<RefreshOutcome, EngineError> {
        let Some(list) = payload.list.as_deref() else {
            debug!("refresh payload without list, nothing to do");
            return Ok(RefreshOutcome::noop());
        };

        let delta = self.primary_len().abs_diff(list.len());
        if payload.forces_rebuild() || delta > self.config.rebuild_threshold {
            debug!(delta, "refresh falling back to full rebuild");
            return self.process_all(list, progress).await;
        }

        let mut outcome = RefreshOutcome::default();
        let mut to_remove: HashSet<MarkerId> = self.live.keys().cloned().collect();
        let mut staged: Vec<Marker> = Vec::new();

        let total = list.len().max(1);
        for (index, raw) in list.iter().enumerate() {
            if index > 0 && index % self.config.progress_stride == 0 {
                progress.set((index * 100 / total) as u8);
                yield_now().await;
            }
            let Some(incoming) = Marker::from_raw(raw, index) else {
                continue;
            };
            to_remove.remove(&incoming.id);
            let duplicate = incoming.dateline_duplicate();
            if let Some(dup) = &duplicate {
                to_remove.remove(&dup.id);
            }

            let existing_differs = self
                .live
                .get(&incoming.id)
                .map(|live| live.data.differs_from(&incoming));
            match existing_differs {
                Some(true) => {
                    match self.update_one(incoming) {
                        Ok(()) => outcome.updated += 1,
                        Err(error) => {
                            warn!(%error, "marker update failed, skipping");
                            outcome.failed += 1;
                        }
                    }
                    if let Some(dup) = duplicate {
                        if self.live.contains_key(&dup.id) {
                            match self.update_one(dup) {
                                Ok(()) => outcome.updated += 1,
                                Err(error) => {
                                    warn!(%error, "duplicate update failed, skipping");
                                    outcome.failed += 1;
                                }
                            }
                        } else {
                            staged.push(dup);
                        }
                    }
                }
                Some(false) => {
                    // Unchanged; a duplicate that newly became necessary is
                    // still staged (the marker crossed the date-line
                    // threshold without its tracked fields changing)
                    if let Some(dup) = duplicate {
                        if !self.live.contains_key(&dup.id) {
                            staged.push(dup);
                        }
                    }
                }
                None => {
                    staged.push(incoming);
                    if let Some(dup) = duplicate {
                        staged.push(dup);
                    }
                }
            }
        }

        for id in to_remove {
            if let Some(live) = self.live.remove(&id) {
                outcome.removed += 1;
                if let Err(error) = self.surface.remove_marker(live.handle) {
                    warn!(%error, marker = %id, "marker removal failed");
                }
            }
        }

        for (index, marker) in staged.into_iter().enumerate() {
            if index > 0 && index % self.config.progress_stride == 0 {
                yield_now().await;
            }
            match self.create_one(marker) {
                Ok(()) => outcome.added += 1,
                Err(error) => {
                    warn!(%error, "marker creation failed, skipping");
                    outcome.failed += 1;
                }
            }
        }

        progress.set(100);
        info!(
            added = outcome.added,
            updated = outcome.updated,
            removed = outcome.removed,
            failed = outcome.failed,
            "incremental refresh applied"
        );
        Ok(outcome)
    }

    // -------------------------------------------------------------------------
    // Display mode, profile, tooltips
    // -------------------------------------------------------------------------

    /// Switches the active metric and clustering modifier.
    ///
    /// Invalidates the icon cache; if the clustering modifier toggled, every
    /// live marker moves between rendering targets without losing identity.
    pub async fn set_display_mode(&mut self, mode: DisplayMode) {
        let cluster_toggled = mode.clustered != self.mode.clustered;
        info!(clustered = mode.clustered, "display mode change");
        self.mode = mode;
        self.icon_cache.invalidate(InvalidationReason::ModeChanged);
        self.restyle_all(cluster_toggled, true).await;
    }

    /// Toggles only the clustering modifier, keeping the current metric.
    pub async fn set_clustering(&mut self, clustered: bool) {
        if clustered == self.mode.clustered {
            return;
        }
        let mode = DisplayMode {
            metric: self.mode.metric.clone(),
            clustered,
        };
        self.set_display_mode(mode).await;
    }

    /// Re-renders every marker's icon for a new size profile.
    ///
    /// Positions and popups are untouched.
    pub async fn set_icon_profile(&mut self, profile: IconSizeProfile) {
        self.profile = profile;
        self.icon_cache.invalidate(InvalidationReason::ProfileChanged);
        self.restyle_all(false, false).await;
    }

    /// Toggles permanent tooltips across all live markers.
    pub fn set_tooltip_visibility(&mut self, enabled: bool) {
        self.tooltips_enabled = enabled;
        let handles: Vec<HandleId> = self.live.values().map(|live| live.handle).collect();
        for handle in handles {
            if let Err(error) = self.surface.set_tooltip_visible(handle, enabled) {
                warn!(%error, "tooltip toggle failed, skipping");
            }
        }
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Removes one marker and its date-line duplicate, if present.
    ///
    /// Returns whether the primary marker existed.
    pub fn remove(&mut self, id: &MarkerId) -> bool {
        let mut found = false;
        for target in [id.clone(), id.dateline()] {
            if let Some(live) = self.live.remove(&target) {
                if target == *id {
                    found = true;
                }
                if let Err(error) = self.surface.remove_marker(live.handle) {
                    warn!(%error, marker = %target, "marker removal failed");
                }
            }
        }
        found
    }

    /// Drops every marker and the identity index.
    pub fn clear(&mut self) {
        if let Err(error) = self.surface.clear() {
            warn!(%error, "surface clear failed");
        }
        self.live.clear();
        self.icon_cache.invalidate(InvalidationReason::Cleared);
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Number of live markers, date-line duplicates included.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Number of live markers excluding date-line duplicates. This is the
    /// count compared against incoming list sizes.
    pub fn primary_len(&self) -> usize {
        self.live.keys().filter(|id| !id.is_dateline()).count()
    }

    pub fn contains(&self, id: &MarkerId) -> bool {
        self.live.contains_key(id)
    }

    pub fn get(&self, id: &MarkerId) -> Option<&LiveMarker> {
        self.live.get(id)
    }

    pub fn mode(&self) -> &DisplayMode {
        &self.mode
    }

    pub fn profile(&self) -> &IconSizeProfile {
        &self.profile
    }

    pub fn tooltips_enabled(&self) -> bool {
        self.tooltips_enabled
    }

    pub fn icon_cache_stats(&self) -> IconCacheStats {
        self.icon_cache.stats()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn create_one(&mut self, marker: Marker) -> Result<(), SurfaceError> {
        let target = self.mode.render_target();
        let icon = Self::icon_for(
            &mut self.surface,
            &self.icon_cache,
            &self.mode,
            &self.profile,
            &marker,
        )?;
        let popup = popup_content(&marker, &self.mode);
        let handle = self.surface.create_marker(
            &marker.id,
            marker.lat,
            marker.lon,
            icon,
            &popup,
            &marker.display_name,
            target,
        )?;
        if self.tooltips_enabled {
            self.surface.set_tooltip_visible(handle, true)?;
        }
        self.live.insert(
            marker.id.clone(),
            LiveMarker {
                data: marker,
                handle,
                target,
            },
        );
        Ok(())
    }

    /// Mutates the existing visual handle in place; never recreates the
    /// marker, so open interactive state survives.
    fn update_one(&mut self, incoming: Marker) -> Result<(), SurfaceError> {
        let Some(live) = self.live.get(&incoming.id) else {
            return Ok(());
        };
        let handle = live.handle;
        let moved = live.data.lat != incoming.lat || live.data.lon != incoming.lon;

        if moved {
            self.surface
                .set_position(handle, incoming.lat, incoming.lon)?;
        }
        let icon = Self::icon_for(
            &mut self.surface,
            &self.icon_cache,
            &self.mode,
            &self.profile,
            &incoming,
        )?;
        self.surface.set_icon(handle, icon)?;
        let popup = popup_content(&incoming, &self.mode);
        self.surface.set_popup_content(handle, &popup)?;

        if let Some(live) = self.live.get_mut(&incoming.id) {
            live.data = incoming;
        }
        Ok(())
    }

    /// Re-applies icon (and optionally target/popup) to every live marker.
    async fn restyle_all(&mut self, move_target: bool, refresh_popups: bool) {
        let ids: Vec<MarkerId> = self.live.keys().cloned().collect();
        let target = self.mode.render_target();
        for (index, id) in ids.iter().enumerate() {
            if index > 0 && index % self.config.progress_stride == 0 {
                yield_now().await;
            }
            let Some(live) = self.live.get(id) else {
                continue;
            };
            let handle = live.handle;
            let data = live.data.clone();

            let result = (|| -> Result<(), SurfaceError> {
                if move_target {
                    self.surface.set_render_target(handle, target)?;
                }
                let icon = Self::icon_for(
                    &mut self.surface,
                    &self.icon_cache,
                    &self.mode,
                    &self.profile,
                    &data,
                )?;
                self.surface.set_icon(handle, icon)?;
                if refresh_popups {
                    self.surface
                        .set_popup_content(handle, &popup_content(&data, &self.mode))?;
                }
                Ok(())
            })();

            match result {
                Ok(()) => {
                    if move_target {
                        if let Some(live) = self.live.get_mut(id) {
                            live.target = target;
                        }
                    }
                }
                Err(error) => warn!(%error, marker = %id, "restyle failed, skipping"),
            }
        }
    }

    fn icon_for(
        surface: &mut S,
        cache: &IconCache,
        mode: &DisplayMode,
        profile: &IconSizeProfile,
        marker: &Marker,
    ) -> Result<IconHandle, SurfaceError> {
        let satellite = marker.marker_type == MarkerType::Satellite;
        let metrics = if satellite {
            profile.satellite
        } else {
            profile.icon
        };
        let color = mode.metric.color_for(marker.variant);
        let key = IconKey {
            marker_id: marker.id.clone(),
            glyph_index: marker.icon_index,
            color,
            mode_tag: mode.cache_tag(),
            size: metrics.size,
        };
        cache.get_or_insert_with(key, || {
            surface.make_icon(&IconSpec {
                glyph_index: marker.icon_index,
                color,
                metrics,
                satellite,
            })
        })
    }
}

impl<S: MarkerSurface> std::fmt::Debug for ReconcileEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconcileEngine")
            .field("live", &self.live.len())
            .field("mode", &self.mode)
            .field("tooltips_enabled", &self.tooltips_enabled)
            .finish_non_exhaustive()
    }
}

/// Validates raw records and expands date-line duplicates.
fn expand_valid(list: &[RawMarker]) -> Vec<Marker> {
    let mut markers = Vec::with_capacity(list.len());
    for (index, raw) in list.iter().enumerate() {
        let Some(marker) = Marker::from_raw(raw, index) else {
            continue;
        };
        let duplicate = marker.dateline_duplicate();
        markers.push(marker);
        if let Some(dup) = duplicate {
            markers.push(dup);
        }
    }
    markers
}

/// Popup body for a marker under the current mode.
///
/// Raw (possibly mirrored) longitudes are normalized here; this is the
/// render-facing string.
fn popup_content(marker: &Marker, mode: &DisplayMode) -> String {
    let value = match &mode.metric {
        MetricRegime::Discrete { .. } => format!("state {}", marker.variant as i64),
        MetricRegime::Continuous { max, .. } => format!("{:.1} / {:.0}", marker.variant, max),
    };
    format!(
        "<b>{}</b><br/>{}<br/>{:.4}, {:.4}",
        marker.display_name,
        value,
        marker.lat,
        coord::normalize_lon(marker.lon)
    )
}

// =============================================================================
// Tests
// =============================================================================
