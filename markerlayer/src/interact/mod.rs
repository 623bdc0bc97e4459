//! User interaction tracking and refresh gating.
//!
//! While the user is panning or zooming, applying a refresh would cause
//! visible churn, so refreshes are deferred (last one wins) and replayed
//! after the interaction settles. Zoom changes are debounced separately so a
//! pinch burst produces a single icon-resize at the end.
//!
//! All timing methods take an explicit `now` so tests control the clock.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use crate::coordinator::{Event, EventKind, EventPayload, GestureKind, Priority};
use crate::icon::{crossed_breakpoint, IconSizeProfile};
use crate::marker::RefreshPayload;

/// Quiet period after the last gesture before interaction counts as over.
pub const DEFAULT_INTERACTION_DEBOUNCE: Duration = Duration::from_millis(300);

/// Quiet period after the last zoom change before icon sizes recalculate.
pub const DEFAULT_ZOOM_DEBOUNCE: Duration = Duration::from_millis(250);

/// Zoom level below which markers render into the cluster group.
pub const DEFAULT_CLUSTER_THRESHOLD: f64 = 5.0;

/// Tunables for interaction handling.
#[derive(Debug, Clone)]
pub struct InteractConfig {
    pub interaction_debounce: Duration,
    pub zoom_debounce: Duration,
    /// Clustering switches on when zoom drops below this level.
    pub cluster_threshold: f64,
}

impl Default for InteractConfig {
    fn default() -> Self {
        Self {
            interaction_debounce: DEFAULT_INTERACTION_DEBOUNCE,
            zoom_debounce: DEFAULT_ZOOM_DEBOUNCE,
            cluster_threshold: DEFAULT_CLUSTER_THRESHOLD,
        }
    }
}

// =============================================================================
// Gate
// =============================================================================

#[derive(Debug, Default)]
struct GateInner {
    interacting: bool,
    map_ready: bool,
    deferred: Option<RefreshPayload>,
}

/// Shared flag set the poller and dispatcher consult before applying
/// refreshes.
///
/// Cheaply cloneable; all clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct InteractionGate {
    inner: Arc<Mutex<GateInner>>,
}

impl InteractionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_interacting(&self, interacting: bool) {
        self.inner.lock().interacting = interacting;
    }

    pub fn is_interacting(&self) -> bool {
        self.inner.lock().interacting
    }

    /// Marks the map surface usable. Refreshes are skipped until then.
    pub fn set_map_ready(&self, ready: bool) {
        self.inner.lock().map_ready = ready;
    }

    pub fn is_map_ready(&self) -> bool {
        self.inner.lock().map_ready
    }

    /// Holds a refresh payload for replay after interaction ends. Only the
    /// most recent deferral is kept.
    pub fn defer(&self, payload: RefreshPayload) {
        let mut inner = self.inner.lock();
        if inner.deferred.is_some() {
            debug!("replacing previously deferred refresh");
        }
        inner.deferred = Some(payload);
    }

    /// Takes the deferred payload, leaving the gate empty.
    pub fn take_deferred(&self) -> Option<RefreshPayload> {
        self.inner.lock().deferred.take()
    }

    pub fn has_deferred(&self) -> bool {
        self.inner.lock().deferred.is_some()
    }
}

// =============================================================================
// Tracker
// =============================================================================

/// Work produced when an interaction settles.
#[derive(Debug, Clone, PartialEq)]
pub enum DerivedEvent {
    /// Zoom settled on a new icon size profile.
    IconResize(IconSizeProfile),
    /// Zoom crossed the clustering threshold.
    ClusterToggle(bool),
    /// A refresh deferred during the interaction, replayed now.
    ReplayRefresh(RefreshPayload),
}

impl DerivedEvent {
    /// Converts into a coordinator event. Visual adjustments run at high
    /// priority; the replayed refresh is ordinary background work.
    pub fn into_event(self) -> Event {
        match self {
            Self::IconResize(profile) => Event::new(
                EventKind::IconResize,
                EventPayload::Profile(profile),
                Priority::High,
            ),
            Self::ClusterToggle(clustered) => Event::new(
                EventKind::ClusterToggle,
                EventPayload::Clustered(clustered),
                Priority::High,
            ),
            Self::ReplayRefresh(payload) => Event::new(
                EventKind::RefreshMarkers,
                EventPayload::Refresh(payload),
                Priority::Normal,
            ),
        }
    }
}

/// Debounces gestures and zoom changes and derives follow-up work.
#[derive(Debug)]
pub struct InteractionTracker {
    config: InteractConfig,
    gate: InteractionGate,
    last_gesture: Option<Instant>,
    last_zoom_change: Option<Instant>,
    zoom: f64,
    /// Zoom value observed during the current debounce window, applied on
    /// settle.
    pending_zoom: Option<f64>,
    applied_profile: IconSizeProfile,
    clustered: bool,
}

impl InteractionTracker {
    pub fn new(config: InteractConfig, gate: InteractionGate, initial_zoom: f64) -> Self {
        let clustered = initial_zoom < config.cluster_threshold;
        Self {
            config,
            gate,
            last_gesture: None,
            last_zoom_change: None,
            zoom: initial_zoom,
            pending_zoom: None,
            applied_profile: IconSizeProfile::for_zoom(initial_zoom),
            clustered,
        }
    }

    /// Records a gesture at `now`. Hover does not count as interaction.
    pub fn gesture(&mut self, kind: GestureKind, now: Instant) {
        if kind == GestureKind::Hover {
            return;
        }
        self.last_gesture = Some(now);
        self.gate.set_interacting(true);
    }

    /// Records a zoom change at `now`. The new level is held until the zoom
    /// debounce window closes.
    pub fn zoom_changed(&mut self, zoom: f64, now: Instant) {
        self.last_gesture = Some(now);
        self.last_zoom_change = Some(now);
        self.pending_zoom = Some(zoom);
        self.gate.set_interacting(true);
    }

    /// Whether any debounce window is still open at `now`.
    pub fn is_interacting(&self, now: Instant) -> bool {
        let gesture_open = self
            .last_gesture
            .is_some_and(|at| now.duration_since(at) < self.config.interaction_debounce);
        let zoom_open = self
            .last_zoom_change
            .is_some_and(|at| now.duration_since(at) < self.config.zoom_debounce);
        gesture_open || zoom_open
    }

    /// Current (settled) zoom level.
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn clustered(&self) -> bool {
        self.clustered
    }

    /// Checks the debounce windows at `now` and, once both are closed,
    /// derives the follow-up work: icon resize, cluster toggle, and the
    /// deferred refresh replay, in that order.
    ///
    /// Returns empty while interaction is still in progress.
    pub fn settle(&mut self, now: Instant) -> Vec<DerivedEvent> {
        if self.last_gesture.is_none() && self.pending_zoom.is_none() {
            return Vec::new();
        }
        if self.is_interacting(now) {
            return Vec::new();
        }

        self.last_gesture = None;
        self.last_zoom_change = None;
        self.gate.set_interacting(false);

        let mut derived = Vec::new();

        if let Some(zoom) = self.pending_zoom.take() {
            let previous = self.zoom;
            self.zoom = zoom;

            let profile = IconSizeProfile::for_zoom(zoom);
            if profile != self.applied_profile || crossed_breakpoint(previous, zoom) {
                self.applied_profile = profile;
                derived.push(DerivedEvent::IconResize(profile));
            }

            let should_cluster = zoom < self.config.cluster_threshold;
            if should_cluster != self.clustered {
                self.clustered = should_cluster;
                derived.push(DerivedEvent::ClusterToggle(should_cluster));
            }
        }

        if let Some(payload) = self.gate.take_deferred() {
            debug!("replaying deferred refresh after interaction settled");
            derived.push(DerivedEvent::ReplayRefresh(payload));
        }

        derived
    }
}
