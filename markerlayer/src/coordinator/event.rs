//! Event and priority types for the coordinator.
//!
//! Event kinds form a closed union so dispatch coverage is checked at
//! compile time; there are no string-keyed action tables. Payloads are a
//! typed union as well, one variant per family of downstream operation.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::icon::IconSizeProfile;
use crate::marker::RefreshPayload;
use crate::reconcile::DisplayMode;

/// Global sequence counter for submission-order diagnostics.
static SEQUENCE_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_sequence() -> u64 {
    SEQUENCE_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Scheduling priority.
///
/// `Critical` always preempts; `High` preempts only an interruptible active
/// event; `Normal` never preempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Priority {
    #[default]
    Normal,
    High,
    Critical,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Normal => write!(f, "normal"),
            Priority::High => write!(f, "high"),
            Priority::Critical => write!(f, "critical"),
        }
    }
}

/// The closed set of event kinds the coordinator schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// First load of the marker set; non-interruptible.
    Initialize,
    /// Apply a refresh payload to the live set.
    RefreshMarkers,
    /// Switch the color-driving metric and/or clustering modifier.
    DisplayModeChange,
    /// Re-render icons for a new size profile.
    IconResize,
    /// Toggle the clustering modifier only.
    ClusterToggle,
    /// Toggle permanent tooltips.
    TooltipToggle,
    /// Raw user gesture (pan/zoom/hover/click).
    UserGesture,
    /// Ask the poller for an immediate out-of-cadence update.
    ForceRefresh,
}

impl EventKind {
    /// Kinds that originate directly from a user action. These may preempt
    /// interruptible work even when submitted at normal priority.
    pub fn is_user_originated(self) -> bool {
        matches!(self, Self::UserGesture | Self::DisplayModeChange)
    }

    /// Kinds that may never be interrupted (except by a critical
    /// submission, which always wins).
    pub fn is_non_interruptible(self) -> bool {
        matches!(self, Self::Initialize)
    }

    /// Kinds belonging to the periodic-refresh domain. A critical
    /// preemption of one of these also cancels the pending poll timer.
    pub fn is_refresh_domain(self) -> bool {
        matches!(self, Self::RefreshMarkers | Self::ForceRefresh)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Gesture families reported by the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    Pan,
    Zoom,
    Hover,
    Click,
}

/// Typed event payloads, one variant per downstream operation family.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum EventPayload {
    #[default]
    None,
    Refresh(RefreshPayload),
    Mode(DisplayMode),
    Profile(IconSizeProfile),
    Clustered(bool),
    TooltipsEnabled(bool),
    Gesture { kind: GestureKind, zoom: Option<f64> },
}

/// A queued unit of work.
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub payload: EventPayload,
    pub priority: Priority,
    pub enqueued_at: Instant,
    /// Whether a higher-priority submission may preempt this event once it
    /// becomes active.
    pub interruptible: bool,
    /// Submission order, for diagnostics.
    pub sequence: u64,
}

impl Event {
    pub fn new(kind: EventKind, payload: EventPayload, priority: Priority) -> Self {
        Self {
            kind,
            payload,
            priority,
            enqueued_at: Instant::now(),
            interruptible: !kind.is_non_interruptible(),
            sequence: next_sequence(),
        }
    }
}
