//! MarkerLayer - realtime map marker coordination and reconciliation
//!
//! This library keeps a set of map markers in sync with a periodically
//! polled data source. A single-slot cooperative coordinator schedules all
//! mutating work with priority preemption, and an incremental
//! reconciliation engine applies marker data to an abstract rendering
//! surface with minimal churn: unchanged markers are untouched, changed
//! ones are updated in place, and only genuinely new or vanished markers
//! are created or removed.
//!
//! The main pieces:
//!
//! - [`coordinator`]: the event queue, priority/preemption rules, and the
//!   channel-fed daemon that drives dispatch.
//! - [`reconcile`]: the diff engine owning the live marker set.
//! - [`poller`]: cadence-based fetching with interaction-aware skipping.
//! - [`interact`]: gesture/zoom debouncing and deferred-refresh replay.
//! - [`surface`]: the trait the host rendering layer implements.

pub mod config;
pub mod coord;
pub mod coordinator;
pub mod icon;
pub mod interact;
pub mod marker;
pub mod poller;
pub mod reconcile;
pub mod surface;
pub mod telemetry;
pub mod weather;

pub use config::{DisplayModeCatalog, MarkerLayerConfig};
pub use coordinator::daemon::{CoordinatorDaemon, CoordinatorHandle, Submission};
pub use coordinator::dispatch::EngineDispatcher;
pub use coordinator::{Coordinator, Dispatcher, Event, EventKind, EventPayload, Priority};
pub use interact::{InteractionGate, InteractionTracker};
pub use marker::{Marker, MarkerId, RawMarker, RefreshPayload};
pub use poller::{DataSource, PollerControl, RealtimePoller};
pub use reconcile::{DisplayMode, ReconcileEngine, RefreshOutcome};
pub use surface::MarkerSurface;
