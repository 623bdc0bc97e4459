//! Single-slot cooperative event coordinator.
//!
//! Exactly one event is active at a time; everything else waits in the
//! [`EventQueue`]. Scheduling decisions happen synchronously in
//! [`Coordinator::enqueue`], so the preemption rules below hold without any
//! locking; the async [`Coordinator::drive`] loop then executes one
//! dispatch at a time.
//!
//! Preemption rules:
//!
//! - `Critical` always preempts, even a non-interruptible active event.
//! - `High` and user-originated submissions preempt an interruptible active
//!   event.
//! - A preempted event is snapshotted to the queue front, promoted to at
//!   least `High`, and later restarted from scratch.
//! - On completion the queue is stably partitioned so `High`-or-better
//!   entries run first.

pub mod daemon;
pub mod dispatch;
mod event;
mod progress;
mod queue;

pub use event::{Event, EventKind, EventPayload, GestureKind, Priority};
pub use progress::ProgressHandle;
pub use queue::EventQueue;

use std::time::Instant;

use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::reconcile::RefreshOutcome;

// =============================================================================
// Dispatch interface
// =============================================================================

/// Lifecycle state reported by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordinatorState {
    /// No event has completed yet.
    #[default]
    Initializing,
    /// The most recent dispatch succeeded.
    Ready,
    /// The most recent dispatch failed; see
    /// [`Coordinator::last_error`].
    Error,
}

/// Errors surfaced by event dispatch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispatchError {
    #[error("marker engine failure: {0}")]
    Engine(String),

    #[error("data source failure: {0}")]
    Fetch(String),

    #[error("no handler for event kind {0}")]
    Unsupported(EventKind),
}

impl DispatchError {
    /// Numeric code recorded alongside the failure.
    pub fn code(&self) -> u16 {
        match self {
            Self::Engine(_) => 500,
            Self::Fetch(_) => 502,
            Self::Unsupported(_) => 400,
        }
    }
}

/// The most recent dispatch failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastError {
    pub code: u16,
    pub message: String,
}

/// What a completed dispatch did.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// The event was handled.
    Done,
    /// A reconciliation pass ran.
    Refreshed(RefreshOutcome),
    /// The event was intentionally not applied (e.g. a refresh deferred
    /// while the user is interacting).
    Skipped,
}

/// Executes events on behalf of the coordinator.
///
/// `dispatch` runs one event to completion. The coordinator guarantees it is
/// never invoked concurrently with itself.
pub trait Dispatcher: Send {
    fn dispatch<'a>(
        &'a mut self,
        event: &'a Event,
        progress: &'a ProgressHandle,
    ) -> BoxFuture<'a, Result<DispatchOutcome, DispatchError>>;

    /// Called when a critical submission preempts an active refresh-domain
    /// event; implementations cancel any pending poll tick so stale data
    /// does not land after the critical work.
    fn cancel_refresh_timer(&mut self) {}

    /// Invoked periodically by the daemon while idle; returns events derived
    /// from settled interactions (icon resize, cluster toggle, deferred
    /// refresh replay).
    fn poll_settle(&mut self) -> Vec<Event> {
        Vec::new()
    }
}

// =============================================================================
// Coordinator
// =============================================================================

/// The single active slot.
#[derive(Debug)]
pub struct ActiveEvent {
    pub event: Event,
    pub started_at: Instant,
    pub progress: ProgressHandle,
}

/// Single-threaded event coordinator with priority preemption.
///
/// Owns the dispatcher, the pending queue, and the active slot. All mutation
/// goes through `&mut self`, which is what enforces the single-active
/// invariant.
#[derive(Debug)]
pub struct Coordinator<D: Dispatcher> {
    dispatcher: D,
    queue: EventQueue,
    active: Option<ActiveEvent>,
    state: CoordinatorState,
    last_error: Option<LastError>,
    last_user_event: Option<Instant>,
}

impl<D: Dispatcher> Coordinator<D> {
    pub fn new(dispatcher: D) -> Self {
        Self {
            dispatcher,
            queue: EventQueue::new(),
            active: None,
            state: CoordinatorState::Initializing,
            last_error: None,
            last_user_event: None,
        }
    }

    /// Submits an event, applying the preemption rules synchronously.
    pub fn enqueue(&mut self, event: Event) {
        if event.kind.is_user_originated() {
            self.last_user_event = Some(event.enqueued_at);
        }

        let Some(active) = &self.active else {
            self.start(event);
            return;
        };

        let preempts = event.priority == Priority::Critical
            || (active.event.interruptible
                && (event.priority >= Priority::High || event.kind.is_user_originated()));
        if !preempts {
            debug!(kind = %event.kind, priority = %event.priority, "event queued");
            self.queue.push_back(event);
            return;
        }

        let cancel_timer =
            event.priority == Priority::Critical && active.event.kind.is_refresh_domain();
        let mut snapshot = active.event.clone();
        snapshot.priority = snapshot.priority.max(Priority::High);
        debug!(
            preempted = %snapshot.kind,
            by = %event.kind,
            "active event preempted"
        );
        if cancel_timer {
            self.dispatcher.cancel_refresh_timer();
        }
        self.queue.push_front(snapshot);
        self.start(event);
    }

    /// Executes the active event to completion and starts the next one.
    ///
    /// Returns `false` when the slot is empty and there is nothing to do.
    pub async fn drive(&mut self) -> bool {
        let Some(active) = &self.active else {
            return false;
        };
        let event = active.event.clone();
        let progress = active.progress.clone();

        match self.dispatcher.dispatch(&event, &progress).await {
            Ok(outcome) => {
                debug!(kind = %event.kind, ?outcome, "event completed");
                self.state = CoordinatorState::Ready;
            }
            Err(error) => {
                warn!(kind = %event.kind, %error, "event failed");
                self.last_error = Some(LastError {
                    code: error.code(),
                    message: error.to_string(),
                });
                self.state = CoordinatorState::Error;
            }
        }
        self.complete();
        true
    }

    /// Drains the active slot and the queue without dispatching.
    pub fn clear_pending(&mut self) {
        self.active = None;
        self.queue.clear();
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn last_error(&self) -> Option<&LastError> {
        self.last_error.as_ref()
    }

    pub fn active(&self) -> Option<&ActiveEvent> {
        self.active.as_ref()
    }

    /// Progress of the active event, if any.
    pub fn progress(&self) -> Option<u8> {
        self.active.as_ref().map(|active| active.progress.get())
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_none() && self.queue.is_empty()
    }

    /// When the user last submitted an originated event.
    pub fn last_user_event(&self) -> Option<Instant> {
        self.last_user_event
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut D {
        &mut self.dispatcher
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn start(&mut self, event: Event) {
        debug!(kind = %event.kind, priority = %event.priority, "event active");
        self.active = Some(ActiveEvent {
            progress: ProgressHandle::new(),
            started_at: Instant::now(),
            event,
        });
    }

    /// Clears the slot, promotes pending high-priority work, and activates
    /// the next event.
    fn complete(&mut self) {
        self.active = None;
        self.queue.promote_high();
        if let Some(next) = self.queue.pop_front() {
            self.start(next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[derive(Debug, Default)]
    struct FakeDispatcher {
        dispatched: Vec<EventKind>,
        fail_kinds: HashSet<EventKind>,
        timer_cancels: usize,
    }

    impl Dispatcher for FakeDispatcher {
        fn dispatch<'a>(
            &'a mut self,
            event: &'a Event,
            _progress: &'a ProgressHandle,
        ) -> BoxFuture<'a, Result<DispatchOutcome, DispatchError>> {
            self.dispatched.push(event.kind);
            let result = if self.fail_kinds.contains(&event.kind) {
                Err(DispatchError::Engine("injected".to_string()))
            } else {
                Ok(DispatchOutcome::Done)
            };
            Box::pin(async move { result })
        }

        fn cancel_refresh_timer(&mut self) {
            self.timer_cancels += 1;
        }
    }

    fn coordinator() -> Coordinator<FakeDispatcher> {
        Coordinator::new(FakeDispatcher::default())
    }

    fn event(kind: EventKind, priority: Priority) -> Event {
        Event::new(kind, EventPayload::None, priority)
    }

    async fn drive_all(coordinator: &mut Coordinator<FakeDispatcher>) {
        while coordinator.drive().await {}
    }

    #[test]
    fn test_idle_submission_starts_immediately() {
        let mut coordinator = coordinator();
        coordinator.enqueue(event(EventKind::Initialize, Priority::Normal));

        assert_eq!(
            coordinator.active().unwrap().event.kind,
            EventKind::Initialize
        );
        assert_eq!(coordinator.queue_len(), 0);
    }

    #[test]
    fn test_normal_submission_queues_behind_active() {
        let mut coordinator = coordinator();
        coordinator.enqueue(event(EventKind::RefreshMarkers, Priority::Normal));
        coordinator.enqueue(event(EventKind::TooltipToggle, Priority::Normal));

        assert_eq!(
            coordinator.active().unwrap().event.kind,
            EventKind::RefreshMarkers
        );
        assert_eq!(coordinator.queue_len(), 1);
    }

    #[test]
    fn test_high_preempts_interruptible_active() {
        let mut coordinator = coordinator();
        coordinator.enqueue(event(EventKind::RefreshMarkers, Priority::Normal));
        coordinator.enqueue(event(EventKind::IconResize, Priority::High));

        assert_eq!(
            coordinator.active().unwrap().event.kind,
            EventKind::IconResize
        );
        // The preempted event waits at the queue front, promoted to High
        let front = coordinator.queue.iter().next().unwrap();
        assert_eq!(front.kind, EventKind::RefreshMarkers);
        assert_eq!(front.priority, Priority::High);
    }

    #[test]
    fn test_high_does_not_preempt_non_interruptible() {
        let mut coordinator = coordinator();
        coordinator.enqueue(event(EventKind::Initialize, Priority::Normal));
        coordinator.enqueue(event(EventKind::IconResize, Priority::High));

        assert_eq!(
            coordinator.active().unwrap().event.kind,
            EventKind::Initialize
        );
        assert_eq!(coordinator.queue_len(), 1);
    }

    #[test]
    fn test_critical_preempts_non_interruptible() {
        let mut coordinator = coordinator();
        coordinator.enqueue(event(EventKind::Initialize, Priority::Normal));
        coordinator.enqueue(event(EventKind::DisplayModeChange, Priority::Critical));

        assert_eq!(
            coordinator.active().unwrap().event.kind,
            EventKind::DisplayModeChange
        );
        let front = coordinator.queue.iter().next().unwrap();
        assert_eq!(front.kind, EventKind::Initialize);
        assert_eq!(front.priority, Priority::High);
    }

    #[test]
    fn test_user_originated_normal_preempts_interruptible() {
        let mut coordinator = coordinator();
        coordinator.enqueue(event(EventKind::RefreshMarkers, Priority::Normal));
        coordinator.enqueue(event(EventKind::UserGesture, Priority::Normal));

        assert_eq!(
            coordinator.active().unwrap().event.kind,
            EventKind::UserGesture
        );
        assert!(coordinator.last_user_event().is_some());
    }

    #[test]
    fn test_critical_preempting_refresh_cancels_timer() {
        let mut coordinator = coordinator();
        coordinator.enqueue(event(EventKind::RefreshMarkers, Priority::Normal));
        coordinator.enqueue(event(EventKind::DisplayModeChange, Priority::Critical));
        assert_eq!(coordinator.dispatcher().timer_cancels, 1);

        // Preempting a non-refresh event leaves the timer alone
        let mut coordinator = self::coordinator();
        coordinator.enqueue(event(EventKind::TooltipToggle, Priority::Normal));
        coordinator.enqueue(event(EventKind::DisplayModeChange, Priority::Critical));
        assert_eq!(coordinator.dispatcher().timer_cancels, 0);
    }

    #[tokio::test]
    async fn test_drive_executes_in_preemption_order() {
        let mut coordinator = coordinator();
        coordinator.enqueue(event(EventKind::RefreshMarkers, Priority::Normal));
        coordinator.enqueue(event(EventKind::TooltipToggle, Priority::Normal));
        coordinator.enqueue(event(EventKind::DisplayModeChange, Priority::Critical));

        drive_all(&mut coordinator).await;

        // Critical first, then the promoted preempted refresh, then the
        // normal tooltip toggle
        assert_eq!(
            coordinator.dispatcher().dispatched,
            vec![
                EventKind::DisplayModeChange,
                EventKind::RefreshMarkers,
                EventKind::TooltipToggle,
            ]
        );
        assert!(coordinator.is_idle());
        assert_eq!(coordinator.state(), CoordinatorState::Ready);
    }

    #[tokio::test]
    async fn test_completion_promotes_queued_high() {
        let mut coordinator = coordinator();
        coordinator.enqueue(event(EventKind::Initialize, Priority::Normal));
        coordinator.enqueue(event(EventKind::RefreshMarkers, Priority::Normal));
        // High cannot preempt Initialize, so it queues behind the refresh
        coordinator.enqueue(event(EventKind::IconResize, Priority::High));

        drive_all(&mut coordinator).await;

        assert_eq!(
            coordinator.dispatcher().dispatched,
            vec![
                EventKind::Initialize,
                EventKind::IconResize,
                EventKind::RefreshMarkers,
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_dispatch_records_error_and_continues() {
        let mut coordinator = coordinator();
        coordinator
            .dispatcher_mut()
            .fail_kinds
            .insert(EventKind::RefreshMarkers);
        coordinator.enqueue(event(EventKind::RefreshMarkers, Priority::Normal));
        coordinator.enqueue(event(EventKind::TooltipToggle, Priority::Normal));

        assert!(coordinator.drive().await);
        assert_eq!(coordinator.state(), CoordinatorState::Error);
        let last = coordinator.last_error().unwrap();
        assert_eq!(last.code, 500);
        assert!(last.message.contains("injected"));

        // The queue keeps flowing after the failure
        assert!(coordinator.drive().await);
        assert_eq!(coordinator.state(), CoordinatorState::Ready);
        assert!(coordinator.is_idle());
    }

    #[tokio::test]
    async fn test_drive_on_idle_is_noop() {
        let mut coordinator = coordinator();
        assert!(!coordinator.drive().await);
        assert_eq!(coordinator.state(), CoordinatorState::Initializing);
    }

    #[test]
    fn test_clear_pending_empties_everything() {
        let mut coordinator = coordinator();
        coordinator.enqueue(event(EventKind::RefreshMarkers, Priority::Normal));
        coordinator.enqueue(event(EventKind::TooltipToggle, Priority::Normal));
        coordinator.clear_pending();
        assert!(coordinator.is_idle());
    }
}
