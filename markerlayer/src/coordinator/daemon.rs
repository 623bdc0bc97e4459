//! Channel-fed front-end for the coordinator.
//!
//! The coordinator itself is `&mut`-driven; the daemon wraps it in a task
//! that accepts [`Submission`]s over an mpsc channel, drains the channel
//! before each dispatch so preemption decisions see every pending
//! submission, and periodically gives the dispatcher a chance to emit
//! settle-derived events.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{Coordinator, Dispatcher, Event, EventKind, EventPayload, Priority};
use crate::marker::RefreshPayload;

/// How often the daemon polls the dispatcher for settle-derived work.
pub const DEFAULT_SETTLE_INTERVAL: Duration = Duration::from_millis(100);

/// A request to schedule one event.
#[derive(Debug, Clone)]
pub struct Submission {
    pub kind: EventKind,
    pub payload: EventPayload,
    pub priority: Priority,
}

impl Submission {
    pub fn new(kind: EventKind, payload: EventPayload, priority: Priority) -> Self {
        Self {
            kind,
            payload,
            priority,
        }
    }

    /// First marker load.
    pub fn initialize(payload: RefreshPayload) -> Self {
        Self::new(
            EventKind::Initialize,
            EventPayload::Refresh(payload),
            Priority::High,
        )
    }

    /// Ordinary background refresh.
    pub fn refresh(payload: RefreshPayload) -> Self {
        Self::new(
            EventKind::RefreshMarkers,
            EventPayload::Refresh(payload),
            Priority::Normal,
        )
    }

    /// Out-of-cadence poll request.
    pub fn force_refresh() -> Self {
        Self::new(EventKind::ForceRefresh, EventPayload::None, Priority::High)
    }

    pub(crate) fn into_event(self) -> Event {
        Event::new(self.kind, self.payload, self.priority)
    }
}

/// Errors from submitting to the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("coordinator daemon stopped")]
    Closed,

    #[error("submission queue full")]
    Full,
}

/// Cheap handle for submitting events to a running daemon.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<Submission>,
}

impl CoordinatorHandle {
    #[cfg(test)]
    pub(crate) fn from_sender(tx: mpsc::Sender<Submission>) -> Self {
        Self { tx }
    }

    /// Submits, waiting for channel capacity.
    pub async fn submit(&self, submission: Submission) -> Result<(), SubmitError> {
        self.tx
            .send(submission)
            .await
            .map_err(|_| SubmitError::Closed)
    }

    /// Submits without waiting; fails when the channel is full.
    pub fn try_submit(&self, submission: Submission) -> Result<(), SubmitError> {
        self.tx.try_send(submission).map_err(|error| match error {
            mpsc::error::TrySendError::Full(_) => SubmitError::Full,
            mpsc::error::TrySendError::Closed(_) => SubmitError::Closed,
        })
    }
}

/// Owns a [`Coordinator`] and feeds it from a channel.
#[derive(Debug)]
pub struct CoordinatorDaemon<D: Dispatcher> {
    coordinator: Coordinator<D>,
    rx: mpsc::Receiver<Submission>,
    settle_interval: Duration,
}

impl<D: Dispatcher> CoordinatorDaemon<D> {
    /// Creates a daemon with a bounded submission channel.
    pub fn new(dispatcher: D, capacity: usize) -> (Self, CoordinatorHandle) {
        let (tx, rx) = mpsc::channel(capacity);
        let daemon = Self {
            coordinator: Coordinator::new(dispatcher),
            rx,
            settle_interval: DEFAULT_SETTLE_INTERVAL,
        };
        (daemon, CoordinatorHandle { tx })
    }

    pub fn with_settle_interval(mut self, interval: Duration) -> Self {
        self.settle_interval = interval;
        self
    }

    /// Runs until cancelled or every handle is dropped, then returns the
    /// coordinator for inspection.
    pub async fn run(mut self, cancel: CancellationToken) -> Coordinator<D> {
        info!("coordinator daemon started");
        let mut settle = tokio::time::interval(self.settle_interval);
        settle.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            // Drain every pending submission first so preemption decisions
            // see the full picture, then dispatch one event
            while let Ok(submission) = self.rx.try_recv() {
                self.coordinator.enqueue(submission.into_event());
            }
            if self.coordinator.drive().await {
                continue;
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("coordinator daemon cancelled");
                    break;
                }
                received = self.rx.recv() => {
                    match received {
                        Some(submission) => self.coordinator.enqueue(submission.into_event()),
                        None => {
                            debug!("all coordinator handles dropped");
                            break;
                        }
                    }
                }
                _ = settle.tick() => {
                    for event in self.coordinator.dispatcher_mut().poll_settle() {
                        self.coordinator.enqueue(event);
                    }
                }
            }
        }
        info!("coordinator daemon stopped");
        self.coordinator
    }
}
