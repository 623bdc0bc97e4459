//! Periodic data-source polling.
//!
//! The poller fetches refresh payloads on a fixed cadence (first tick
//! immediately) and submits them to the coordinator. A scheduled tick is
//! skipped while the map is not ready, while the user is interacting, or
//! when a critical preemption cancelled it; skipping costs nothing because
//! the next tick reschedules regardless.
//!
//! Repeated fetch failures suspend polling rather than hammering a broken
//! source; the poller stays suspended until an explicit forced update
//! restarts the cadence.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::coordinator::daemon::{CoordinatorHandle, Submission};
use crate::interact::InteractionGate;
use crate::marker::RefreshPayload;

/// Default polling cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Default retry delay. Reserved for backoff tuning; the runner does not
/// retry on its own once suspended.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(10_000);

/// Consecutive fetch failures after which polling suspends.
pub const DEFAULT_MAX_CONSECUTIVE_ERRORS: u32 = 3;

/// Tunables for the realtime poller.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub interval: Duration,
    /// Reserved for backoff tuning; not consulted by the runner.
    pub retry_delay: Duration,
    pub max_consecutive_errors: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            retry_delay: DEFAULT_RETRY_DELAY,
            max_consecutive_errors: DEFAULT_MAX_CONSECUTIVE_ERRORS,
        }
    }
}

/// Errors from fetching a refresh payload.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("malformed payload: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for FetchError {
    fn from(error: serde_json::Error) -> Self {
        Self::Malformed(error.to_string())
    }
}

/// Source of refresh payloads.
pub trait DataSource: Send {
    fn fetch(&mut self) -> BoxFuture<'_, Result<RefreshPayload, FetchError>>;
}

/// Always-empty data source, useful when markers arrive purely by push.
#[derive(Debug, Default)]
pub struct NullSource;

impl DataSource for NullSource {
    fn fetch(&mut self) -> BoxFuture<'_, Result<RefreshPayload, FetchError>> {
        Box::pin(async { Ok(RefreshPayload::default()) })
    }
}

/// Canned data source replaying a fixed sequence of payloads, then holding
/// the last one.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    steps: VecDeque<RefreshPayload>,
    last: Option<RefreshPayload>,
}

impl ScriptedSource {
    pub fn new(steps: impl IntoIterator<Item = RefreshPayload>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            last: None,
        }
    }
}

impl DataSource for ScriptedSource {
    fn fetch(&mut self) -> BoxFuture<'_, Result<RefreshPayload, FetchError>> {
        if let Some(step) = self.steps.pop_front() {
            self.last = Some(step);
        }
        let payload = self.last.clone().unwrap_or_default();
        Box::pin(async move { Ok(payload) })
    }
}

/// External control surface for a running poller.
///
/// Cloneable; the dispatcher holds one to service force-refresh events and
/// critical-preemption cancellations.
#[derive(Debug, Clone, Default)]
pub struct PollerControl {
    force: Arc<Notify>,
    cancel_pending: Arc<AtomicBool>,
}

impl PollerControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests an immediate out-of-cadence fetch. Also resumes a poller
    /// suspended after repeated failures.
    pub fn force_update(&self) {
        self.force.notify_one();
    }

    /// Cancels the next scheduled tick (forced updates are unaffected).
    pub fn cancel_pending(&self) {
        self.cancel_pending.store(true, Ordering::Relaxed);
    }

    fn take_cancelled(&self) -> bool {
        self.cancel_pending.swap(false, Ordering::Relaxed)
    }

    async fn forced(&self) {
        self.force.notified().await
    }
}

#[derive(Debug, PartialEq, Eq)]
enum PollerAction {
    Continue,
    Suspend,
}

/// Polls a [`DataSource`] on a cadence and submits refreshes.
#[derive(Debug)]
pub struct RealtimePoller<D: DataSource> {
    config: PollerConfig,
    source: D,
    gate: InteractionGate,
    handle: CoordinatorHandle,
    control: PollerControl,
    consecutive_errors: u32,
}

impl<D: DataSource> RealtimePoller<D> {
    pub fn new(
        source: D,
        gate: InteractionGate,
        handle: CoordinatorHandle,
        config: PollerConfig,
    ) -> Self {
        Self {
            config,
            source,
            gate,
            handle,
            control: PollerControl::new(),
            consecutive_errors: 0,
        }
    }

    /// Control surface for this poller.
    pub fn control(&self) -> PollerControl {
        self.control.clone()
    }

    /// Uses an externally created control, so the same instance can be
    /// shared with the dispatcher before the poller task starts.
    pub fn with_control(mut self, control: PollerControl) -> Self {
        self.control = control;
        self
    }

    /// Polls until cancelled or the coordinator goes away. The first tick
    /// fires immediately.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(interval = ?self.config.interval, "poller started");
        let mut next = tokio::time::Instant::now();

        loop {
            let forced = tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.control.forced() => true,
                _ = tokio::time::sleep_until(next) => false,
            };

            match self.tick(forced).await {
                Some(PollerAction::Continue) => {
                    next = tokio::time::Instant::now() + self.config.interval;
                }
                Some(PollerAction::Suspend) => {
                    warn!(
                        errors = self.consecutive_errors,
                        "poller suspended after repeated failures"
                    );
                    // Fail closed: no automatic retry, only an explicit
                    // forced update restarts the cadence.
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = self.control.forced() => {
                            info!("poller resumed by forced update");
                            self.consecutive_errors = 0;
                            next = tokio::time::Instant::now();
                        }
                    }
                }
                None => break,
            }
        }
        info!("poller stopped");
    }

    /// Runs one tick. Returns `None` when the coordinator is gone.
    async fn tick(&mut self, forced: bool) -> Option<PollerAction> {
        if !self.gate.is_map_ready() {
            debug!("poll skipped, map not ready");
            return Some(PollerAction::Continue);
        }
        if !forced {
            if self.control.take_cancelled() {
                debug!("scheduled poll cancelled");
                return Some(PollerAction::Continue);
            }
            if self.gate.is_interacting() {
                debug!("poll skipped, user interacting");
                return Some(PollerAction::Continue);
            }
        }

        match self.source.fetch().await {
            Ok(payload) => {
                self.consecutive_errors = 0;
                match self.handle.submit(Submission::refresh(payload)).await {
                    Ok(()) => Some(PollerAction::Continue),
                    Err(_) => None,
                }
            }
            Err(error) => {
                self.consecutive_errors += 1;
                warn!(
                    %error,
                    consecutive = self.consecutive_errors,
                    "marker fetch failed"
                );
                if self.consecutive_errors >= self.config.max_consecutive_errors {
                    Some(PollerAction::Suspend)
                } else {
                    Some(PollerAction::Continue)
                }
            }
        }
    }
}
