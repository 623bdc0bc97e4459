//! Event execution against the reconciliation engine.
//!
//! [`EngineDispatcher`] is the production [`Dispatcher`]: it routes each
//! event kind to the matching engine operation, consults the interaction
//! gate before applying refreshes, and forwards force-refresh requests to
//! the poller.

use std::time::Instant;

use futures::future::BoxFuture;
use tracing::debug;

use super::{
    DispatchError, DispatchOutcome, Dispatcher, Event, EventKind, EventPayload, ProgressHandle,
};
use crate::interact::{DerivedEvent, InteractionGate, InteractionTracker};
use crate::poller::PollerControl;
use crate::reconcile::ReconcileEngine;
use crate::surface::MarkerSurface;

/// Routes coordinator events to the reconciliation engine.
pub struct EngineDispatcher<S: MarkerSurface> {
    engine: ReconcileEngine<S>,
    tracker: InteractionTracker,
    gate: InteractionGate,
    poller: Option<PollerControl>,
}

impl<S: MarkerSurface> EngineDispatcher<S> {
    pub fn new(engine: ReconcileEngine<S>, tracker: InteractionTracker, gate: InteractionGate) -> Self {
        Self {
            engine,
            tracker,
            gate,
            poller: None,
        }
    }

    /// Attaches the poller control so force-refresh events and critical
    /// preemptions reach the poll timer.
    pub fn with_poller(mut self, control: PollerControl) -> Self {
        self.poller = Some(control);
        self
    }

    pub fn engine(&self) -> &ReconcileEngine<S> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut ReconcileEngine<S> {
        &mut self.engine
    }

    async fn handle(
        &mut self,
        event: &Event,
        progress: &ProgressHandle,
    ) -> Result<DispatchOutcome, DispatchError> {
        match (&event.kind, &event.payload) {
            (EventKind::Initialize, EventPayload::Refresh(payload)) => {
                let list = payload.list.as_deref().unwrap_or(&[]);
                let outcome = self
                    .engine
                    .process_all(list, progress)
                    .await
                    .map_err(|error| DispatchError::Engine(error.to_string()))?;
                self.gate.set_map_ready(true);
                Ok(DispatchOutcome::Refreshed(outcome))
            }
            (EventKind::RefreshMarkers, EventPayload::Refresh(payload)) => {
                if !self.gate.is_map_ready() {
                    debug!("refresh skipped, map not ready");
                    return Ok(DispatchOutcome::Skipped);
                }
                if self.gate.is_interacting() {
                    debug!("refresh deferred, user interacting");
                    self.gate.defer(payload.clone());
                    return Ok(DispatchOutcome::Skipped);
                }
                let outcome = self
                    .engine
                    .refresh(payload, progress)
                    .await
                    .map_err(|error| DispatchError::Engine(error.to_string()))?;
                Ok(DispatchOutcome::Refreshed(outcome))
            }
            (EventKind::DisplayModeChange, EventPayload::Mode(mode)) => {
                self.engine.set_display_mode(mode.clone()).await;
                Ok(DispatchOutcome::Done)
            }
            (EventKind::IconResize, EventPayload::Profile(profile)) => {
                self.engine.set_icon_profile(*profile).await;
                Ok(DispatchOutcome::Done)
            }
            (EventKind::ClusterToggle, EventPayload::Clustered(clustered)) => {
                self.engine.set_clustering(*clustered).await;
                Ok(DispatchOutcome::Done)
            }
            (EventKind::TooltipToggle, EventPayload::TooltipsEnabled(enabled)) => {
                self.engine.set_tooltip_visibility(*enabled);
                Ok(DispatchOutcome::Done)
            }
            (EventKind::UserGesture, EventPayload::Gesture { kind, zoom }) => {
                let now = Instant::now();
                match zoom {
                    Some(zoom) => self.tracker.zoom_changed(*zoom, now),
                    None => self.tracker.gesture(*kind, now),
                }
                Ok(DispatchOutcome::Done)
            }
            (EventKind::ForceRefresh, _) => match &self.poller {
                Some(control) => {
                    control.force_update();
                    Ok(DispatchOutcome::Done)
                }
                None => {
                    debug!("force refresh ignored, no poller attached");
                    Ok(DispatchOutcome::Skipped)
                }
            },
            (kind, _) => Err(DispatchError::Unsupported(*kind)),
        }
    }
}

impl<S: MarkerSurface> Dispatcher for EngineDispatcher<S> {
    fn dispatch<'a>(
        &'a mut self,
        event: &'a Event,
        progress: &'a ProgressHandle,
    ) -> BoxFuture<'a, Result<DispatchOutcome, DispatchError>> {
        Box::pin(self.handle(event, progress))
    }

    fn cancel_refresh_timer(&mut self) {
        if let Some(control) = &self.poller {
            control.cancel_pending();
        }
    }

    fn poll_settle(&mut self) -> Vec<Event> {
        self.tracker
            .settle(Instant::now())
            .into_iter()
            .map(DerivedEvent::into_event)
            .collect()
    }
}
