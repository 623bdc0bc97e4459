//! Run command - drive the full marker pipeline against a simulated source.
//!
//! Wires the coordinator daemon, the reconciliation engine over a logging
//! surface, and a poller fed by randomly drifting markers. Useful for
//! watching scheduling and reconciliation behavior without a real map.

use std::collections::HashMap;
use std::time::Duration;

use futures::future::BoxFuture;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use markerlayer::config::{DisplayModeCatalog, MarkerLayerConfig};
use markerlayer::coordinator::daemon::{CoordinatorDaemon, Submission};
use markerlayer::coordinator::dispatch::EngineDispatcher;
use markerlayer::coordinator::{EventKind, EventPayload, Priority};
use markerlayer::interact::{InteractConfig, InteractionGate, InteractionTracker};
use markerlayer::marker::{MarkerId, RawMarker, RefreshPayload};
use markerlayer::poller::{DataSource, FetchError, PollerConfig, PollerControl, RealtimePoller};
use markerlayer::reconcile::{DisplayMode, ReconcileEngine};
use markerlayer::surface::{
    HandleId, IconHandle, IconSpec, MarkerSurface, RenderTarget, SurfaceError,
};

use crate::error::CliError;

/// Arguments for the run command.
#[derive(clap::Args)]
pub struct RunArgs {
    /// Number of simulated markers
    #[arg(long, default_value_t = 25)]
    pub markers: usize,

    /// Poll interval in milliseconds
    #[arg(long, default_value_t = 5000)]
    pub interval_ms: u64,

    /// Display mode key from the catalog
    #[arg(long, default_value = "status")]
    pub mode: String,

    /// How long to run in seconds (0 runs until Ctrl-C)
    #[arg(long, default_value_t = 0)]
    pub duration_secs: u64,
}

/// Run the run command.
pub fn run(args: RunArgs) -> Result<(), CliError> {
    markerlayer::telemetry::init_logging("info,markerlayer=debug");
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(drive(args))
}

async fn drive(args: RunArgs) -> Result<(), CliError> {
    let catalog = DisplayModeCatalog::default();
    let descriptor = catalog
        .find(&args.mode)
        .ok_or_else(|| CliError::Config(format!("unknown display mode '{}'", args.mode)))?;

    let gate = InteractionGate::new();
    let tracker = InteractionTracker::new(InteractConfig::default(), gate.clone(), 6.0);
    let engine = ReconcileEngine::new(LoggingSurface::default());
    let control = PollerControl::new();
    let dispatcher =
        EngineDispatcher::new(engine, tracker, gate.clone()).with_poller(control.clone());

    let config = MarkerLayerConfig::new();
    let (daemon, handle) = CoordinatorDaemon::new(dispatcher, config.channel_capacity);
    let cancel = CancellationToken::new();
    let daemon_task = tokio::spawn(daemon.run(cancel.clone()));

    let poller = RealtimePoller::new(
        SimulatedSource::new(args.markers),
        gate,
        handle.clone(),
        PollerConfig {
            interval: Duration::from_millis(args.interval_ms),
            ..PollerConfig::default()
        },
    )
    .with_control(control);
    let poller_task = tokio::spawn(poller.run(cancel.clone()));

    handle
        .submit(Submission::initialize(RefreshPayload::default()))
        .await?;
    if descriptor.mode() != DisplayMode::default() {
        handle
            .submit(Submission::new(
                EventKind::DisplayModeChange,
                EventPayload::Mode(descriptor.mode()),
                Priority::High,
            ))
            .await?;
    }

    info!(
        markers = args.markers,
        interval_ms = args.interval_ms,
        mode = %args.mode,
        "pipeline running, Ctrl-C to stop"
    );
    if args.duration_secs > 0 {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(args.duration_secs)) => {}
            _ = tokio::signal::ctrl_c() => {}
        }
    } else {
        let _ = tokio::signal::ctrl_c().await;
    }
    cancel.cancel();

    let coordinator = daemon_task.await?;
    poller_task.await?;

    let engine = coordinator.dispatcher().engine();
    let stats = engine.icon_cache_stats();
    println!();
    println!("Markers live:      {}", engine.len());
    println!("Coordinator state: {:?}", coordinator.state());
    println!(
        "Icon cache:        {} hits / {} misses / {} invalidations",
        stats.hits, stats.misses, stats.invalidations
    );
    Ok(())
}

// =============================================================================
// Simulated pieces
// =============================================================================

/// Surface that logs operations instead of rendering.
#[derive(Debug, Default)]
struct LoggingSurface {
    next: u64,
    live: HashMap<HandleId, MarkerId>,
}

impl MarkerSurface for LoggingSurface {
    fn make_icon(&mut self, spec: &IconSpec) -> Result<IconHandle, SurfaceError> {
        self.next += 1;
        debug!(
            glyph = spec.glyph_index,
            color = %spec.color.to_hex(),
            size = ?spec.metrics.size,
            "icon rendered"
        );
        Ok(IconHandle(self.next))
    }

    fn create_marker(
        &mut self,
        id: &MarkerId,
        lat: f64,
        lon: f64,
        _icon: IconHandle,
        _popup: &str,
        _tooltip: &str,
        target: RenderTarget,
    ) -> Result<HandleId, SurfaceError> {
        self.next += 1;
        let handle = HandleId(self.next);
        self.live.insert(handle, id.clone());
        debug!(%id, lat, lon, ?target, "marker created");
        Ok(handle)
    }

    fn set_position(&mut self, handle: HandleId, lat: f64, lon: f64) -> Result<(), SurfaceError> {
        if let Some(id) = self.live.get(&handle) {
            debug!(%id, lat, lon, "marker moved");
        }
        Ok(())
    }

    fn set_icon(&mut self, _handle: HandleId, _icon: IconHandle) -> Result<(), SurfaceError> {
        Ok(())
    }

    fn set_popup_content(&mut self, _handle: HandleId, _content: &str) -> Result<(), SurfaceError> {
        Ok(())
    }

    fn is_popup_open(&self, _handle: HandleId) -> bool {
        false
    }

    fn set_tooltip_visible(&mut self, _handle: HandleId, _visible: bool) -> Result<(), SurfaceError> {
        Ok(())
    }

    fn set_render_target(
        &mut self,
        _handle: HandleId,
        _target: RenderTarget,
    ) -> Result<(), SurfaceError> {
        Ok(())
    }

    fn remove_marker(&mut self, handle: HandleId) -> Result<(), SurfaceError> {
        if let Some(id) = self.live.remove(&handle) {
            debug!(%id, "marker removed");
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), SurfaceError> {
        debug!(count = self.live.len(), "surface cleared");
        self.live.clear();
        Ok(())
    }
}

/// Data source producing randomly drifting markers, a few of them near the
/// antimeridian so date-line duplication is exercised.
struct SimulatedSource {
    markers: Vec<RawMarker>,
    rng: StdRng,
}

impl SimulatedSource {
    fn new(count: usize) -> Self {
        let mut rng = StdRng::from_os_rng();
        let markers = (0..count)
            .map(|i| {
                let lon = if i % 10 == 0 {
                    rng.random_range(160.0..179.0)
                } else {
                    rng.random_range(-179.0..179.0)
                };
                RawMarker {
                    id: Some(format!("sim_{i}")),
                    lat: Some(rng.random_range(-60.0..60.0)),
                    lon: Some(lon),
                    variant: Some(rng.random_range(0.0..10.0)),
                    marker_type: (i % 7 == 0).then(|| "satellite".to_string()),
                    name: Some(format!("Station {i}")),
                }
            })
            .collect();
        Self { markers, rng }
    }

    fn step(&mut self) -> RefreshPayload {
        for marker in &mut self.markers {
            if self.rng.random_bool(0.3) {
                marker.variant = Some(self.rng.random_range(0.0..10.0));
            }
            if self.rng.random_bool(0.05) {
                if let Some(lat) = marker.lat {
                    let drift = self.rng.random_range(-0.5..0.5);
                    marker.lat = Some((lat + drift).clamp(-85.0, 85.0));
                }
            }
        }
        RefreshPayload::with_list(self.markers.clone())
    }
}

impl DataSource for SimulatedSource {
    fn fetch(&mut self) -> BoxFuture<'_, Result<RefreshPayload, FetchError>> {
        let payload = self.step();
        Box::pin(async move { Ok(payload) })
    }
}
