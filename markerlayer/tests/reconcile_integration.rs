//! End-to-end reconciliation scenarios against an in-memory surface.

mod common;

use common::{raw, raw_list, TestSurface};
use markerlayer::coord;
use markerlayer::coordinator::ProgressHandle;
use markerlayer::marker::RefreshPayload;
use markerlayer::reconcile::{DisplayMode, ReconcileEngine};
use markerlayer::surface::RenderTarget;

fn engine() -> ReconcileEngine<TestSurface> {
    ReconcileEngine::new(TestSurface::default())
}

#[tokio::test]
async fn dateline_markers_render_on_both_sides() {
    let mut engine = engine();
    let list = vec![raw(10.0, 175.0, 0.0), raw(-5.0, -178.0, 0.0)];

    let outcome = engine
        .process_all(&list, &ProgressHandle::new())
        .await
        .unwrap();

    // Two primaries plus two mirrored duplicates
    assert_eq!(outcome.added, 4);
    let surface = engine.surface();
    assert_eq!(surface.len(), 4);

    // Duplicates carry raw longitudes past ±180 so the renderer places them
    // on the far copy of the world
    let east_dup = surface.by_id("marker_0_dateline").unwrap();
    assert_eq!(east_dup.lon, -185.0);
    let west_dup = surface.by_id("marker_1_dateline").unwrap();
    assert_eq!(west_dup.lon, 182.0);

    // Normalizing the raw values recovers the canonical positions
    assert_eq!(coord::normalize_lon(east_dup.lon), 175.0);
    assert_eq!(coord::normalize_lon(west_dup.lon), -178.0);

    // User-facing popup text shows the canonical longitude, not the raw one
    assert!(east_dup.popup.contains("175.0000"));
    assert!(west_dup.popup.contains("-178.0000"));
}

#[tokio::test]
async fn incremental_refresh_touches_only_changes() {
    let mut engine = engine();
    engine
        .process_all(&raw_list(6), &ProgressHandle::new())
        .await
        .unwrap();
    let creates_after_init = engine.surface().creates;

    // One moved, one dropped, one added
    let mut list = raw_list(6);
    list[0].lat = Some(42.0);
    list.remove(5);
    list.push(raw(80.0, 10.0, 2.0));

    let outcome = engine
        .refresh(&RefreshPayload::with_list(list), &ProgressHandle::new())
        .await
        .unwrap();

    assert!(!outcome.rebuilt);
    assert_eq!(outcome.updated, 1);
    assert_eq!(outcome.removed, 1);
    assert_eq!(outcome.added, 1);
    assert_eq!(engine.surface().creates, creates_after_init + 1);
    assert_eq!(engine.surface().by_id("marker_0").unwrap().lat, 42.0);
}

#[tokio::test]
async fn open_popup_survives_refresh_and_mode_change() {
    let mut engine = engine();
    engine
        .process_all(&raw_list(3), &ProgressHandle::new())
        .await
        .unwrap();

    let handle = *engine
        .surface()
        .markers
        .iter()
        .find(|(_, m)| m.id.as_str() == "marker_1")
        .map(|(h, _)| h)
        .unwrap();
    engine.surface_mut().open_popups.insert(handle);

    let mut list = raw_list(3);
    list[1].variant = Some(5.0);
    engine
        .refresh(&RefreshPayload::with_list(list), &ProgressHandle::new())
        .await
        .unwrap();
    engine.set_display_mode(DisplayMode::continuous(10.0)).await;

    // Same handle throughout; the popup was never closed
    assert!(engine.surface().open_popups.contains(&handle));
    assert!(engine.surface().markers.contains_key(&handle));
}

#[tokio::test]
async fn cluster_round_trip_preserves_the_set() {
    let mut engine = engine();
    engine
        .process_all(&raw_list(5), &ProgressHandle::new())
        .await
        .unwrap();
    let creates_before = engine.surface().creates;

    engine.set_clustering(true).await;
    assert!(engine
        .surface()
        .markers
        .values()
        .all(|m| m.target == RenderTarget::Clustered));

    engine.set_clustering(false).await;
    assert!(engine
        .surface()
        .markers
        .values()
        .all(|m| m.target == RenderTarget::Individual));

    assert_eq!(engine.surface().len(), 5);
    assert_eq!(engine.surface().creates, creates_before);
}

#[tokio::test]
async fn oversized_delta_falls_back_to_rebuild() {
    let mut engine = engine();
    engine
        .process_all(&raw_list(30), &ProgressHandle::new())
        .await
        .unwrap();
    assert_eq!(engine.surface().clears, 1);

    let outcome = engine
        .refresh(
            &RefreshPayload::with_list(raw_list(5)),
            &ProgressHandle::new(),
        )
        .await
        .unwrap();

    assert!(outcome.rebuilt);
    assert_eq!(engine.surface().clears, 2);
    assert_eq!(engine.surface().len(), 5);
}
