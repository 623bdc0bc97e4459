//! Shared test doubles for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};

use markerlayer::marker::{MarkerId, RawMarker};
use markerlayer::surface::{
    HandleId, IconHandle, IconSpec, MarkerSurface, RenderTarget, SurfaceError,
};

/// In-memory marker surface recording every operation.
#[derive(Debug, Default)]
pub struct TestSurface {
    next: u64,
    pub markers: HashMap<HandleId, TestMarker>,
    pub open_popups: HashSet<HandleId>,
    pub creates: usize,
    pub removes: usize,
    pub clears: usize,
    pub icons_made: usize,
}

#[derive(Debug, Clone)]
pub struct TestMarker {
    pub id: MarkerId,
    pub lat: f64,
    pub lon: f64,
    pub popup: String,
    pub tooltip_visible: bool,
    pub target: RenderTarget,
}

impl TestSurface {
    pub fn by_id(&self, id: &str) -> Option<&TestMarker> {
        self.markers.values().find(|marker| marker.id.as_str() == id)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }
}

impl MarkerSurface for TestSurface {
    fn make_icon(&mut self, _spec: &IconSpec) -> Result<IconHandle, SurfaceError> {
        self.icons_made += 1;
        Ok(IconHandle(self.icons_made as u64))
    }

    fn create_marker(
        &mut self,
        id: &MarkerId,
        lat: f64,
        lon: f64,
        _icon: IconHandle,
        popup: &str,
        _tooltip: &str,
        target: RenderTarget,
    ) -> Result<HandleId, SurfaceError> {
        self.creates += 1;
        self.next += 1;
        let handle = HandleId(self.next);
        self.markers.insert(
            handle,
            TestMarker {
                id: id.clone(),
                lat,
                lon,
                popup: popup.to_string(),
                tooltip_visible: false,
                target,
            },
        );
        Ok(handle)
    }

    fn set_position(&mut self, handle: HandleId, lat: f64, lon: f64) -> Result<(), SurfaceError> {
        let marker = self
            .markers
            .get_mut(&handle)
            .ok_or(SurfaceError::UnknownHandle(handle))?;
        marker.lat = lat;
        marker.lon = lon;
        Ok(())
    }

    fn set_icon(&mut self, handle: HandleId, _icon: IconHandle) -> Result<(), SurfaceError> {
        self.markers
            .get_mut(&handle)
            .map(|_| ())
            .ok_or(SurfaceError::UnknownHandle(handle))
    }

    fn set_popup_content(&mut self, handle: HandleId, content: &str) -> Result<(), SurfaceError> {
        let marker = self
            .markers
            .get_mut(&handle)
            .ok_or(SurfaceError::UnknownHandle(handle))?;
        marker.popup = content.to_string();
        Ok(())
    }

    fn is_popup_open(&self, handle: HandleId) -> bool {
        self.open_popups.contains(&handle)
    }

    fn set_tooltip_visible(&mut self, handle: HandleId, visible: bool) -> Result<(), SurfaceError> {
        let marker = self
            .markers
            .get_mut(&handle)
            .ok_or(SurfaceError::UnknownHandle(handle))?;
        marker.tooltip_visible = visible;
        Ok(())
    }

    fn set_render_target(
        &mut self,
        handle: HandleId,
        target: RenderTarget,
    ) -> Result<(), SurfaceError> {
        let marker = self
            .markers
            .get_mut(&handle)
            .ok_or(SurfaceError::UnknownHandle(handle))?;
        marker.target = target;
        Ok(())
    }

    fn remove_marker(&mut self, handle: HandleId) -> Result<(), SurfaceError> {
        self.removes += 1;
        self.open_popups.remove(&handle);
        self.markers
            .remove(&handle)
            .map(|_| ())
            .ok_or(SurfaceError::UnknownHandle(handle))
    }

    fn clear(&mut self) -> Result<(), SurfaceError> {
        self.clears += 1;
        self.markers.clear();
        self.open_popups.clear();
        Ok(())
    }
}

/// Raw marker record with coordinates and a metric value.
pub fn raw(lat: f64, lon: f64, variant: f64) -> RawMarker {
    RawMarker {
        lat: Some(lat),
        lon: Some(lon),
        variant: Some(variant),
        ..RawMarker::default()
    }
}

/// A plain list of `count` spread-out markers.
pub fn raw_list(count: usize) -> Vec<RawMarker> {
    (0..count)
        .map(|i| raw(i as f64, (i as f64) * 0.5, 1.0))
        .collect()
}
