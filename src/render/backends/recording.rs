use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;

use crate::props::PropertyValue;
use crate::render::{Canvas, RenderBackend, RenderList, RenderTarget, SurfaceSize};

/// Backend whose targets record display items instead of rasterizing.
#[derive(Clone, Debug, Default)]
pub struct RecordingBackend;

impl RecordingBackend {
    pub fn new() -> Self {
        Self
    }
}

impl RenderBackend for RecordingBackend {
    fn name(&self) -> &str {
        "RecordingBackend"
    }

    fn create_target(&self, size: SurfaceSize) -> Result<Box<dyn RenderTarget>> {
        Ok(Box::new(RecordingSurface::new(size)))
    }
}

#[derive(Debug, Default)]
struct Presented {
    count: u64,
    last: Option<RenderList>,
}

/// Read handle on the frames a [`RecordingSurface`] presented. Stays valid
/// after the surface itself moved into a view.
#[derive(Clone, Debug, Default)]
pub struct PresentedFrames {
    inner: Arc<Mutex<Presented>>,
}

impl PresentedFrames {
    pub fn count(&self) -> u64 {
        self.lock().count
    }

    /// Display list of the most recent presented frame.
    pub fn last(&self) -> Option<RenderList> {
        self.lock().last.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Presented> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct RecordingSurface {
    /// Size of the surface in pixels.
    size: SurfaceSize,
    /// Frame ID for the surface, used to track rendering frames.
    frame_id: u64,
    current: RenderList,
    presented: PresentedFrames,
}

impl RecordingSurface {
    pub fn new(size: SurfaceSize) -> Self {
        Self {
            size,
            frame_id: 0,
            current: RenderList::new(),
            presented: PresentedFrames::default(),
        }
    }

    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    pub fn presented(&self) -> PresentedFrames {
        self.presented.clone()
    }
}

impl RenderTarget for RecordingSurface {
    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn canvas(&mut self) -> &mut dyn Canvas {
        &mut self.current
    }

    fn present(&mut self) -> Result<()> {
        let frame = std::mem::take(&mut self.current);
        self.frame_id = self.frame_id.wrapping_add(1);

        let mut presented = self.presented.lock();
        presented.count += 1;
        presented.last = Some(frame);
        Ok(())
    }

    fn discard(&mut self) {
        self.current.reset();
    }

    fn snapshot(&mut self) -> Option<PropertyValue> {
        self.presented.last().map(PropertyValue::host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{Color, DisplayItem};

    #[test]
    fn present_moves_the_frame() {
        let mut surface = RecordingSurface::new(SurfaceSize::new(100, 50));
        let frames = surface.presented();

        surface.canvas().clear(Color::WHITE).unwrap();
        surface.present().unwrap();

        assert_eq!(frames.count(), 1);
        assert_eq!(surface.frame_id(), 1);
        assert_eq!(
            frames.last().unwrap().items,
            vec![DisplayItem::Clear { color: Color::WHITE }]
        );
    }

    #[test]
    fn discard_drops_the_partial_frame() {
        let mut surface = RecordingSurface::new(SurfaceSize::new(10, 10));
        surface.canvas().clear(Color::WHITE).unwrap();
        surface.discard();
        surface.present().unwrap();

        assert!(surface.presented().last().unwrap().items.is_empty());
    }

    #[test]
    fn snapshot_wraps_the_last_frame() {
        let backend = RecordingBackend::new();
        let mut target = backend.create_target(SurfaceSize::new(10, 10)).unwrap();
        assert!(target.snapshot().is_none());

        target.present().unwrap();
        let snap = target.snapshot().unwrap();
        assert!(snap.downcast_host::<RenderList>().is_some());
    }
}
