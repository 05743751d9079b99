use anyhow::Result;

use crate::props::PropertyValue;
use crate::render::{Paint, RRect, Rect};

/// Size of a surface in pixels. It's a simple struct to hold width and height.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Immediate-mode drawing interface handed to draw routines.
pub trait Canvas {
    fn save(&mut self) -> Result<()>;
    fn restore(&mut self) -> Result<()>;
    fn scale(&mut self, sx: f32, sy: f32) -> Result<()>;
    fn clear(&mut self, color: crate::render::Color) -> Result<()>;
    fn draw_rect(&mut self, rect: &Rect, paint: &Paint) -> Result<()>;
    fn draw_rrect(&mut self, rrect: &RRect, paint: &Paint) -> Result<()>;
    fn draw_text(&mut self, text: &str, x: f32, y: f32, size: f32, paint: &Paint) -> Result<()>;

    /// Pushes pending commands to the underlying surface.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A surface a view draws its frames into.
pub trait RenderTarget: Send {
    /// Size in physical pixels.
    fn size(&self) -> SurfaceSize;

    /// Canvas for the frame currently being drawn.
    fn canvas(&mut self) -> &mut dyn Canvas;

    /// Finishes the current frame and makes it visible.
    fn present(&mut self) -> Result<()>;

    /// Drops whatever was drawn since the last `present`.
    fn discard(&mut self) {}

    /// Snapshot of the last presented frame, if the target supports it.
    fn snapshot(&mut self) -> Option<PropertyValue> {
        None
    }
}

/// Creates render targets. Calls occur on the backend's owning thread.
pub trait RenderBackend {
    fn name(&self) -> &str;

    fn create_target(&self, size: SurfaceSize) -> Result<Box<dyn RenderTarget>>;
}
