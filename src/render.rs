mod canvas;
mod geometry;
mod render_list;

pub use canvas::{Canvas, RenderBackend, RenderTarget, SurfaceSize};
pub use geometry::{Color, Paint, PaintStyle, RRect, Rect};
pub use render_list::{DisplayItem, RenderList};

/// Rendering backends.
pub mod backends {
    /// Cairo rendering backend
    #[cfg(feature = "backend_cairo")]
    pub mod cairo;
    pub mod recording;
}

pub use backends::recording::{PresentedFrames, RecordingBackend, RecordingSurface};
