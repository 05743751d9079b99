use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;

use crate::dom::{DrawingContext, SharedScene};
use crate::render::Canvas;

/// Per-frame information handed to draw routines.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameInfo {
    /// Logical width (surface width divided by pixel density).
    pub width: f32,
    pub height: f32,
    /// `None` for on-demand frames.
    pub timestamp: Option<f64>,
    /// Seconds since the previous timed frame, 0 for the first one.
    pub delta: f64,
    /// `1 / delta`, only when `delta > 0`.
    pub fps: Option<f64>,
}

type DrawFn = dyn FnMut(&mut dyn Canvas, &FrameInfo) -> Result<()> + Send;

/// User draw routine. Clones share the same routine.
#[derive(Clone)]
pub struct DrawCallback {
    inner: Arc<Mutex<Box<DrawFn>>>,
}

impl DrawCallback {
    pub fn new(f: impl FnMut(&mut dyn Canvas, &FrameInfo) -> Result<()> + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(f))),
        }
    }

    /// Draw routine rendering `scene` on every frame.
    pub fn from_scene(scene: SharedScene) -> Self {
        Self::new(move |canvas, _info| {
            let mut root = scene.lock().unwrap_or_else(PoisonError::into_inner);
            root.render(&mut DrawingContext::new(canvas))
        })
    }

    pub fn invoke(&self, canvas: &mut dyn Canvas, info: &FrameInfo) -> Result<()> {
        // A panic in a previous frame poisons the lock, the routine itself is still usable
        let mut f = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        (*f)(canvas, info)
    }

    /// True when both handles share the same routine.
    pub fn same_as(&self, other: &DrawCallback) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for DrawCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DrawCallback({:p})", Arc::as_ptr(&self.inner))
    }
}
