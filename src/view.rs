//! Views: the draw-loop scheduler and the surface adapter driving one scene.

use serde::{Deserialize, Serialize};

mod callback;
mod draw_view;
mod timing;

pub use callback::{DrawCallback, FrameInfo};
pub use draw_view::{DrawView, FrameStats};
pub use timing::{overlay_text, DurationRing, FrameTiming};

/// When frames are produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawingMode {
    /// One frame per redraw request.
    #[default]
    OnDemand,
    /// A frame on every display refresh until the loop is ended.
    Continuous,
}

impl DrawingMode {
    /// Parses the scripting-side names `"continuous"` and `"default"`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "continuous" => Some(DrawingMode::Continuous),
            "default" => Some(DrawingMode::OnDemand),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DrawingMode::OnDemand => "default",
            DrawingMode::Continuous => "continuous",
        }
    }
}
