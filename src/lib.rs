//! Retained-mode 2D scene graph with identity-based change tracking and a
//! per-view draw loop.
//!
//! Scripting code builds a tree of [`dom::SceneNode`]s and updates their
//! properties in batches. Nodes memoize derived values (rects, paints) and
//! only recompute them when a dependency's value identity changed. A
//! [`view::DrawView`] renders the tree into a [`render::RenderTarget`],
//! either on demand or on every display refresh, with all drawing
//! scheduled on the platform's script thread.

pub mod config;
pub mod dependency;
pub mod dom;
pub mod errors;
pub mod ffi;
pub mod platform;
pub mod props;
pub mod registry;
pub mod render;
pub mod values;
pub mod view;

pub use config::{PlatformConfig, ViewConfig};
pub use dom::{create_node, NodeKind, SceneNode};
pub use errors::{NodeError, PropertyError, ViewError};
pub use platform::{ErrorReporter, LogReporter, ManualPlatform, PlatformContext, TokioPlatform};
pub use props::{PropertyContainer, PropertyValue};
pub use registry::{ViewApi, ViewId, ViewRegistry};
pub use values::SharedValue;
pub use view::{DrawCallback, DrawView, DrawingMode, FrameInfo};
