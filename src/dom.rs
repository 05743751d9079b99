//! Scene node tree.
//!
//! A [`SceneNode`] owns its properties and its children. What a node does
//! with them is decided by the [`NodeBehavior`] chosen from its
//! [`NodeKind`] at construction time.

use std::fmt::Display;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use uuid::Uuid;

use crate::errors::NodeError;
use crate::props::{Dependencies, PropertyContainer, PropertyValue, PropsChange};
use crate::render::{Canvas, Paint};

mod node;
mod nodes;

pub use node::SceneNode;
pub use nodes::{GroupNode, PaintNode, RRectNode, RectNode};

/// Root of a tree shared between the script side and a view's draw callback.
pub type SharedScene = Arc<Mutex<SceneNode>>;

/// Stable identity of a node across redraws.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Group,
    Rect,
    RRect,
    Paint,
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Group => "skGroup",
            NodeKind::Rect => "skRect",
            NodeKind::RRect => "skRRect",
            NodeKind::Paint => "skPaint",
        }
    }

    /// Looks up a kind by its type name or its constructor name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "skGroup" | "GroupNode" => Some(NodeKind::Group),
            "skRect" | "RectNode" => Some(NodeKind::Rect),
            "skRRect" | "RRectNode" => Some(NodeKind::RRect),
            "skPaint" | "PaintNode" => Some(NodeKind::Paint),
            _ => None,
        }
    }

    fn behavior(&self) -> Box<dyn NodeBehavior> {
        match self {
            NodeKind::Group => Box::new(GroupNode::new()),
            NodeKind::Rect => Box::new(RectNode::new()),
            NodeKind::RRect => Box::new(RRectNode::new()),
            NodeKind::Paint => Box::new(PaintNode::new()),
        }
    }
}

/// Whether a node renders children, draws itself, or only contributes
/// ambient state to the nodes drawn after it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeCapability {
    Container,
    Drawable,
    Declaration,
}

/// Lifecycle of a node as seen by the render pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeState {
    Constructed,
    /// Properties changed since derived values were last resolved.
    PropsPending,
    PropsResolved,
    /// At least one render pass completed with the current derived values.
    Drawn,
}

/// Ambient state passed down the tree during one render pass.
pub struct DrawingContext<'a> {
    pub canvas: &'a mut dyn Canvas,
    /// Accumulated opacity of all enclosing groups.
    pub opacity: f32,
    /// Paint used by drawing nodes that carry no paint of their own. Set by
    /// paint nodes, scoped to the enclosing group.
    pub paint: Paint,
}

impl<'a> DrawingContext<'a> {
    pub fn new(canvas: &'a mut dyn Canvas) -> Self {
        Self {
            canvas,
            opacity: 1.0,
            paint: Paint::default(),
        }
    }
}

/// Per-node copy of the ambient context, refreshed on every pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeContext {
    pub opacity: f32,
    pub paint: Paint,
}

/// Kind-specific part of a node.
pub trait NodeBehavior: Send {
    fn kind(&self) -> NodeKind;

    fn capability(&self) -> NodeCapability;

    /// Every property name read by this node's derived properties.
    fn dependencies(&self) -> Dependencies;

    /// Called once per applied property batch.
    fn on_props_changed(&mut self, _change: &PropsChange) {}

    /// Brings derived properties up to date.
    fn resolve(&mut self, props: &PropertyContainer);

    /// Container nodes: renders `children` in order.
    fn render_children(
        &mut self,
        ctx: &mut DrawingContext<'_>,
        children: &mut [SceneNode],
    ) -> Result<()> {
        for child in children {
            child.render(ctx)?;
        }
        Ok(())
    }

    /// Drawable nodes: issues the drawing commands.
    fn draw(&mut self, _canvas: &mut dyn Canvas, _context: &NodeContext) -> Result<()> {
        Ok(())
    }

    /// Declaration nodes: updates the ambient context.
    fn declare(&mut self, _ctx: &mut DrawingContext<'_>) {}
}

/// Creates a node from a constructor name and its argument list.
///
/// Accepts the `skGroup` / `skRect` / `skRRect` / `skPaint` type names as
/// well as the `GroupNode` / `RectNode` / `RRectNode` / `PaintNode`
/// constructor names.
pub fn create_node(name: &str, args: &[PropertyValue]) -> Result<SceneNode, NodeError> {
    let kind = NodeKind::from_name(name).ok_or_else(|| NodeError::UnknownNode(name.to_string()))?;
    SceneNode::from_args(kind, args)
}
