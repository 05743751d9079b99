use std::sync::Arc;

use anyhow::Result;

use crate::dom::{
    DrawingContext, NodeBehavior, NodeCapability, NodeContext, NodeId, NodeKind, NodeState,
};
use crate::errors::NodeError;
use crate::props::{Dependencies, PropId, PropertyContainer, PropertyValue, PropsChange};

/// One element of the drawing tree.
pub struct SceneNode {
    id: NodeId,
    props: PropertyContainer,
    children: Vec<SceneNode>,
    behavior: Box<dyn NodeBehavior>,
    /// Read once from the behavior at construction.
    dependencies: Dependencies,
    state: NodeState,
    node_context: Option<NodeContext>,
}

impl SceneNode {
    pub fn new(kind: NodeKind) -> Self {
        Self::with_behavior(kind.behavior())
    }

    /// Creates a node driven by a custom behavior.
    pub fn with_behavior(behavior: Box<dyn NodeBehavior>) -> Self {
        Self {
            id: NodeId::new(),
            props: PropertyContainer::new(),
            children: Vec::new(),
            dependencies: behavior.dependencies(),
            behavior,
            state: NodeState::Constructed,
            node_context: None,
        }
    }

    /// Constructor entry point for the scripting layer. The first argument,
    /// when present and not null, must be an object holding the initial
    /// properties.
    pub fn from_args(kind: NodeKind, args: &[PropertyValue]) -> Result<Self, NodeError> {
        let mut node = Self::new(kind);
        match args.first() {
            None | Some(PropertyValue::Null) => {}
            Some(PropertyValue::Object(map)) => {
                node.set_properties(map.iter().map(|(k, v)| (k.as_str(), v.clone())))?;
            }
            Some(other) => {
                return Err(NodeError::InvalidArguments {
                    node: kind.name(),
                    got: other.type_name(),
                })
            }
        }
        Ok(node)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.behavior.kind()
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn props(&self) -> &PropertyContainer {
        &self.props
    }

    /// Context cached by the last render pass, drawable nodes only.
    pub fn node_context(&self) -> Option<&NodeContext> {
        self.node_context.as_ref()
    }

    /// Applies one property batch and notifies the behavior once.
    pub fn set_properties<K, V, I>(&mut self, batch: I) -> Result<PropsChange, NodeError>
    where
        K: Into<PropId>,
        V: Into<Arc<PropertyValue>>,
        I: IntoIterator<Item = (K, V)>,
    {
        let change = self.props.set_properties(batch)?;
        self.behavior.on_props_changed(&change);

        if change.touches(&self.dependencies) {
            self.state = NodeState::PropsPending;
        }
        Ok(change)
    }

    pub fn set_property(
        &mut self,
        name: impl Into<PropId>,
        value: impl Into<Arc<PropertyValue>>,
    ) -> Result<PropsChange, NodeError> {
        self.set_properties([(name.into(), value.into())])
    }

    pub fn children(&self) -> &[SceneNode] {
        &self.children
    }

    pub fn append_child(&mut self, child: SceneNode) -> Result<(), NodeError> {
        self.ensure_container()?;
        self.children.push(child);
        Ok(())
    }

    pub fn insert_child(&mut self, index: usize, child: SceneNode) -> Result<(), NodeError> {
        self.ensure_container()?;
        if index > self.children.len() {
            return Err(NodeError::ChildOutOfRange {
                index,
                len: self.children.len(),
            });
        }
        self.children.insert(index, child);
        Ok(())
    }

    /// Detaches and returns the child with the given id.
    pub fn remove_child(&mut self, id: NodeId) -> Option<SceneNode> {
        let index = self.children.iter().position(|c| c.id == id)?;
        Some(self.children.remove(index))
    }

    /// Swaps in a whole new child list, returning the old one.
    pub fn replace_children(&mut self, children: Vec<SceneNode>) -> Result<Vec<SceneNode>, NodeError> {
        if !children.is_empty() {
            self.ensure_container()?;
        }
        Ok(std::mem::replace(&mut self.children, children))
    }

    /// Depth-first search for `id` in this subtree.
    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    fn ensure_container(&self) -> Result<(), NodeError> {
        match self.behavior.capability() {
            NodeCapability::Container => Ok(()),
            NodeCapability::Drawable | NodeCapability::Declaration => {
                Err(NodeError::NotAContainer(self.kind().name()))
            }
        }
    }

    /// Runs one render pass over this subtree.
    pub fn render(&mut self, ctx: &mut DrawingContext<'_>) -> Result<()> {
        self.behavior.resolve(&self.props);
        if matches!(self.state, NodeState::Constructed | NodeState::PropsPending) {
            self.state = NodeState::PropsResolved;
        }

        match self.behavior.capability() {
            NodeCapability::Container => {
                self.behavior.render_children(ctx, &mut self.children)?;
            }
            NodeCapability::Drawable => {
                let context = NodeContext {
                    opacity: ctx.opacity,
                    paint: ctx.paint,
                };
                self.node_context = Some(context);
                self.behavior.draw(&mut *ctx.canvas, &context)?;
            }
            NodeCapability::Declaration => self.behavior.declare(ctx),
        }

        self.props.mark_read();
        self.state = NodeState::Drawn;
        Ok(())
    }
}

impl std::fmt::Debug for SceneNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneNode")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("state", &self.state)
            .field("children", &self.children.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::create_node;
    use crate::props::{names, Dependencies};
    use crate::render::{DisplayItem, Paint, RenderList};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn args(value: serde_json::Value) -> Vec<PropertyValue> {
        vec![PropertyValue::from(value)]
    }

    #[derive(Default)]
    struct CountingBehavior {
        notified: Arc<AtomicUsize>,
        dependency_reads: Arc<AtomicUsize>,
    }

    impl NodeBehavior for CountingBehavior {
        fn kind(&self) -> NodeKind {
            NodeKind::Group
        }
        fn capability(&self) -> NodeCapability {
            NodeCapability::Container
        }
        fn dependencies(&self) -> Dependencies {
            self.dependency_reads.fetch_add(1, Ordering::SeqCst);
            Dependencies::new().with("x")
        }
        fn on_props_changed(&mut self, _change: &PropsChange) {
            self.notified.fetch_add(1, Ordering::SeqCst);
        }
        fn resolve(&mut self, _props: &PropertyContainer) {}
    }

    #[test]
    fn batch_notifies_behavior_once() {
        let notified = Arc::new(AtomicUsize::new(0));
        let dependency_reads = Arc::new(AtomicUsize::new(0));
        let mut node = SceneNode::with_behavior(Box::new(CountingBehavior {
            notified: notified.clone(),
            dependency_reads: dependency_reads.clone(),
        }));

        node.set_properties([
            ("x", PropertyValue::from(1.0)),
            ("y", PropertyValue::from(2.0)),
            ("z", PropertyValue::from(3.0)),
        ])
        .unwrap();
        node.set_property("x", PropertyValue::from(4.0)).unwrap();

        assert_eq!(notified.load(Ordering::SeqCst), 2);
        assert_eq!(dependency_reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn state_follows_relevant_changes() {
        let mut node = SceneNode::with_behavior(Box::new(CountingBehavior::default()));
        assert_eq!(node.state(), NodeState::Constructed);

        let mut list = RenderList::new();
        node.render(&mut DrawingContext::new(&mut list)).unwrap();
        assert_eq!(node.state(), NodeState::Drawn);

        node.set_property("y", PropertyValue::from(1.0)).unwrap();
        assert_eq!(node.state(), NodeState::Drawn);

        node.set_property("x", PropertyValue::from(1.0)).unwrap();
        assert_eq!(node.state(), NodeState::PropsPending);

        node.render(&mut DrawingContext::new(&mut list)).unwrap();
        assert_eq!(node.state(), NodeState::Drawn);
    }

    #[test]
    fn first_argument_must_be_an_object() {
        let err = SceneNode::from_args(NodeKind::Rect, &[PropertyValue::from(3.0)]).unwrap_err();
        assert_eq!(
            err,
            NodeError::InvalidArguments {
                node: "skRect",
                got: "number"
            }
        );

        assert!(SceneNode::from_args(NodeKind::Rect, &[]).is_ok());
        assert!(SceneNode::from_args(NodeKind::Rect, &[PropertyValue::Null]).is_ok());
    }

    #[test]
    fn constructor_args_become_initial_props() {
        let node = create_node("RectNode", &args(json!({ "x": 1, "width": 4 }))).unwrap();
        assert_eq!(node.kind(), NodeKind::Rect);
        assert_eq!(node.state(), NodeState::PropsPending);
        assert_eq!(node.props().number(names::WIDTH), Some(4.0));
        assert!(matches!(
            create_node("CircleNode", &[]),
            Err(NodeError::UnknownNode(_))
        ));
    }

    #[test]
    fn drawables_reject_children() {
        let mut rect = SceneNode::new(NodeKind::Rect);
        let err = rect.append_child(SceneNode::new(NodeKind::Rect)).unwrap_err();
        assert_eq!(err, NodeError::NotAContainer("skRect"));
        assert!(rect.replace_children(Vec::new()).is_ok());
    }

    #[test]
    fn group_paints_children_in_order_with_opacity() {
        let mut group =
            create_node("GroupNode", &args(json!({ "opacity": 0.5 }))).unwrap();
        let first = create_node(
            "RectNode",
            &args(json!({ "x": 0, "y": 0, "width": 10, "height": 10, "color": "red" })),
        )
        .unwrap();
        let second = create_node(
            "RRectNode",
            &args(json!({ "x": 5, "y": 5, "width": 10, "height": 10, "r": 2 })),
        )
        .unwrap();
        let first_id = first.id();

        group.append_child(first).unwrap();
        group.append_child(second).unwrap();

        let mut list = RenderList::new();
        group.render(&mut DrawingContext::new(&mut list)).unwrap();

        let items: Vec<&DisplayItem> = list.draw_items().collect();
        assert_eq!(items.len(), 2);
        match items[0] {
            DisplayItem::Rect { paint, .. } => assert_eq!(paint.alpha, 0.5),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(items[1], DisplayItem::RRect { .. }));

        let rendered = group.find_mut(first_id).unwrap();
        assert_eq!(
            rendered.node_context(),
            Some(&NodeContext {
                opacity: 0.5,
                paint: Paint::default(),
            })
        );
    }

    #[test]
    fn insert_and_remove_children() {
        let mut group = SceneNode::new(NodeKind::Group);
        let a = SceneNode::new(NodeKind::Rect);
        let b = SceneNode::new(NodeKind::Rect);
        let (a_id, b_id) = (a.id(), b.id());

        group.append_child(a).unwrap();
        group.insert_child(0, b).unwrap();
        assert_eq!(group.children()[0].id(), b_id);
        assert!(matches!(
            group.insert_child(5, SceneNode::new(NodeKind::Rect)),
            Err(NodeError::ChildOutOfRange { index: 5, len: 2 })
        ));

        assert_eq!(group.remove_child(a_id).map(|n| n.id()), Some(a_id));
        assert!(group.remove_child(a_id).is_none());
        assert_eq!(group.children().len(), 1);
    }

    #[test]
    fn rect_without_geometry_draws_nothing() {
        let mut rect = create_node("RectNode", &args(json!({ "x": 1 }))).unwrap();
        let mut list = RenderList::new();
        rect.render(&mut DrawingContext::new(&mut list)).unwrap();
        assert_eq!(list.draw_items().count(), 0);
    }
}
