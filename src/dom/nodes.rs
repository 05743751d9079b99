use anyhow::Result;

use crate::dom::{DrawingContext, NodeBehavior, NodeCapability, NodeContext, NodeKind, SceneNode};
use crate::props::names::{OPACITY, PAINT, RECT};
use crate::props::{
    Dependencies, DerivedProperty, NumberProp, PaintProp, PaintProps, PropertyContainer, RRectProps,
    RectProps,
};
use crate::render::{Canvas, Paint};

/// Renders its children in order. An `opacity` property multiplies into
/// the inherited opacity. Paint declared by a child lasts until the end of
/// the group.
pub struct GroupNode {
    opacity: DerivedProperty<NumberProp>,
}

impl GroupNode {
    pub fn new() -> Self {
        Self {
            opacity: DerivedProperty::new(NumberProp::new(OPACITY)),
        }
    }
}

impl Default for GroupNode {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeBehavior for GroupNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Group
    }

    fn capability(&self) -> NodeCapability {
        NodeCapability::Container
    }

    fn dependencies(&self) -> Dependencies {
        self.opacity.dependencies().clone()
    }

    fn resolve(&mut self, props: &PropertyContainer) {
        self.opacity.resolve(props);
    }

    fn render_children(&mut self, ctx: &mut DrawingContext<'_>, children: &mut [SceneNode]) -> Result<()> {
        let (inherited, inherited_paint) = (ctx.opacity, ctx.paint);
        if let Some(opacity) = self.opacity.value() {
            ctx.opacity = (inherited * *opacity as f32).clamp(0.0, 1.0);
        }

        let result = children.iter_mut().try_for_each(|child| child.render(ctx));
        ctx.opacity = inherited;
        ctx.paint = inherited_paint;
        result
    }
}

/// Paint of a drawing node: an explicit `paint` value, else its own paint
/// fields, else the ambient paint.
struct NodePaint {
    explicit: DerivedProperty<PaintProp>,
    fields: DerivedProperty<PaintProps>,
}

impl NodePaint {
    fn new() -> Self {
        Self {
            explicit: DerivedProperty::new(PaintProp::new(PAINT)),
            fields: DerivedProperty::new(PaintProps),
        }
    }

    fn dependencies(&self) -> Dependencies {
        let mut deps = self.explicit.dependencies().clone();
        deps.extend(self.fields.dependencies());
        deps
    }

    fn resolve(&mut self, props: &PropertyContainer) {
        self.explicit.resolve(props);
        self.fields.resolve(props);
    }

    fn paint(&self, context: &NodeContext) -> Paint {
        self.explicit
            .value()
            .or(self.fields.value())
            .copied()
            .unwrap_or(context.paint)
            .with_opacity(context.opacity)
    }
}

/// Declares the paint used by the drawing nodes after it in the same group.
///
/// Reads `color`, `style`, `strokeWidth` and `opacity`; unset fields keep
/// their defaults.
pub struct PaintNode {
    paint: DerivedProperty<PaintProps>,
}

impl PaintNode {
    pub fn new() -> Self {
        Self {
            paint: DerivedProperty::new(PaintProps),
        }
    }

    pub fn materialize(&self) -> Paint {
        self.paint.value().copied().unwrap_or_default()
    }
}

impl Default for PaintNode {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeBehavior for PaintNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Paint
    }

    fn capability(&self) -> NodeCapability {
        NodeCapability::Declaration
    }

    fn dependencies(&self) -> Dependencies {
        self.paint.dependencies().clone()
    }

    fn resolve(&mut self, props: &PropertyContainer) {
        self.paint.resolve(props);
    }

    fn declare(&mut self, ctx: &mut DrawingContext<'_>) {
        ctx.paint = self.materialize();
    }
}

/// Draws a rect from `rect` or from `x`, `y`, `width`, `height`.
pub struct RectNode {
    rect: DerivedProperty<RectProps>,
    paint: NodePaint,
}

impl RectNode {
    pub fn new() -> Self {
        Self {
            rect: DerivedProperty::new(RectProps::new(RECT)),
            paint: NodePaint::new(),
        }
    }
}

impl Default for RectNode {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeBehavior for RectNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Rect
    }

    fn capability(&self) -> NodeCapability {
        NodeCapability::Drawable
    }

    fn dependencies(&self) -> Dependencies {
        let mut deps = self.rect.dependencies().clone();
        deps.extend(&self.paint.dependencies());
        deps
    }

    fn resolve(&mut self, props: &PropertyContainer) {
        self.rect.resolve(props);
        self.paint.resolve(props);
    }

    fn draw(&mut self, canvas: &mut dyn Canvas, context: &NodeContext) -> Result<()> {
        let Some(rect) = self.rect.value() else {
            return Ok(());
        };
        canvas.draw_rect(rect, &self.paint.paint(context))
    }
}

/// Draws a rounded rect from `rect` or from `x`, `y`, `width`, `height`, `r`.
pub struct RRectNode {
    rrect: DerivedProperty<RRectProps>,
    paint: NodePaint,
}

impl RRectNode {
    pub fn new() -> Self {
        Self {
            rrect: DerivedProperty::new(RRectProps::new(RECT)),
            paint: NodePaint::new(),
        }
    }
}

impl Default for RRectNode {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeBehavior for RRectNode {
    fn kind(&self) -> NodeKind {
        NodeKind::RRect
    }

    fn capability(&self) -> NodeCapability {
        NodeCapability::Drawable
    }

    fn dependencies(&self) -> Dependencies {
        let mut deps = self.rrect.dependencies().clone();
        deps.extend(&self.paint.dependencies());
        deps
    }

    fn resolve(&mut self, props: &PropertyContainer) {
        self.rrect.resolve(props);
        self.paint.resolve(props);
    }

    fn draw(&mut self, canvas: &mut dyn Canvas, context: &NodeContext) -> Result<()> {
        let Some(rrect) = self.rrect.value() else {
            return Ok(());
        };
        canvas.draw_rrect(rrect, &self.paint.paint(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::PropertyValue;
    use crate::render::{DisplayItem, RenderList};

    #[test]
    fn nested_groups_multiply_opacity() {
        let mut outer = SceneNode::new(NodeKind::Group);
        outer.set_property(OPACITY, PropertyValue::from(0.5)).unwrap();
        let mut inner = SceneNode::new(NodeKind::Group);
        inner.set_property(OPACITY, PropertyValue::from(0.5)).unwrap();

        let mut rect = SceneNode::new(NodeKind::Rect);
        rect.set_property(
            RECT,
            PropertyValue::host(crate::render::Rect::new(0.0, 0.0, 1.0, 1.0)),
        )
        .unwrap();

        inner.append_child(rect).unwrap();
        outer.append_child(inner).unwrap();

        let mut list = RenderList::new();
        let mut ctx = DrawingContext::new(&mut list);
        outer.render(&mut ctx).unwrap();
        assert_eq!(ctx.opacity, 1.0);

        match list.draw_items().next() {
            Some(DisplayItem::Rect { paint, .. }) => assert_eq!(paint.alpha, 0.25),
            other => panic!("unexpected {other:?}"),
        };
    }

    fn rect_node(props: Vec<(&str, PropertyValue)>) -> SceneNode {
        let mut node = SceneNode::new(NodeKind::Rect);
        node.set_properties(
            [
                ("x", PropertyValue::from(0.0)),
                ("y", PropertyValue::from(0.0)),
                ("width", PropertyValue::from(4.0)),
                ("height", PropertyValue::from(4.0)),
            ]
            .into_iter()
            .chain(props),
        )
        .unwrap();
        node
    }

    fn drawn_paints(list: &RenderList) -> Vec<Paint> {
        list.draw_items()
            .filter_map(|item| match item {
                DisplayItem::Rect { paint, .. } => Some(*paint),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn paint_node_sets_the_ambient_paint_for_later_siblings() {
        let mut paint = SceneNode::new(NodeKind::Paint);
        paint
            .set_properties([
                ("color", PropertyValue::from("red")),
                ("style", PropertyValue::from("stroke")),
            ])
            .unwrap();

        let mut inner = SceneNode::new(NodeKind::Group);
        inner.append_child(rect_node(vec![])).unwrap();
        inner.append_child(paint).unwrap();
        inner.append_child(rect_node(vec![])).unwrap();

        let mut outer = SceneNode::new(NodeKind::Group);
        outer.append_child(inner).unwrap();
        outer.append_child(rect_node(vec![])).unwrap();

        let mut list = RenderList::new();
        let mut ctx = DrawingContext::new(&mut list);
        outer.render(&mut ctx).unwrap();
        assert_eq!(ctx.paint, Paint::default());

        let stroked = Paint {
            style: crate::render::PaintStyle::Stroke,
            ..Paint::fill(crate::render::Color::RED)
        };
        assert_eq!(drawn_paints(&list), vec![Paint::default(), stroked, Paint::default()]);
    }

    #[test]
    fn own_paint_wins_over_the_ambient_paint() {
        let blue = Paint::fill(crate::render::Color::from_u8(0, 0, 255, 255));
        let mut group = SceneNode::new(NodeKind::Group);
        group.set_property(OPACITY, PropertyValue::from(0.5)).unwrap();

        let mut paint = SceneNode::new(NodeKind::Paint);
        paint.set_property("color", PropertyValue::from("white")).unwrap();
        group.append_child(paint).unwrap();
        group
            .append_child(rect_node(vec![
                (PAINT, PropertyValue::host(blue)),
                ("color", PropertyValue::from("red")),
            ]))
            .unwrap();
        group
            .append_child(rect_node(vec![("color", PropertyValue::from("red"))]))
            .unwrap();
        group.append_child(rect_node(vec![])).unwrap();

        let mut list = RenderList::new();
        group.render(&mut DrawingContext::new(&mut list)).unwrap();

        let paints = drawn_paints(&list);
        assert_eq!(paints[0], blue.with_opacity(0.5));
        assert_eq!(paints[1], Paint::fill(crate::render::Color::RED).with_opacity(0.5));
        assert_eq!(paints[2], Paint::fill(crate::render::Color::WHITE).with_opacity(0.5));
    }

    #[test]
    fn paint_nodes_take_no_children_and_draw_nothing() {
        let mut paint = crate::dom::create_node("PaintNode", &[]).unwrap();
        assert_eq!(paint.kind(), NodeKind::Paint);
        assert!(paint.append_child(SceneNode::new(NodeKind::Rect)).is_err());

        let mut list = RenderList::new();
        paint.render(&mut DrawingContext::new(&mut list)).unwrap();
        assert_eq!(list.draw_items().count(), 0);
        assert!(paint.node_context().is_none());
    }

    #[test]
    fn unchanged_props_are_not_recomputed_between_frames() {
        let mut behavior = RRectNode::new();
        let mut props = PropertyContainer::new();
        props
            .set_properties([
                ("x", PropertyValue::from(0.0)),
                ("y", PropertyValue::from(0.0)),
                ("width", PropertyValue::from(10.0)),
                ("height", PropertyValue::from(10.0)),
                ("r", PropertyValue::from(2.0)),
            ])
            .unwrap();

        for _ in 0..3 {
            behavior.resolve(&props);
        }
        assert_eq!(behavior.rrect.recomputations(), 1);
        assert_eq!(behavior.paint.fields.recomputations(), 1);
        assert_eq!(behavior.paint.explicit.recomputations(), 1);
    }
}
