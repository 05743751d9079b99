//! Rectangle and rounded-rectangle derived properties.
//!
//! Both shapes can be given either as one named property (a host object or
//! a plain object with the geometry fields) or as separate `x`, `y`,
//! `width`, `height` (and `r`) properties on the node itself. The composite
//! `*Props` derives prefer the named form.

use crate::props::names::{HEIGHT, R, RX, RY, WIDTH, X, Y};
use crate::props::{Dependencies, Derive, DerivedProperty, PropId, PropertyContainer, PropertyValue};
use crate::render::{RRect, Rect};

fn rect_from_object(value: &PropertyValue) -> Option<Rect> {
    Some(Rect::new(
        value.number_field(X)? as f32,
        value.number_field(Y)? as f32,
        value.number_field(WIDTH)? as f32,
        value.number_field(HEIGHT)? as f32,
    ))
}

/// Rect read from the property `name`: a host [`Rect`] or an object with
/// `x`, `y`, `width` and `height`.
#[derive(Clone, Debug)]
pub struct RectProp(pub PropId);

impl RectProp {
    pub fn new(name: impl Into<PropId>) -> Self {
        Self(name.into())
    }
}

impl Derive for RectProp {
    type Output = Rect;

    fn dependencies(&self) -> Dependencies {
        Dependencies::new().with(&self.0)
    }

    fn derive(&mut self, props: &PropertyContainer) -> Option<Rect> {
        let value = props.value(self.0.as_str())?;
        match value {
            PropertyValue::Host(host) => host.downcast_ref::<Rect>().copied(),
            PropertyValue::Object(_) => rect_from_object(value),
            _ => None,
        }
    }
}

/// Rect assembled from the node's own `x`, `y`, `width`, `height`.
#[derive(Clone, Debug, Default)]
pub struct RectPropFromProps;

impl Derive for RectPropFromProps {
    type Output = Rect;

    fn dependencies(&self) -> Dependencies {
        [X, Y, WIDTH, HEIGHT].into_iter().collect()
    }

    fn derive(&mut self, props: &PropertyContainer) -> Option<Rect> {
        Some(Rect::new(
            props.number(X)? as f32,
            props.number(Y)? as f32,
            props.number(WIDTH)? as f32,
            props.number(HEIGHT)? as f32,
        ))
    }
}

/// [`RectProp`] if it has a value, else [`RectPropFromProps`].
pub struct RectProps {
    explicit: DerivedProperty<RectProp>,
    from_props: DerivedProperty<RectPropFromProps>,
}

impl RectProps {
    pub fn new(name: impl Into<PropId>) -> Self {
        Self {
            explicit: DerivedProperty::new(RectProp::new(name)),
            from_props: DerivedProperty::new(RectPropFromProps),
        }
    }
}

impl Derive for RectProps {
    type Output = Rect;

    fn dependencies(&self) -> Dependencies {
        let mut deps = self.explicit.dependencies().clone();
        deps.extend(self.from_props.dependencies());
        deps
    }

    fn derive(&mut self, props: &PropertyContainer) -> Option<Rect> {
        if let Some(rect) = self.explicit.resolve(props) {
            return Some(*rect);
        }
        self.from_props.resolve(props).copied()
    }
}

/// Rounded rect read from the property `name`: a host [`RRect`] or an
/// object carrying all of `x`, `y`, `width`, `height`, `rx`, `ry`.
#[derive(Clone, Debug)]
pub struct RRectProp(pub PropId);

impl RRectProp {
    pub fn new(name: impl Into<PropId>) -> Self {
        Self(name.into())
    }
}

impl Derive for RRectProp {
    type Output = RRect;

    fn dependencies(&self) -> Dependencies {
        Dependencies::new().with(&self.0)
    }

    fn derive(&mut self, props: &PropertyContainer) -> Option<RRect> {
        let value = props.value(self.0.as_str())?;
        match value {
            PropertyValue::Host(host) => host
                .downcast_ref::<RRect>()
                .map(|rr| RRect::make_rect_xy(rr.rect, rr.rx, rr.ry)),
            PropertyValue::Object(_) => {
                let rect = rect_from_object(value)?;
                let rx = value.number_field(RX)? as f32;
                let ry = value.number_field(RY)? as f32;
                Some(RRect::make_rect_xy(rect, rx, ry))
            }
            _ => None,
        }
    }
}

/// Rounded rect from the node's own `x`, `y`, `width`, `height` and a
/// uniform radius `r`.
#[derive(Clone, Debug, Default)]
pub struct RRectPropFromProps;

impl Derive for RRectPropFromProps {
    type Output = RRect;

    fn dependencies(&self) -> Dependencies {
        [X, Y, WIDTH, HEIGHT, R].into_iter().collect()
    }

    fn derive(&mut self, props: &PropertyContainer) -> Option<RRect> {
        let rect = RectPropFromProps.derive(props)?;
        let r = props.number(R)? as f32;
        Some(RRect::make_rect_xy(rect, r, r))
    }
}

/// [`RRectProp`] if it has a value, else [`RRectPropFromProps`], else none.
pub struct RRectProps {
    explicit: DerivedProperty<RRectProp>,
    from_props: DerivedProperty<RRectPropFromProps>,
}

impl RRectProps {
    pub fn new(name: impl Into<PropId>) -> Self {
        Self {
            explicit: DerivedProperty::new(RRectProp::new(name)),
            from_props: DerivedProperty::new(RRectPropFromProps),
        }
    }
}

impl Derive for RRectProps {
    type Output = RRect;

    fn dependencies(&self) -> Dependencies {
        let mut deps = self.explicit.dependencies().clone();
        deps.extend(self.from_props.dependencies());
        deps
    }

    fn derive(&mut self, props: &PropertyContainer) -> Option<RRect> {
        if let Some(rrect) = self.explicit.resolve(props) {
            return Some(*rrect);
        }
        self.from_props.resolve(props).copied()
    }
}
