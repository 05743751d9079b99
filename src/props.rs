//! Property system: loosely-typed values coming from the scripting layer and
//! the cached, strongly-typed values derived from them.
//!
//! - [`PropertyValue`]: the closed tagged variant crossing the scripting boundary.
//! - [`NodeProperty`] / [`PropertyContainer`]: named slots on a node, updated in
//!   atomic batches, with change tracking based on value identity.
//! - [`DerivedProperty`]: a memoized value computed from a declared set of
//!   [`Dependencies`]. Recomputed only when one of them changed.
//!
//! Variants never leak past this layer: drawing code only sees the derived
//! outputs (`Rect`, `RRect`, `Paint`, ...).

use std::borrow::Borrow;
use std::fmt::{Debug, Display};
use std::sync::Arc;

mod container;
mod derived;
mod paint;
mod rect;
mod value;

pub use container::{NodeProperty, PropertyContainer, PropsChange};
pub use derived::{Dependencies, Derive, DerivedProperty, NumberProp};
pub use paint::{parse_color, PaintProp, PaintProps};
pub use rect::{RRectProp, RRectPropFromProps, RRectProps, RectProp, RectPropFromProps, RectProps};
pub use value::{HostHandle, PropertyValue};

/// Well-known property names.
pub mod names {
    pub const X: &str = "x";
    pub const Y: &str = "y";
    pub const WIDTH: &str = "width";
    pub const HEIGHT: &str = "height";
    pub const R: &str = "r";
    pub const RX: &str = "rx";
    pub const RY: &str = "ry";
    pub const RECT: &str = "rect";
    pub const COLOR: &str = "color";
    pub const STYLE: &str = "style";
    pub const STROKE_WIDTH: &str = "strokeWidth";
    pub const OPACITY: &str = "opacity";
    pub const PAINT: &str = "paint";

    pub const DRAW_CALLBACK: &str = "drawCallback";
    pub const MODE: &str = "mode";
    pub const DEBUG: &str = "debug";
}

/// Interned property name. Cloning is a reference count bump.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropId(Arc<str>);

impl PropId {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PropId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PropId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for PropId {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl From<&PropId> for PropId {
    fn from(name: &PropId) -> Self {
        name.clone()
    }
}

impl Display for PropId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Debug for PropId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PropId({})", &self.0)
    }
}
