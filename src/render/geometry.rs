//! Geometry and paint primitives shared by nodes, canvases and backends.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in logical pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Rectangle with elliptical corners of radii `rx` / `ry`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RRect {
    pub rect: Rect,
    pub rx: f32,
    pub ry: f32,
}

impl RRect {
    /// Builds a rounded rect with the same radii on every corner.
    ///
    /// Negative radii are treated as zero. Radii larger than half the
    /// rectangle are scaled down proportionally so opposite corners never
    /// overlap.
    pub fn make_rect_xy(rect: Rect, rx: f32, ry: f32) -> Self {
        let mut rx = rx.max(0.0);
        let mut ry = ry.max(0.0);

        let w = rect.width.abs();
        let h = rect.height.abs();
        if rx > 0.0 && ry > 0.0 {
            let scale = (w / (rx * 2.0)).min(h / (ry * 2.0)).min(1.0);
            rx *= scale;
            ry *= scale;
        }
        if rx == 0.0 || ry == 0.0 {
            rx = 0.0;
            ry = 0.0;
        }

        Self { rect, rx, ry }
    }

    pub fn is_rect(&self) -> bool {
        self.rx == 0.0 && self.ry == 0.0
    }
}

/// RGBA color used for drawing commands.
///
/// Channels are represented as `f32` in the range `0.0 ..= 1.0`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);
    pub const RED: Color = Color::new(1.0, 0.0, 0.0, 1.0);
    pub const TRANSPARENT: Color = Color::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Color {
        Color { r, g, b, a }
    }

    /// Creates a new color from `u8` channel values in the range `0 ..= 255`.
    pub fn from_u8(r: u8, g: u8, b: u8, a: u8) -> Color {
        Color {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: a as f32 / 255.0,
        }
    }

    pub fn with_alpha(self, a: f32) -> Color {
        Color { a, ..self }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaintStyle {
    #[default]
    Fill,
    Stroke,
}

/// How a shape is filled or stroked.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Paint {
    pub color: Color,
    pub style: PaintStyle,
    pub stroke_width: f32,
    /// Extra opacity multiplied into the color alpha when drawing.
    pub alpha: f32,
}

impl Default for Paint {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            style: PaintStyle::Fill,
            stroke_width: 1.0,
            alpha: 1.0,
        }
    }
}

impl Paint {
    pub fn fill(color: Color) -> Self {
        Self {
            color,
            ..Self::default()
        }
    }

    /// Returns a copy with `opacity` multiplied in.
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.alpha = (self.alpha * opacity).clamp(0.0, 1.0);
        self
    }

    /// Color with the paint alpha applied.
    pub fn effective_color(&self) -> Color {
        self.color.with_alpha(self.color.a * self.alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rrect_radii_are_clamped_to_half_the_rect() {
        let rr = RRect::make_rect_xy(Rect::new(0.0, 0.0, 20.0, 10.0), 10.0, 10.0);
        assert_eq!(rr.rx, 5.0);
        assert_eq!(rr.ry, 5.0);
    }

    #[test]
    fn negative_radius_is_a_plain_rect() {
        let rr = RRect::make_rect_xy(Rect::new(0.0, 0.0, 20.0, 10.0), -3.0, 4.0);
        assert!(rr.is_rect());
    }

    #[test]
    fn opacity_multiplies() {
        let paint = Paint::fill(Color::RED).with_opacity(0.5).with_opacity(0.5);
        assert_eq!(paint.alpha, 0.25);
        assert_eq!(paint.effective_color().a, 0.25);
    }
}
