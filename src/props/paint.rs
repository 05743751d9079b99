use crate::props::names::{COLOR, OPACITY, STROKE_WIDTH, STYLE};
use crate::props::{Dependencies, Derive, PropId, PropertyContainer, PropertyValue};
use crate::render::{Color, Paint, PaintStyle};

/// Parses `#RGB`, `#RRGGBB`, `#RRGGBBAA`, a handful of named colors, or a
/// `[r, g, b, a]` array of floats in `0.0 ..= 1.0`.
pub fn parse_color(value: &PropertyValue) -> Option<Color> {
    match value {
        PropertyValue::String(s) => parse_color_str(s),
        PropertyValue::Array(items) if items.len() == 4 => {
            let mut ch = [0f32; 4];
            for (slot, item) in ch.iter_mut().zip(items) {
                *slot = item.as_number()? as f32;
            }
            Some(Color::new(ch[0], ch[1], ch[2], ch[3]))
        }
        PropertyValue::Host(host) => host.downcast_ref::<Color>().copied(),
        _ => None,
    }
}

fn parse_color_str(s: &str) -> Option<Color> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex);
    }

    let color = match s.to_ascii_lowercase().as_str() {
        "black" => Color::BLACK,
        "white" => Color::WHITE,
        "red" => Color::RED,
        "green" => Color::from_u8(0, 128, 0, 255),
        "lime" => Color::from_u8(0, 255, 0, 255),
        "blue" => Color::from_u8(0, 0, 255, 255),
        "yellow" => Color::from_u8(255, 255, 0, 255),
        "cyan" => Color::from_u8(0, 255, 255, 255),
        "magenta" => Color::from_u8(255, 0, 255, 255),
        "gray" | "grey" => Color::from_u8(128, 128, 128, 255),
        "transparent" => Color::TRANSPARENT,
        _ => return None,
    };
    Some(color)
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.is_ascii() {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    let nibble = |i: usize| {
        u8::from_str_radix(hex.get(i..i + 1)?, 16)
            .ok()
            .map(|n| n * 17)
    };

    match hex.len() {
        3 => Some(Color::from_u8(nibble(0)?, nibble(1)?, nibble(2)?, 255)),
        6 => Some(Color::from_u8(byte(0)?, byte(2)?, byte(4)?, 255)),
        8 => Some(Color::from_u8(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}

/// Paint from `color`, `style`, `strokeWidth` and `opacity`.
///
/// Has no value when none of them is set, so callers can fall back to
/// the inherited paint.
#[derive(Clone, Debug, Default)]
pub struct PaintProps;

impl Derive for PaintProps {
    type Output = Paint;

    fn dependencies(&self) -> Dependencies {
        [COLOR, STYLE, STROKE_WIDTH, OPACITY].into_iter().collect()
    }

    fn derive(&mut self, props: &PropertyContainer) -> Option<Paint> {
        let color = props.value(COLOR).and_then(parse_color);
        let style = props.value(STYLE).and_then(PropertyValue::as_str);
        let stroke_width = props.number(STROKE_WIDTH);
        let opacity = props.number(OPACITY);

        if color.is_none() && style.is_none() && stroke_width.is_none() && opacity.is_none() {
            return None;
        }

        let mut paint = Paint::default();
        if let Some(color) = color {
            paint.color = color;
        }
        if let Some(style) = style {
            paint.style = match style {
                "stroke" => PaintStyle::Stroke,
                _ => PaintStyle::Fill,
            };
        }
        if let Some(width) = stroke_width {
            paint.stroke_width = width.max(0.0) as f32;
        }
        if let Some(opacity) = opacity {
            paint = paint.with_opacity(opacity as f32);
        }
        Some(paint)
    }
}

/// A ready-made [`Paint`] passed as a host value under `name`.
#[derive(Clone, Debug)]
pub struct PaintProp(pub PropId);

impl PaintProp {
    pub fn new(name: impl Into<PropId>) -> Self {
        Self(name.into())
    }
}

impl Derive for PaintProp {
    type Output = Paint;

    fn dependencies(&self) -> Dependencies {
        Dependencies::new().with(&self.0)
    }

    fn derive(&mut self, props: &PropertyContainer) -> Option<Paint> {
        props.value(self.0.as_str())?.downcast_host::<Paint>().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::names::PAINT;
    use crate::props::DerivedProperty;

    #[test]
    fn parses_hex_forms() {
        assert_eq!(
            parse_color(&PropertyValue::from("#ff0000")),
            Some(Color::RED)
        );
        assert_eq!(
            parse_color(&PropertyValue::from("#f00")),
            Some(Color::RED)
        );
        assert_eq!(
            parse_color(&PropertyValue::from("#00000000")),
            Some(Color::TRANSPARENT)
        );
        assert_eq!(parse_color(&PropertyValue::from("#12345")), None);
        assert_eq!(parse_color(&PropertyValue::from("#zzzzzz")), None);
    }

    #[test]
    fn parses_names_and_arrays() {
        assert_eq!(parse_color(&PropertyValue::from("White")), Some(Color::WHITE));
        let array = PropertyValue::from(vec![
            PropertyValue::from(1.0),
            PropertyValue::from(0.0),
            PropertyValue::from(0.0),
            PropertyValue::from(1.0),
        ]);
        assert_eq!(parse_color(&array), Some(Color::RED));
        assert_eq!(parse_color(&PropertyValue::from("chartreuse-ish")), None);
    }

    #[test]
    fn paint_without_inputs_has_no_value() {
        let props = PropertyContainer::new();
        let mut paint = DerivedProperty::new(PaintProps);
        assert_eq!(paint.resolve(&props), None);
    }

    #[test]
    fn explicit_paint_needs_a_host_paint() {
        let mut props = PropertyContainer::new();
        let mut paint = DerivedProperty::new(PaintProp::new(PAINT));

        props.set_property(PAINT, PropertyValue::from("red")).unwrap();
        assert_eq!(paint.resolve(&props), None);

        props.set_property(PAINT, PropertyValue::host(Paint::fill(Color::RED))).unwrap();
        assert_eq!(paint.resolve(&props), Some(&Paint::fill(Color::RED)));
    }

    #[test]
    fn paint_reads_all_fields() {
        let mut props = PropertyContainer::new();
        props
            .set_properties([
                (COLOR, PropertyValue::from("blue")),
                (STYLE, PropertyValue::from("stroke")),
                (STROKE_WIDTH, PropertyValue::from(3.0)),
                (OPACITY, PropertyValue::from(0.5)),
            ])
            .unwrap();

        let mut paint = DerivedProperty::new(PaintProps);
        let paint = *paint.resolve(&props).unwrap();
        assert_eq!(paint.color, Color::from_u8(0, 0, 255, 255));
        assert_eq!(paint.style, PaintStyle::Stroke);
        assert_eq!(paint.stroke_width, 3.0);
        assert_eq!(paint.alpha, 0.5);
    }
}
