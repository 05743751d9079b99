//! Render list and display items.
//!
//! [`RenderList`] records drawing commands as [`DisplayItem`]s instead of
//! rasterizing them. It backs the recording backend, image snapshots and
//! most of the tests.
//!
//! # Example
//!
//! ```rust
//! use canvas_dom::render::{Canvas, Color, DisplayItem, Paint, Rect, RenderList};
//!
//! let mut list = RenderList::new();
//! list.clear(Color::WHITE).unwrap();
//! list.draw_rect(&Rect::new(10.0, 20.0, 100.0, 50.0), &Paint::fill(Color::RED)).unwrap();
//!
//! assert_eq!(list.items.len(), 2);
//! assert!(matches!(list.items[1], DisplayItem::Rect { .. }));
//! ```

use anyhow::{bail, Result};

use crate::render::{Canvas, Color, Paint, RRect, Rect};

/// A single display item representing a drawing command.
#[derive(Clone, Debug, PartialEq)]
pub enum DisplayItem {
    Save,
    Restore,
    Scale { sx: f32, sy: f32 },

    /// Clear the entire surface with the given color.
    Clear { color: Color },

    Rect { rect: Rect, paint: Paint },

    RRect { rrect: RRect, paint: Paint },

    /// Draw a text run at `(x, y)` with font size `size`.
    Text {
        text: String,
        x: f32,
        y: f32,
        size: f32,
        paint: Paint,
    },
}

/// A list of display items to be rendered.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderList {
    /// Sequence of drawing commands to execute.
    pub items: Vec<DisplayItem>,
    depth: usize,
}

impl RenderList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_command(&mut self, command: DisplayItem) {
        self.items.push(command);
    }

    /// Removes every recorded item.
    pub fn reset(&mut self) {
        self.items.clear();
        self.depth = 0;
    }

    /// Current `save` nesting depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Draw commands only, without state changes.
    pub fn draw_items(&self) -> impl Iterator<Item = &DisplayItem> {
        self.items.iter().filter(|item| {
            !matches!(
                item,
                DisplayItem::Save | DisplayItem::Restore | DisplayItem::Scale { .. }
            )
        })
    }

    /// Replays the list onto another canvas.
    pub fn replay(&self, canvas: &mut dyn Canvas) -> Result<()> {
        for item in &self.items {
            match item {
                DisplayItem::Save => canvas.save()?,
                DisplayItem::Restore => canvas.restore()?,
                DisplayItem::Scale { sx, sy } => canvas.scale(*sx, *sy)?,
                DisplayItem::Clear { color } => canvas.clear(*color)?,
                DisplayItem::Rect { rect, paint } => canvas.draw_rect(rect, paint)?,
                DisplayItem::RRect { rrect, paint } => canvas.draw_rrect(rrect, paint)?,
                DisplayItem::Text {
                    text,
                    x,
                    y,
                    size,
                    paint,
                } => canvas.draw_text(text, *x, *y, *size, paint)?,
            }
        }
        Ok(())
    }
}

impl Canvas for RenderList {
    fn save(&mut self) -> Result<()> {
        self.depth += 1;
        self.add_command(DisplayItem::Save);
        Ok(())
    }

    fn restore(&mut self) -> Result<()> {
        if self.depth == 0 {
            bail!("restore without matching save");
        }
        self.depth -= 1;
        self.add_command(DisplayItem::Restore);
        Ok(())
    }

    fn scale(&mut self, sx: f32, sy: f32) -> Result<()> {
        self.add_command(DisplayItem::Scale { sx, sy });
        Ok(())
    }

    fn clear(&mut self, color: Color) -> Result<()> {
        self.add_command(DisplayItem::Clear { color });
        Ok(())
    }

    fn draw_rect(&mut self, rect: &Rect, paint: &Paint) -> Result<()> {
        self.add_command(DisplayItem::Rect {
            rect: *rect,
            paint: *paint,
        });
        Ok(())
    }

    fn draw_rrect(&mut self, rrect: &RRect, paint: &Paint) -> Result<()> {
        self.add_command(DisplayItem::RRect {
            rrect: *rrect,
            paint: *paint,
        });
        Ok(())
    }

    fn draw_text(&mut self, text: &str, x: f32, y: f32, size: f32, paint: &Paint) -> Result<()> {
        self.add_command(DisplayItem::Text {
            text: text.to_string(),
            x,
            y,
            size,
            paint: *paint,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbalanced_restore_fails() {
        let mut list = RenderList::new();
        assert!(list.restore().is_err());

        list.save().unwrap();
        list.restore().unwrap();
        assert_eq!(list.depth(), 0);
        assert_eq!(list.items, vec![DisplayItem::Save, DisplayItem::Restore]);
    }

    #[test]
    fn replay_copies_every_item() {
        let mut list = RenderList::new();
        list.save().unwrap();
        list.scale(2.0, 2.0).unwrap();
        list.draw_text("hi", 1.0, 2.0, 16.0, &Paint::default()).unwrap();
        list.restore().unwrap();

        let mut copy = RenderList::new();
        list.replay(&mut copy).unwrap();
        assert_eq!(copy, list);
        assert_eq!(copy.draw_items().count(), 1);
    }
}
