use anyhow::{anyhow, Result};

use crate::props::PropertyValue;
use crate::render::{
    Canvas, Color, Paint, PaintStyle, RRect, Rect, RenderBackend, RenderTarget, SurfaceSize,
};

/// Cairo backend for rendering using cairo graphics library.
pub struct CairoBackend;

impl CairoBackend {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for CairoBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderBackend for CairoBackend {
    fn name(&self) -> &str {
        "CairoBackend"
    }

    fn create_target(&self, size: SurfaceSize) -> Result<Box<dyn RenderTarget>> {
        Ok(Box::new(CairoSurface::new(size)?))
    }
}

/// Premultiplied ARGB32 pixels copied out of a cairo surface.
#[derive(Clone)]
pub struct CairoSnapshot {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub stride: u32,
}

impl std::fmt::Debug for CairoSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CairoSnapshot")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("len", &self.pixels.len())
            .finish()
    }
}

pub struct CairoCanvas {
    cr: cairo::Context,
}

impl CairoCanvas {
    fn set_source(&self, color: Color) {
        self.cr
            .set_source_rgba(color.r as f64, color.g as f64, color.b as f64, color.a as f64);
    }

    fn finish_path(&self, paint: &Paint) -> Result<()> {
        self.set_source(paint.effective_color());
        match paint.style {
            PaintStyle::Fill => self.cr.fill()?,
            PaintStyle::Stroke => {
                self.cr.set_line_width(paint.stroke_width as f64);
                self.cr.stroke()?
            }
        }
        Ok(())
    }
}

impl Canvas for CairoCanvas {
    fn save(&mut self) -> Result<()> {
        Ok(self.cr.save()?)
    }

    fn restore(&mut self) -> Result<()> {
        Ok(self.cr.restore()?)
    }

    fn scale(&mut self, sx: f32, sy: f32) -> Result<()> {
        self.cr.scale(sx as f64, sy as f64);
        Ok(())
    }

    fn clear(&mut self, color: Color) -> Result<()> {
        self.cr.set_operator(cairo::Operator::Source);
        self.set_source(color);
        self.cr.paint()?;
        self.cr.set_operator(cairo::Operator::Over);
        Ok(())
    }

    fn draw_rect(&mut self, rect: &Rect, paint: &Paint) -> Result<()> {
        self.cr.rectangle(
            rect.x as f64,
            rect.y as f64,
            rect.width as f64,
            rect.height as f64,
        );
        self.finish_path(paint)
    }

    fn draw_rrect(&mut self, rrect: &RRect, paint: &Paint) -> Result<()> {
        if rrect.is_rect() {
            return self.draw_rect(&rrect.rect, paint);
        }

        // Quarter ellipses approximated with cubic beziers
        const K: f64 = 0.552_284_75;
        let (x, y) = (rrect.rect.x as f64, rrect.rect.y as f64);
        let (w, h) = (rrect.rect.width as f64, rrect.rect.height as f64);
        let (rx, ry) = (rrect.rx as f64, rrect.ry as f64);
        let (kx, ky) = (rx * K, ry * K);

        let cr = &self.cr;
        cr.new_sub_path();
        cr.move_to(x + rx, y);
        cr.line_to(x + w - rx, y);
        cr.curve_to(x + w - rx + kx, y, x + w, y + ry - ky, x + w, y + ry);
        cr.line_to(x + w, y + h - ry);
        cr.curve_to(x + w, y + h - ry + ky, x + w - rx + kx, y + h, x + w - rx, y + h);
        cr.line_to(x + rx, y + h);
        cr.curve_to(x + rx - kx, y + h, x, y + h - ry + ky, x, y + h - ry);
        cr.line_to(x, y + ry);
        cr.curve_to(x, y + ry - ky, x + rx - kx, y, x + rx, y);
        cr.close_path();

        self.finish_path(paint)
    }

    fn draw_text(&mut self, text: &str, x: f32, y: f32, size: f32, paint: &Paint) -> Result<()> {
        self.set_source(paint.effective_color());
        self.cr
            .select_font_face("Sans", cairo::FontSlant::Normal, cairo::FontWeight::Normal);
        self.cr.set_font_size(size as f64);
        self.cr.move_to(x as f64, y as f64);
        self.cr.show_text(text)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.cr.target().flush();
        Ok(())
    }
}

pub struct CairoSurface {
    surface: cairo::ImageSurface,
    canvas: CairoCanvas,
    size: SurfaceSize,
    frame_id: u64,
}

// SAFETY: the surface and its context are created together, never shared
// outside this struct, and only touched by whoever holds `&mut self`.
unsafe impl Send for CairoSurface {}

impl CairoSurface {
    pub fn new(size: SurfaceSize) -> Result<Self> {
        let surface = cairo::ImageSurface::create(
            cairo::Format::ARgb32,
            size.width as i32,
            size.height as i32,
        )?;
        let cr = cairo::Context::new(&surface)?;

        Ok(Self {
            surface,
            canvas: CairoCanvas { cr },
            size,
            frame_id: 0,
        })
    }

    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    pub fn stride(&self) -> i32 {
        self.surface.stride()
    }
}

impl RenderTarget for CairoSurface {
    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn canvas(&mut self) -> &mut dyn Canvas {
        &mut self.canvas
    }

    fn present(&mut self) -> Result<()> {
        self.surface.flush();
        self.frame_id = self.frame_id.wrapping_add(1);
        Ok(())
    }

    fn snapshot(&mut self) -> Option<PropertyValue> {
        self.surface.flush();

        let mut pixels = Vec::new();
        let copied = self
            .surface
            .with_data(|data| pixels.extend_from_slice(data))
            .map_err(|e| anyhow!("cairo surface not readable: {e}"));

        match copied {
            Ok(()) => Some(PropertyValue::host(CairoSnapshot {
                pixels,
                width: self.size.width,
                height: self.size.height,
                stride: self.stride() as u32,
            })),
            Err(e) => {
                log::warn!("snapshot failed: {e}");
                None
            }
        }
    }
}
