use ab_glyph::{point, Font, FontVec, Glyph, PxScale, ScaleFont};
use anyhow::{anyhow, Context, Result};
use oddball_core::{Color as StimColor, Stimulus};
use oddball_timing::{HighPrecisionTimer, Timer};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tiny_skia::{
    Color, Paint, Pixmap, PixmapPaint, PremultipliedColorU8, Rect, Transform,
};

/// Line spacing as a multiple of the font size.
const LINE_HEIGHT: f32 = 1.3;

pub fn load_font(path: &Path) -> Result<FontVec> {
    let bytes = std::fs::read(path).with_context(|| format!("reading font {}", path.display()))?;
    FontVec::try_from_vec(bytes).map_err(|e| anyhow!("invalid font {}: {e}", path.display()))
}

fn to_skia(c: StimColor) -> Color {
    let [r, g, b, a] = c.rgba();
    Color::from_rgba8(r, g, b, a)
}

/// Rasterises one line of text into a tight, transparent, premultiplied pixmap.
/// Returns `None` when nothing in `text` has an outline.
pub fn render_text_pixmap<F: Font>(
    text: &str,
    font_size: f32,
    font: &F,
    color: Color,
) -> Option<Pixmap> {
    let scale = PxScale::from(font_size);
    let sf = font.as_scaled(scale);

    // 1) Layout with baseline at ascent
    let mut pen_x = 0.0f32;
    let mut glyphs = Vec::<Glyph>::new();
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = glyphs.last() {
            pen_x += sf.kern(prev.id, id);
        }
        glyphs.push(Glyph {
            id,
            scale,
            position: point(pen_x, sf.ascent()),
        });
        pen_x += sf.h_advance(id);
    }

    // 2) Union pixel bounds from outlined glyphs
    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    let outlines: Vec<_> = glyphs
        .iter()
        .filter_map(|g| font.outline_glyph(g.clone()))
        .collect();
    for out in &outlines {
        let b = out.px_bounds();
        min_x = min_x.min(b.min.x);
        min_y = min_y.min(b.min.y);
        max_x = max_x.max(b.max.x);
        max_y = max_y.max(b.max.y);
    }

    if outlines.is_empty() {
        return None;
    }

    let w = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
    let h = (max_y.ceil() - min_y.floor()).max(1.0) as u32;
    let mut pm = Pixmap::new(w, h)?;

    // 3) Rasterize with premultiplied alpha blending
    let stride = pm.width() as usize;
    let dst = pm.pixels_mut();
    let cu = color.to_color_u8();
    let cu = [cu.red(), cu.green(), cu.blue(), cu.alpha()];

    for out in &outlines {
        let b = out.px_bounds();
        out.draw(|x, y, cov| {
            if cov <= f32::EPSILON {
                return;
            }
            let ix = (x as f32 + b.min.x - min_x).floor() as i32;
            let iy = (y as f32 + b.min.y - min_y).floor() as i32;
            if ix < 0 || iy < 0 || ix >= w as i32 || iy >= h as i32 {
                return;
            }
            let i = iy as usize * stride + ix as usize;

            let a_lin = (cov * cu[3] as f32 / 255.0).clamp(0.0, 1.0);
            let sa = (a_lin * 255.0) as u8;
            let sr = ((cu[0] as f32 * a_lin) as u8).min(sa);
            let sg = ((cu[1] as f32 * a_lin) as u8).min(sa);
            let sb = ((cu[2] as f32 * a_lin) as u8).min(sa);

            // Porter-Duff over in premultiplied space: out = src + bg * (1 - src.a)
            let bg = dst[i];
            let inv = 1.0 - (sa as f32 / 255.0);
            let a = sa.saturating_add((bg.alpha() as f32 * inv) as u8);
            let r = sr.saturating_add((bg.red() as f32 * inv) as u8).min(a);
            let g = sg.saturating_add((bg.green() as f32 * inv) as u8).min(a);
            let bl = sb.saturating_add((bg.blue() as f32 * inv) as u8).min(a);
            if let Some(px) = PremultipliedColorU8::from_rgba(r, g, bl, a) {
                dst[i] = px;
            }
        });
    }

    Some(pm)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    pub draw: Duration,
    pub copy: Duration,
    pub total: Duration,
}

/// Draws task stimuli into an RGBA8 frame buffer of a fixed size.
pub struct SkiaRenderer {
    width: u32,
    height: u32,
    center: (f32, f32),

    font: Option<FontVec>,
    text_cache: HashMap<(String, u32, [u8; 4]), Option<Pixmap>>,

    canvas: Pixmap,
    timer: HighPrecisionTimer,
}

impl SkiaRenderer {
    /// Without a font, text stimuli render as their background only.
    pub fn new(width: u32, height: u32, font: Option<FontVec>) -> Result<Self> {
        let canvas = Pixmap::new(width.max(1), height.max(1))
            .ok_or_else(|| anyhow!("cannot allocate {width}x{height} canvas"))?;
        Ok(Self {
            width: canvas.width(),
            height: canvas.height(),
            center: (canvas.width() as f32 / 2.0, canvas.height() as f32 / 2.0),
            font,
            text_cache: HashMap::new(),
            canvas,
            timer: HighPrecisionTimer::new(),
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32) -> Result<()> {
        let canvas = Pixmap::new(new_width.max(1), new_height.max(1))
            .ok_or_else(|| anyhow!("cannot allocate {new_width}x{new_height} canvas"))?;
        self.width = canvas.width();
        self.height = canvas.height();
        self.center = (self.width as f32 / 2.0, self.height as f32 / 2.0);
        self.canvas = canvas;
        Ok(())
    }

    /// Frame time statistics over the recent renders.
    pub fn timer(&self) -> &HighPrecisionTimer {
        &self.timer
    }

    pub fn canvas(&self) -> &Pixmap {
        &self.canvas
    }

    /// Draws `stimulus` on the offscreen canvas and copies it to `frame_buffer`.
    pub fn render(&mut self, stimulus: &Stimulus, frame_buffer: &mut [u8]) -> Result<FrameStats> {
        let expected = self.canvas.data().len();
        if frame_buffer.len() != expected {
            return Err(anyhow!(
                "frame buffer holds {} bytes, canvas needs {expected}",
                frame_buffer.len()
            ));
        }

        let t_draw = {
            let t = self.timer.now();
            self.draw(stimulus);
            self.timer.elapsed(t)
        };
        let t_copy = {
            let t = self.timer.now();
            frame_buffer.copy_from_slice(self.canvas.data());
            self.timer.elapsed(t)
        };
        let total = t_draw + t_copy;
        self.timer.record_frame(total);

        Ok(FrameStats {
            draw: t_draw,
            copy: t_copy,
            total,
        })
    }

    fn draw(&mut self, stimulus: &Stimulus) {
        self.canvas.fill(to_skia(stimulus.background()));
        match stimulus {
            Stimulus::Blank { .. } => {}
            Stimulus::FixationCross {
                orientation_deg,
                size,
                color,
                ..
            } => self.draw_cross(*orientation_deg, *size, *color),
            Stimulus::Text {
                content,
                size,
                color,
                ..
            } => self.draw_text(content, *size, *color),
        }
    }

    fn draw_cross(&mut self, orientation_deg: f32, size: f32, color: StimColor) {
        let mut paint = Paint::default();
        paint.anti_alias = true;
        paint.set_color(to_skia(color));

        let (cx, cy) = self.center;
        let thickness = (size / 8.0).max(2.0);
        let transform = Transform::from_rotate_at(orientation_deg, cx, cy);
        let bars = [
            Rect::from_xywh(cx - size / 2.0, cy - thickness / 2.0, size, thickness),
            Rect::from_xywh(cx - thickness / 2.0, cy - size / 2.0, thickness, size),
        ];
        for bar in bars.into_iter().flatten() {
            self.canvas.fill_rect(bar, &paint, transform, None);
        }
    }

    fn draw_text(&mut self, content: &str, size: f32, color: StimColor) {
        let Some(font) = self.font.as_ref() else {
            return;
        };
        let line_height = size * LINE_HEIGHT;
        let lines: Vec<&str> = content.lines().collect();
        let block_height = line_height * lines.len() as f32;
        let top = self.center.1 - block_height / 2.0;
        let paint = PixmapPaint::default();

        for (row, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let key = (line.to_string(), size.to_bits(), color.rgba());
            let Some(pm) = self
                .text_cache
                .entry(key)
                .or_insert_with(|| render_text_pixmap(line, size, font, to_skia(color)))
            else {
                continue;
            };
            let x = (self.center.0 - pm.width() as f32 / 2.0).round() as i32;
            let y = (top + row as f32 * line_height + (line_height - pm.height() as f32) / 2.0)
                .round() as i32;
            self.canvas
                .draw_pixmap(x, y, pm.as_ref(), &paint, Transform::identity(), None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel(r: &SkiaRenderer, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * r.size().0 + x) * 4) as usize;
        let d = r.canvas().data();
        [d[i], d[i + 1], d[i + 2], d[i + 3]]
    }

    #[test]
    fn blank_fills_the_whole_frame() {
        let mut r = SkiaRenderer::new(64, 48, None).unwrap();
        let mut fb = vec![0u8; 64 * 48 * 4];
        r.render(&Stimulus::blank(StimColor::WHITE), &mut fb).unwrap();
        assert!(fb.iter().all(|&b| b == 255));
        r.render(&Stimulus::blank(StimColor::BLACK), &mut fb).unwrap();
        assert!(fb.chunks(4).all(|px| px == [0, 0, 0, 255]));
    }

    #[test]
    fn upright_cross_covers_center_and_arms() {
        let mut r = SkiaRenderer::new(200, 200, None).unwrap();
        let mut fb = vec![0u8; 200 * 200 * 4];
        r.render(&Stimulus::cross(0.0), &mut fb).unwrap();
        assert_eq!(pixel(&r, 100, 100), [255, 255, 255, 255]);
        assert_eq!(pixel(&r, 120, 100), [255, 255, 255, 255]);
        assert_eq!(pixel(&r, 100, 80), [255, 255, 255, 255]);
        // Off the arms stays grey.
        assert_eq!(pixel(&r, 115, 115), [128, 128, 128, 255]);
    }

    #[test]
    fn rotated_cross_moves_arms_to_diagonals() {
        let mut r = SkiaRenderer::new(200, 200, None).unwrap();
        let mut fb = vec![0u8; 200 * 200 * 4];
        r.render(&Stimulus::cross(45.0), &mut fb).unwrap();
        assert_eq!(pixel(&r, 112, 112), [255, 255, 255, 255]);
        assert_eq!(pixel(&r, 120, 100), [128, 128, 128, 255]);
    }

    #[test]
    fn text_without_font_is_background_only() {
        let mut r = SkiaRenderer::new(32, 32, None).unwrap();
        let mut fb = vec![0u8; 32 * 32 * 4];
        r.render(&Stimulus::message("Thank you"), &mut fb).unwrap();
        assert!(fb.chunks(4).all(|px| px == [128, 128, 128, 255]));
    }

    #[test]
    fn mismatched_frame_buffer_is_an_error() {
        let mut r = SkiaRenderer::new(10, 10, None).unwrap();
        let mut fb = vec![0u8; 10];
        assert!(r.render(&Stimulus::blank(StimColor::GREY), &mut fb).is_err());
    }

    #[test]
    fn resize_changes_the_frame_size() {
        let mut r = SkiaRenderer::new(10, 10, None).unwrap();
        r.resize(20, 5).unwrap();
        assert_eq!(r.size(), (20, 5));
        let mut fb = vec![0u8; 20 * 5 * 4];
        r.render(&Stimulus::cross(0.0), &mut fb).unwrap();
        assert_eq!(r.timer().calibration_stats().samples, 1);
    }
}
