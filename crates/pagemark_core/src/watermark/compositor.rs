//! Tiled rotated text compositing.
//!
//! The watermark pattern is defined in a coordinate frame centered on the
//! page and rotated by the spec angle. Text anchors tile that frame at a
//! fixed pitch derived from the measured text width and the configured
//! spacing, both scaled so the perceived density stays constant across
//! page sizes. The tiling range of one page dimension in each direction
//! is a conservative cover of the rotated canvas, kept as-is even though
//! extreme angle/spacing combinations can under-cover corners.

use std::sync::Arc;

use image::RgbaImage;

use super::text::{blend_pixels, TextRenderer};
use crate::models::WatermarkSpec;
use crate::render::PageBuffer;

/// Draws a tiled rotated text pattern onto page buffers in place.
///
/// Deterministic given identical inputs. Construct once per run; `apply`
/// recomputes per-page scaling from the buffer dimensions.
pub struct WatermarkCompositor {
    spec: WatermarkSpec,
    text: Arc<dyn TextRenderer>,
    reference_width: u32,
    reference_height: u32,
}

impl WatermarkCompositor {
    /// Create a compositor for an enabled spec.
    ///
    /// `reference` is the baseline page size in pixels that base font size
    /// and spacing are relative to.
    pub fn new(spec: WatermarkSpec, text: Arc<dyn TextRenderer>, reference: (u32, u32)) -> Self {
        Self {
            spec,
            text,
            reference_width: reference.0.max(1),
            reference_height: reference.1.max(1),
        }
    }

    /// Density normalization factor for a page of the given pixel size.
    ///
    /// Larger pages scale the watermark up proportionally instead of
    /// keeping a fixed absolute size.
    pub fn scale_factor(&self, width: u32, height: u32) -> f64 {
        let wr = width as f64 / self.reference_width as f64;
        let hr = height as f64 / self.reference_height as f64;
        wr.max(hr)
    }

    /// Overlay the watermark pattern onto `buffer` in place.
    pub fn apply(&self, buffer: &mut PageBuffer) {
        if !self.spec.is_enabled() || buffer.width() == 0 || buffer.height() == 0 {
            return;
        }

        let scale = self.scale_factor(buffer.width(), buffer.height());
        let font_px = ((self.spec.font_size as f64 * scale).round()).max(1.0) as f32;
        // Clamp so the row loop always advances.
        let spacing = ((self.spec.spacing as f64 * scale).round() as i64).max(1) as i32;

        let metrics = self.text.measure(&self.spec.text, font_px);
        if metrics.width == 0 {
            return;
        }

        let sprite = self.text.rasterize(&self.spec.text, font_px, self.spec.color);
        let angle = self.spec.angle_degrees;
        let rotated = if angle.rem_euclid(360.0) == 0.0 {
            sprite
        } else {
            rotate_sprite(&sprite, angle)
        };

        let w = buffer.width() as i32;
        let h = buffer.height() as i32;
        let cx = w as f32 / 2.0;
        let cy = h as f32 / 2.0;

        // Y-down rotation, matching the painter convention the angle was
        // authored against.
        let (sin, cos) = (angle.to_radians()).sin_cos();

        let text_w = metrics.width as f32;
        let text_h = metrics.height as f32;
        let ascent = metrics.ascent as f32;
        let step_x = metrics.width as i32 + spacing;

        let mut y = -h;
        while y < h {
            let mut x = -w;
            while x < w {
                // Frame-space center of this tile's line box; the anchor
                // (x, y) is the text baseline origin.
                let fx = x as f32 + text_w / 2.0;
                let fy = y as f32 - ascent + text_h / 2.0;

                let dx = cx + fx * cos - fy * sin;
                let dy = cy + fx * sin + fy * cos;

                blit_centered(buffer, &rotated, dx, dy);
                x += step_x;
            }
            y += spacing;
        }
    }
}

/// Alpha-blend `sprite` onto `buffer`, centered at (`cx`, `cy`).
fn blit_centered(buffer: &mut PageBuffer, sprite: &RgbaImage, cx: f32, cy: f32) {
    let left = (cx - sprite.width() as f32 / 2.0).round() as i32;
    let top = (cy - sprite.height() as f32 / 2.0).round() as i32;

    let bw = buffer.width() as i32;
    let bh = buffer.height() as i32;

    for (sx, sy, pixel) in sprite.enumerate_pixels() {
        if pixel[3] == 0 {
            continue;
        }
        let x = left + sx as i32;
        let y = top + sy as i32;
        if x < 0 || y < 0 || x >= bw || y >= bh {
            continue;
        }
        let existing = *buffer.get_pixel(x as u32, y as u32);
        buffer.put_pixel(x as u32, y as u32, blend_pixels(existing, *pixel));
    }
}

/// Rotate a sprite by `degrees` (y-down frame) with inverse bilinear
/// sampling, returning a tight rotated-bounding-box image.
fn rotate_sprite(sprite: &RgbaImage, degrees: f32) -> RgbaImage {
    let radians = degrees.to_radians();
    let (sin, cos) = radians.sin_cos();

    let src_w = sprite.width() as f32;
    let src_h = sprite.height() as f32;

    // Round, not ceil: right-angle rotations produce a cosine of ~1e-8
    // instead of zero, which would otherwise inflate the box by a pixel.
    let dst_w = (src_w * cos.abs() + src_h * sin.abs()).round().max(1.0) as u32;
    let dst_h = (src_w * sin.abs() + src_h * cos.abs()).round().max(1.0) as u32;

    let mut rotated = RgbaImage::new(dst_w, dst_h);

    let src_cx = src_w / 2.0;
    let src_cy = src_h / 2.0;
    let dst_cx = dst_w as f32 / 2.0;
    let dst_cy = dst_h as f32 / 2.0;

    for dy in 0..dst_h {
        for dx in 0..dst_w {
            // Inverse rotation maps each destination pixel back into the
            // source sprite.
            let rx = dx as f32 + 0.5 - dst_cx;
            let ry = dy as f32 + 0.5 - dst_cy;

            let sx = rx * cos + ry * sin + src_cx - 0.5;
            let sy = -rx * sin + ry * cos + src_cy - 0.5;

            if sx < 0.0 || sy < 0.0 || sx >= src_w - 1.0 || sy >= src_h - 1.0 {
                continue;
            }

            let x0 = sx.floor() as u32;
            let y0 = sy.floor() as u32;
            let fx = sx - x0 as f32;
            let fy = sy - y0 as f32;

            let p00 = sprite.get_pixel(x0, y0);
            let p10 = sprite.get_pixel(x0 + 1, y0);
            let p01 = sprite.get_pixel(x0, y0 + 1);
            let p11 = sprite.get_pixel(x0 + 1, y0 + 1);

            let lerp = |c: usize| -> u8 {
                let v = p00[c] as f32 * (1.0 - fx) * (1.0 - fy)
                    + p10[c] as f32 * fx * (1.0 - fy)
                    + p01[c] as f32 * (1.0 - fx) * fy
                    + p11[c] as f32 * fx * fy;
                v.clamp(0.0, 255.0) as u8
            };

            rotated.put_pixel(dx, dy, image::Rgba([lerp(0), lerp(1), lerp(2), lerp(3)]));
        }
    }

    rotated
}
