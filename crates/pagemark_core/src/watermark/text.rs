//! Text measurement and rasterization for the watermark compositor.
//!
//! The compositor only needs line-box metrics and an RGBA sprite of the
//! text, so the font backend sits behind the `TextRenderer` trait. The
//! production backend rasterizes glyphs with `ab_glyph` from a TTF/OTF
//! loaded from a configured path or a probed system bold font.

use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use thiserror::Error;

use crate::models::RgbaColor;

/// Pixel metrics for a single line of text at a given size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextMetrics {
    /// Advance width of the whole string.
    pub width: u32,
    /// Line-box height (ascent + descent).
    pub height: u32,
    /// Baseline offset from the top of the line box.
    pub ascent: u32,
}

/// Measures and rasterizes watermark text.
pub trait TextRenderer: Send + Sync {
    /// Measure `text` at `px` pixels.
    fn measure(&self, text: &str, px: f32) -> TextMetrics;

    /// Rasterize `text` at `px` pixels into a transparent-background RGBA
    /// sprite sized to the line box, baseline at `ascent`.
    fn rasterize(&self, text: &str, px: f32, color: RgbaColor) -> RgbaImage;
}

/// Errors loading the watermark font.
#[derive(Error, Debug)]
pub enum FontError {
    #[error("failed to read font file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse font file '{path}'")]
    Parse { path: PathBuf },

    #[error("no usable bold font found; set watermark.font_path in the config")]
    NoSystemFont,
}

/// Bold system fonts probed when no font path is configured.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

/// `ab_glyph`-backed text renderer.
pub struct FontTextRenderer {
    font: FontVec,
}

impl FontTextRenderer {
    /// Load a font from raw TTF/OTF bytes.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, FontError> {
        let font = FontVec::try_from_vec(data).map_err(|_| FontError::Parse {
            path: PathBuf::from("<bytes>"),
        })?;
        Ok(Self { font })
    }

    /// Load a font from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FontError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| FontError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let font = FontVec::try_from_vec(data).map_err(|_| FontError::Parse {
            path: path.to_path_buf(),
        })?;
        Ok(Self { font })
    }

    /// Load the configured font, or probe common system bold fonts.
    pub fn from_config(font_path: Option<&str>) -> Result<Self, FontError> {
        if let Some(path) = font_path {
            return Self::from_file(path);
        }

        for candidate in SYSTEM_FONT_CANDIDATES {
            if Path::new(candidate).is_file() {
                if let Ok(renderer) = Self::from_file(candidate) {
                    tracing::debug!(font = candidate, "loaded system watermark font");
                    return Ok(renderer);
                }
            }
        }
        Err(FontError::NoSystemFont)
    }
}

impl TextRenderer for FontTextRenderer {
    fn measure(&self, text: &str, px: f32) -> TextMetrics {
        let scaled = self.font.as_scaled(PxScale::from(px));

        let mut width = 0.0f32;
        let mut prev: Option<ab_glyph::GlyphId> = None;
        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = prev {
                width += scaled.kern(prev, id);
            }
            width += scaled.h_advance(id);
            prev = Some(id);
        }

        let ascent = scaled.ascent();
        let height = ascent - scaled.descent();

        TextMetrics {
            width: width.ceil() as u32,
            height: height.ceil() as u32,
            ascent: ascent.ceil() as u32,
        }
    }

    fn rasterize(&self, text: &str, px: f32, color: RgbaColor) -> RgbaImage {
        let metrics = self.measure(text, px);
        let mut sprite = RgbaImage::new(metrics.width.max(1), metrics.height.max(1));
        if text.is_empty() {
            return sprite;
        }

        let scale = PxScale::from(px);
        let scaled = self.font.as_scaled(scale);
        let baseline_y = metrics.ascent as f32;

        let mut cursor_x = 0.0f32;
        let mut prev: Option<ab_glyph::GlyphId> = None;

        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = prev {
                cursor_x += scaled.kern(prev, id);
            }

            let glyph = id.with_scale_and_position(scale, ab_glyph::point(cursor_x, baseline_y));
            if let Some(outlined) = self.font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                let (w, h) = (sprite.width() as i32, sprite.height() as i32);

                outlined.draw(|gx, gy, coverage| {
                    let x = gx as i32 + bounds.min.x as i32;
                    let y = gy as i32 + bounds.min.y as i32;
                    if x >= 0 && y >= 0 && x < w && y < h {
                        let alpha = (coverage * color.a as f32) as u8;
                        let pixel = Rgba([color.r, color.g, color.b, alpha]);
                        let existing = *sprite.get_pixel(x as u32, y as u32);
                        sprite.put_pixel(x as u32, y as u32, blend_pixels(existing, pixel));
                    }
                });
            }

            cursor_x += scaled.h_advance(id);
            prev = Some(id);
        }

        sprite
    }
}

/// Source-over alpha compositing of `top` onto `bottom`.
pub(crate) fn blend_pixels(bottom: Rgba<u8>, top: Rgba<u8>) -> Rgba<u8> {
    let top_alpha = top[3] as f32 / 255.0;
    let bottom_alpha = bottom[3] as f32 / 255.0;

    let out_alpha = top_alpha + bottom_alpha * (1.0 - top_alpha);
    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend = |t: u8, b: u8| -> u8 {
        let t = t as f32 / 255.0;
        let b = b as f32 / 255.0;
        let v = (t * top_alpha + b * bottom_alpha * (1.0 - top_alpha)) / out_alpha;
        (v * 255.0) as u8
    };

    Rgba([
        blend(top[0], bottom[0]),
        blend(top[1], bottom[1]),
        blend(top[2], bottom[2]),
        (out_alpha * 255.0) as u8,
    ])
}
