//! Watermark overlay for rendered pages.
//!
//! The compositor tiles rotated, semi-transparent text across a page
//! buffer. Text measurement and glyph rasterization live behind the
//! `TextRenderer` trait so the compositor stays deterministic and
//! testable without font files.

mod compositor;
mod text;

pub use compositor::WatermarkCompositor;
pub use text::{FontError, FontTextRenderer, TextMetrics, TextRenderer};
