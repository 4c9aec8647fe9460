//! Page rasterization boundary.
//!
//! The document parsing/rasterization engine is an external collaborator;
//! this module defines the trait it must satisfy and the error surface the
//! job runner consumes. A render failure on one page must not invalidate
//! the document for subsequent pages.

mod image_doc;

use std::path::{Path, PathBuf};

use image::RgbaImage;
use thiserror::Error;

pub use image_doc::ImageFileRenderer;

/// An owned raster buffer for one rendered page.
///
/// Produced by the renderer, optionally mutated in place by the watermark
/// compositor, then consumed read-only by the output writer.
pub type PageBuffer = RgbaImage;

/// Errors from the rasterization boundary.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The document could not be opened, parsed, or is access-protected.
    #[error("cannot open document '{path}': {message}")]
    Open { path: PathBuf, message: String },

    /// A single page could not be rasterized.
    #[error("cannot render page {num}: {message}", num = .page + 1)]
    Page { page: usize, message: String },
}

impl RenderError {
    /// Create an open error.
    pub fn open(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Open {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a page render error.
    pub fn page(page: usize, message: impl Into<String>) -> Self {
        Self::Page {
            page,
            message: message.into(),
        }
    }
}

/// An open document whose pages can be rasterized.
pub trait Document {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Rasterize one page at the given resolution.
    ///
    /// The physical pixel dimensions of the result vary with the page's
    /// media size; the resolution is applied uniformly to every page.
    fn render_page(&self, index: usize, dpi: u32) -> Result<PageBuffer, RenderError>;
}

/// Factory that opens documents for rasterization.
pub trait PageRenderer: Send + Sync {
    /// Open a document at `path`.
    fn open(&self, path: &Path) -> Result<Box<dyn Document>, RenderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_error_pages_display_one_based() {
        let err = RenderError::page(0, "damaged content stream");
        assert!(err.to_string().contains("page 1"));
    }

    #[test]
    fn open_error_includes_path() {
        let err = RenderError::open("/docs/locked.pdf", "password protected");
        let msg = err.to_string();
        assert!(msg.contains("locked.pdf"));
        assert!(msg.contains("password protected"));
    }
}
