//! Renderer backend for plain raster image files.
//!
//! Treats a single image file (PNG, JPEG, ...) as a one-page document.
//! Raster sources carry no physical media size, so the requested DPI does
//! not change the output dimensions.

use std::path::Path;

use super::{Document, PageBuffer, PageRenderer, RenderError};

/// Opens single raster images as one-page documents.
#[derive(Debug, Default)]
pub struct ImageFileRenderer;

impl ImageFileRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl PageRenderer for ImageFileRenderer {
    fn open(&self, path: &Path) -> Result<Box<dyn Document>, RenderError> {
        let image = image::open(path)
            .map_err(|e| RenderError::open(path, e.to_string()))?
            .to_rgba8();
        Ok(Box::new(ImageDocument { image }))
    }
}

struct ImageDocument {
    image: PageBuffer,
}

impl Document for ImageDocument {
    fn page_count(&self) -> usize {
        1
    }

    fn render_page(&self, index: usize, _dpi: u32) -> Result<PageBuffer, RenderError> {
        if index != 0 {
            return Err(RenderError::page(index, "image documents have one page"));
        }
        Ok(self.image.clone())
    }
}
