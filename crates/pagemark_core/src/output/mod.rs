//! Output persistence: deterministic naming and PNG encoding.
//!
//! Every page is written as `{output_dir}/{base_name}_{page + 1}.png`
//! regardless of the source format. The output directory is created once
//! before the document loop; per-page write failures are recoverable.

use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use image::ImageFormat;
use thiserror::Error;

use crate::render::PageBuffer;

/// Errors from persisting page images.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Creating the output directory failed.
    #[error("failed to create output directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Encoding or writing a page image failed.
    #[error("failed to write image '{path}': {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Writes page buffers as PNG files with deterministic names.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    output_dir: PathBuf,
}

impl OutputWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// The directory pages are written into.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Create the output directory recursively. Idempotent.
    pub fn ensure_dir(&self) -> Result<(), WriteError> {
        std::fs::create_dir_all(&self.output_dir).map_err(|source| WriteError::CreateDir {
            path: self.output_dir.clone(),
            source,
        })
    }

    /// Deterministic path for a page: `{base_name}_{page + 1}.png`.
    pub fn page_path(&self, base_name: &str, page_index: usize) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}.png", base_name, page_index + 1))
    }

    /// Encode `buffer` as PNG at the deterministic path.
    pub fn write_page(
        &self,
        buffer: &PageBuffer,
        base_name: &str,
        page_index: usize,
    ) -> Result<PathBuf, WriteError> {
        let path = self.page_path(base_name, page_index);
        buffer
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|source| WriteError::Encode {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }
}

/// Source filename without its extension, used as the output base name.
pub fn document_base_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

/// Default output directory next to the first source document:
/// `output_{YYYYmmdd_HHMMSS}`.
pub fn default_output_dir(first_source: &Path) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let dir_name = format!("output_{}", stamp);
    match first_source.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(dir_name),
        _ => PathBuf::from(dir_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;
    use tempfile::tempdir;

    #[test]
    fn page_names_are_one_based() {
        let writer = OutputWriter::new("/out");
        assert_eq!(
            writer.page_path("report", 2),
            PathBuf::from("/out/report_3.png")
        );
        assert_eq!(
            writer.page_path("report", 0),
            PathBuf::from("/out/report_1.png")
        );
    }

    #[test]
    fn base_name_strips_extension() {
        assert_eq!(document_base_name(Path::new("/docs/report.pdf")), "report");
        assert_eq!(document_base_name(Path::new("notes")), "notes");
    }

    #[test]
    fn ensure_dir_is_idempotent() {
        let dir = tempdir().unwrap();
        let writer = OutputWriter::new(dir.path().join("nested/out"));

        writer.ensure_dir().unwrap();
        writer.ensure_dir().unwrap();
        assert!(writer.output_dir().is_dir());
    }

    #[test]
    fn writes_png_files() {
        let dir = tempdir().unwrap();
        let writer = OutputWriter::new(dir.path());

        let buffer = RgbaImage::from_pixel(8, 8, image::Rgba([1, 2, 3, 255]));
        let path = writer.write_page(&buffer, "doc", 0).unwrap();

        assert!(path.ends_with("doc_1.png"));
        let read_back = image::open(&path).unwrap().to_rgba8();
        assert_eq!(read_back.get_pixel(0, 0)[2], 3);
    }

    #[test]
    fn write_into_missing_dir_errors() {
        let dir = tempdir().unwrap();
        let writer = OutputWriter::new(dir.path().join("never_created"));

        let buffer = RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 0, 255]));
        assert!(matches!(
            writer.write_page(&buffer, "doc", 0),
            Err(WriteError::Encode { .. })
        ));
    }

    #[test]
    fn default_output_dir_is_sibling_of_source() {
        let dir = default_output_dir(Path::new("/data/docs/report.pdf"));
        assert!(dir.starts_with("/data/docs"));
        assert!(dir
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("output_"));
    }
}
