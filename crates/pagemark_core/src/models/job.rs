//! Job configuration, run state, and run results.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::RgbaColor;

/// Watermark parameters.
///
/// Sizes are expressed relative to the reference page canvas; the
/// compositor scales them per page (see `watermark::WatermarkCompositor`).
/// An empty `text` disables the watermark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkSpec {
    /// Text to tile across each page. Empty means disabled.
    pub text: String,
    /// Text color, including opacity.
    pub color: RgbaColor,
    /// Base font size in pixels, before per-page scaling.
    pub font_size: f32,
    /// Rotation of the tiling frame, in degrees.
    pub angle_degrees: f32,
    /// Base line spacing in pixels, before per-page scaling.
    pub spacing: f32,
}

impl WatermarkSpec {
    /// Create a spec with the given text and default appearance.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Whether this spec actually draws anything.
    pub fn is_enabled(&self) -> bool {
        !self.text.is_empty()
    }
}

impl Default for WatermarkSpec {
    fn default() -> Self {
        Self {
            text: String::new(),
            color: RgbaColor::default(),
            font_size: 70.0,
            angle_degrees: -45.0,
            spacing: 260.0,
        }
    }
}

/// Immutable configuration for one conversion run.
///
/// Created by the caller before `JobController::start` and not touched
/// afterwards. Document order is preserved throughout the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Ordered source document paths. Must be non-empty.
    pub documents: Vec<PathBuf>,
    /// Directory the per-page PNGs are written to. Created if absent.
    pub output_dir: PathBuf,
    /// Optional watermark overlay.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark: Option<WatermarkSpec>,
}

impl JobConfig {
    /// Create a config without a watermark.
    pub fn new(documents: Vec<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            documents,
            output_dir: output_dir.into(),
            watermark: None,
        }
    }

    /// Attach a watermark spec (builder pattern).
    pub fn with_watermark(mut self, spec: WatermarkSpec) -> Self {
        self.watermark = Some(spec);
        self
    }

    /// Whether a watermark will actually be drawn on pages.
    pub fn watermark_enabled(&self) -> bool {
        self.watermark.as_ref().is_some_and(|w| w.is_enabled())
    }
}

/// Lifecycle state of a conversion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum JobState {
    /// No run started yet.
    #[default]
    Idle,
    /// Worker is processing documents.
    Running,
    /// Run stopped at a cancellation checkpoint. Terminal.
    Cancelled,
    /// All documents were attempted. Terminal.
    Completed,
}

impl JobState {
    /// Get display string for UI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Running => "Running",
            Self::Cancelled => "Cancelled",
            Self::Completed => "Completed",
        }
    }

    /// Whether the run has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }
}

/// Progress after a document finished (successfully, partially, or skipped).
///
/// `completed_documents` is monotone over a run; `total_documents` is fixed
/// at start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub completed_documents: usize,
    pub total_documents: usize,
}

/// Classification of a recoverable per-document or per-page failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunErrorKind {
    /// The document could not be opened or parsed; the whole document
    /// was skipped.
    DocumentOpen,
    /// One page failed to rasterize; the page was skipped.
    PageRender,
    /// One page failed to encode or persist; its output was skipped.
    ImageWrite,
}

impl RunErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DocumentOpen => "document open",
            Self::PageRender => "page render",
            Self::ImageWrite => "image write",
        }
    }
}

/// A recoverable failure recorded during a run.
///
/// Errors accumulate in occurrence order and never interrupt the document
/// loop; the caller sees them in the final `RunReport`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunError {
    /// Index of the document in `JobConfig::documents`.
    pub document_index: usize,
    /// Page within the document, if the failure was page-level.
    pub page_index: Option<usize>,
    pub kind: RunErrorKind,
    pub message: String,
}

impl RunError {
    pub fn document(document_index: usize, kind: RunErrorKind, message: impl Into<String>) -> Self {
        Self {
            document_index,
            page_index: None,
            kind,
            message: message.into(),
        }
    }

    pub fn page(
        document_index: usize,
        page_index: usize,
        kind: RunErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            document_index,
            page_index: Some(page_index),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.page_index {
            Some(page) => write!(
                f,
                "{} failed for document {} page {}: {}",
                self.kind.as_str(),
                self.document_index,
                page + 1,
                self.message
            ),
            None => write!(
                f,
                "{} failed for document {}: {}",
                self.kind.as_str(),
                self.document_index,
                self.message
            ),
        }
    }
}

/// Terminal result of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// `Completed` or `Cancelled`.
    pub state: JobState,
    /// Recoverable failures, in occurrence order.
    pub errors: Vec<RunError>,
    /// Number of page images successfully written.
    pub pages_written: usize,
}

impl RunReport {
    /// Whether every attempted page converted cleanly.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}
