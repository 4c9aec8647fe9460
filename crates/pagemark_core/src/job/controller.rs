//! Job controller: starts, cancels, and reports on conversion runs.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use thiserror::Error;

use super::progress::format_progress;
use crate::config::Settings;
use crate::logging::{RunLogger, UiLogCallback};
use crate::models::{
    JobConfig, JobState, ProgressSnapshot, RunError, RunErrorKind, RunReport,
};
use crate::output::{document_base_name, OutputWriter, WriteError};
use crate::render::PageRenderer;
use crate::watermark::{TextRenderer, WatermarkCompositor};

/// Callback invoked on the worker thread after each document finishes.
pub type ProgressCallback = Box<dyn Fn(ProgressSnapshot) + Send + Sync>;

/// Handle for requesting cooperative cancellation of a running job.
///
/// The flag is polled by the worker before each document and before each
/// page, so cancellation takes effect no later than the end of the page
/// unit currently in flight. `cancel` is idempotent and non-blocking.
#[derive(Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Errors that abort a run before any document is processed.
#[derive(Error, Debug)]
pub enum StartError {
    /// The config carries no source documents.
    #[error("job has no source documents")]
    NoDocuments,

    /// The output directory could not be created. The single fatal,
    /// job-level error.
    #[error(transparent)]
    OutputDir(WriteError),

    /// The worker thread could not be spawned.
    #[error("failed to spawn conversion worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Orchestrates conversion runs.
///
/// Holds the rasterization and text backends plus settings; each call to
/// `start` spawns one worker thread that owns all run state.
pub struct JobController {
    settings: Settings,
    renderer: Arc<dyn PageRenderer>,
    text: Arc<dyn TextRenderer>,
}

impl JobController {
    pub fn new(
        settings: Settings,
        renderer: Arc<dyn PageRenderer>,
        text: Arc<dyn TextRenderer>,
    ) -> Self {
        Self {
            settings,
            renderer,
            text,
        }
    }

    /// Begin a run on a background worker.
    ///
    /// Returns immediately with a handle; the caller thread is never
    /// blocked by conversion work. Fails fast if the config is empty or
    /// the output directory cannot be created.
    pub fn start(
        &self,
        config: JobConfig,
        progress: Option<ProgressCallback>,
        log: Option<UiLogCallback>,
    ) -> Result<JobHandle, StartError> {
        self.start_with_cancel(config, progress, log, CancelHandle::new())
    }

    /// `start` with a caller-supplied cancellation handle, so callbacks
    /// created before the run can already hold it.
    pub fn start_with_cancel(
        &self,
        config: JobConfig,
        progress: Option<ProgressCallback>,
        log: Option<UiLogCallback>,
        cancel: CancelHandle,
    ) -> Result<JobHandle, StartError> {
        if config.documents.is_empty() {
            return Err(StartError::NoDocuments);
        }

        let writer = OutputWriter::new(&config.output_dir);
        writer.ensure_dir().map_err(StartError::OutputDir)?;

        let logger = RunLogger::new(writer.output_dir(), self.settings.logging.clone(), log);

        let compositor = config
            .watermark
            .as_ref()
            .filter(|spec| spec.is_enabled())
            .map(|spec| {
                WatermarkCompositor::new(
                    spec.clone(),
                    Arc::clone(&self.text),
                    (
                        self.settings.render.reference_width,
                        self.settings.render.reference_height,
                    ),
                )
            });

        let state = Arc::new(Mutex::new(JobState::Running));

        let worker = Worker {
            documents: config.documents,
            dpi: self.settings.render.dpi,
            renderer: Arc::clone(&self.renderer),
            compositor,
            writer,
            cancel: cancel.clone(),
            progress,
            logger,
            state: Arc::clone(&state),
        };

        let thread = thread::Builder::new()
            .name("pagemark-worker".to_string())
            .spawn(move || worker.run())?;

        Ok(JobHandle {
            cancel,
            state,
            thread,
        })
    }
}

/// Handle to a running (or finished) conversion job.
pub struct JobHandle {
    cancel: CancelHandle,
    state: Arc<Mutex<JobState>>,
    thread: thread::JoinHandle<RunReport>,
}

impl JobHandle {
    /// Request cooperative cancellation. Idempotent, non-blocking.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Get a clone of the cancellation handle.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Current run state.
    pub fn state(&self) -> JobState {
        *self.state.lock()
    }

    /// Block until the run reaches a terminal state and return its report.
    pub fn wait(self) -> RunReport {
        match self.thread.join() {
            Ok(report) => report,
            Err(_) => {
                tracing::error!("conversion worker panicked");
                *self.state.lock() = JobState::Cancelled;
                RunReport {
                    state: JobState::Cancelled,
                    errors: Vec::new(),
                    pages_written: 0,
                }
            }
        }
    }
}

/// Owns all mutable run state for one conversion.
struct Worker {
    documents: Vec<PathBuf>,
    dpi: u32,
    renderer: Arc<dyn PageRenderer>,
    compositor: Option<WatermarkCompositor>,
    writer: OutputWriter,
    cancel: CancelHandle,
    progress: Option<ProgressCallback>,
    logger: RunLogger,
    state: Arc<Mutex<JobState>>,
}

impl Worker {
    fn run(self) -> RunReport {
        let total = self.documents.len();
        let mut errors: Vec<RunError> = Vec::new();
        let mut pages_written = 0usize;
        let mut completed = 0usize;
        let mut cancelled = false;

        self.logger
            .info(&format!("Starting conversion of {} document(s)", total));
        tracing::info!(documents = total, "conversion run started");

        for (index, path) in self.documents.iter().enumerate() {
            if self.cancel.is_cancelled() {
                self.logger.warn(&format!(
                    "Cancelled before document {}/{}",
                    index + 1,
                    total
                ));
                cancelled = true;
                break;
            }

            self.logger.phase(&path.display().to_string());
            let interrupted =
                self.process_document(index, path, &mut errors, &mut pages_written);

            // The document counts toward progress whether it converted,
            // failed to open, or was interrupted partway through.
            completed += 1;
            let snapshot = ProgressSnapshot {
                completed_documents: completed,
                total_documents: total,
            };
            if let Some(ref callback) = self.progress {
                callback(snapshot);
            }
            self.logger
                .info(&format!("Progress: {}", format_progress(completed, total)));

            if interrupted {
                self.logger.warn("Cancelled mid-document");
                cancelled = true;
                break;
            }
        }

        let state = if cancelled {
            JobState::Cancelled
        } else {
            JobState::Completed
        };
        *self.state.lock() = state;

        self.logger.info(&format!(
            "Run {}: {} page(s) written, {} error(s)",
            state.as_str().to_lowercase(),
            pages_written,
            errors.len()
        ));
        tracing::info!(
            state = state.as_str(),
            pages_written,
            errors = errors.len(),
            "conversion run finished"
        );

        RunReport {
            state,
            errors,
            pages_written,
        }
    }

    /// Convert one document. Returns true when cancellation interrupted
    /// the page loop.
    fn process_document(
        &self,
        index: usize,
        path: &Path,
        errors: &mut Vec<RunError>,
        pages_written: &mut usize,
    ) -> bool {
        let document = match self.renderer.open(path) {
            Ok(doc) => doc,
            Err(e) => {
                self.logger.error(&e.to_string());
                errors.push(RunError::document(
                    index,
                    RunErrorKind::DocumentOpen,
                    e.to_string(),
                ));
                return false;
            }
        };

        let base_name = document_base_name(path);
        let page_count = document.page_count();

        for page in 0..page_count {
            if self.cancel.is_cancelled() {
                return true;
            }

            let mut buffer = match document.render_page(page, self.dpi) {
                Ok(buffer) => buffer,
                Err(e) => {
                    self.logger.error(&e.to_string());
                    errors.push(RunError::page(
                        index,
                        page,
                        RunErrorKind::PageRender,
                        e.to_string(),
                    ));
                    continue;
                }
            };

            if let Some(ref compositor) = self.compositor {
                compositor.apply(&mut buffer);
            }

            match self.writer.write_page(&buffer, &base_name, page) {
                Ok(out_path) => {
                    *pages_written += 1;
                    self.logger.info(&format!("Wrote {}", out_path.display()));
                }
                Err(e) => {
                    self.logger.error(&e.to_string());
                    errors.push(RunError::page(
                        index,
                        page,
                        RunErrorKind::ImageWrite,
                        e.to_string(),
                    ));
                }
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::path::Path;

    use image::RgbaImage;
    use tempfile::tempdir;

    use crate::models::WatermarkSpec;
    use crate::render::{Document, ImageFileRenderer, PageBuffer, RenderError};
    use crate::watermark::test_support::StubTextRenderer;

    // In-memory renderer: page counts per path, optional open/render
    // failures, fixed-size white pages.
    struct MockRenderer {
        page_counts: HashMap<PathBuf, usize>,
        fail_open: HashSet<PathBuf>,
        fail_pages: HashSet<(PathBuf, usize)>,
        cancel_after_first_page: Option<CancelHandle>,
    }

    impl MockRenderer {
        fn new(pages: &[(&str, usize)]) -> Self {
            Self {
                page_counts: pages
                    .iter()
                    .map(|(p, n)| (PathBuf::from(p), *n))
                    .collect(),
                fail_open: HashSet::new(),
                fail_pages: HashSet::new(),
                cancel_after_first_page: None,
            }
        }

        fn failing_open(mut self, path: &str) -> Self {
            self.fail_open.insert(PathBuf::from(path));
            self
        }

        fn failing_page(mut self, path: &str, page: usize) -> Self {
            self.fail_pages.insert((PathBuf::from(path), page));
            self
        }
    }

    struct MockDocument {
        path: PathBuf,
        pages: usize,
        fail_pages: HashSet<(PathBuf, usize)>,
        cancel_after_first_page: Option<CancelHandle>,
    }

    impl Document for MockDocument {
        fn page_count(&self) -> usize {
            self.pages
        }

        fn render_page(&self, index: usize, _dpi: u32) -> Result<PageBuffer, RenderError> {
            if self.fail_pages.contains(&(self.path.clone(), index)) {
                return Err(RenderError::page(index, "synthetic render failure"));
            }
            if index == 0 {
                if let Some(ref handle) = self.cancel_after_first_page {
                    handle.cancel();
                }
            }
            Ok(RgbaImage::from_pixel(16, 16, image::Rgba([255, 255, 255, 255])))
        }
    }

    impl PageRenderer for MockRenderer {
        fn open(&self, path: &Path) -> Result<Box<dyn Document>, RenderError> {
            if self.fail_open.contains(path) {
                return Err(RenderError::open(path, "synthetic open failure"));
            }
            let pages = self
                .page_counts
                .get(path)
                .copied()
                .ok_or_else(|| RenderError::open(path, "unknown document"))?;
            Ok(Box::new(MockDocument {
                path: path.to_path_buf(),
                pages,
                fail_pages: self.fail_pages.clone(),
                cancel_after_first_page: self.cancel_after_first_page.clone(),
            }))
        }
    }

    fn controller(renderer: MockRenderer) -> JobController {
        JobController::new(
            Settings::default(),
            Arc::new(renderer),
            Arc::new(StubTextRenderer::new()),
        )
    }

    fn progress_recorder() -> (Arc<Mutex<Vec<ProgressSnapshot>>>, ProgressCallback) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let callback: ProgressCallback = Box::new(move |snapshot| sink.lock().push(snapshot));
        (events, callback)
    }

    #[test]
    fn two_documents_complete_with_ordered_progress() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let controller = controller(MockRenderer::new(&[("doc1.pdf", 1), ("doc2.pdf", 1)]));

        let config = JobConfig::new(
            vec![PathBuf::from("doc1.pdf"), PathBuf::from("doc2.pdf")],
            &out,
        );
        let (events, callback) = progress_recorder();

        let report = controller
            .start(config, Some(callback), None)
            .unwrap()
            .wait();

        assert_eq!(report.state, JobState::Completed);
        assert!(report.is_clean());
        assert_eq!(report.pages_written, 2);
        assert!(out.join("doc1_1.png").is_file());
        assert!(out.join("doc2_1.png").is_file());

        let events = events.lock();
        assert_eq!(events.len(), 2);
        assert_eq!(
            (events[0].completed_documents, events[0].total_documents),
            (1, 2)
        );
        assert_eq!(
            (events[1].completed_documents, events[1].total_documents),
            (2, 2)
        );
    }

    #[test]
    fn cancel_after_first_document_skips_the_rest() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let controller = controller(MockRenderer::new(&[
            ("a.pdf", 1),
            ("b.pdf", 1),
            ("c.pdf", 1),
        ]));

        let cancel = CancelHandle::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let cancel_in_callback = cancel.clone();
        // Cancel from inside the first progress event; the callback runs
        // on the worker, so the flag is set before document b's check.
        let callback: ProgressCallback = Box::new(move |snapshot| {
            sink.lock().push(snapshot);
            cancel_in_callback.cancel();
        });

        let config = JobConfig::new(
            vec![
                PathBuf::from("a.pdf"),
                PathBuf::from("b.pdf"),
                PathBuf::from("c.pdf"),
            ],
            &out,
        );

        let report = controller
            .start_with_cancel(config, Some(callback), None, cancel)
            .unwrap()
            .wait();

        assert_eq!(report.state, JobState::Cancelled);
        assert_eq!(report.pages_written, 1);
        assert!(out.join("a_1.png").is_file());
        assert!(!out.join("b_1.png").exists());
        assert!(!out.join("c_1.png").exists());
        assert_eq!(events.lock().len(), 1);
    }

    #[test]
    fn cancel_before_start_processes_nothing() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let controller = controller(MockRenderer::new(&[("a.pdf", 2)]));

        let cancel = CancelHandle::new();
        cancel.cancel();

        let (events, callback) = progress_recorder();
        let config = JobConfig::new(vec![PathBuf::from("a.pdf")], &out);

        let report = controller
            .start_with_cancel(config, Some(callback), None, cancel)
            .unwrap()
            .wait();

        assert_eq!(report.state, JobState::Cancelled);
        assert_eq!(report.pages_written, 0);
        assert!(events.lock().is_empty());
        assert!(!out.join("a_1.png").exists());
    }

    #[test]
    fn cancel_mid_document_still_emits_its_snapshot() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");

        let cancel = CancelHandle::new();
        let mut renderer = MockRenderer::new(&[("long.pdf", 3)]);
        renderer.cancel_after_first_page = Some(cancel.clone());
        let controller = controller(renderer);

        let (events, callback) = progress_recorder();
        let config = JobConfig::new(vec![PathBuf::from("long.pdf")], &out);

        let report = controller
            .start_with_cancel(config, Some(callback), None, cancel)
            .unwrap()
            .wait();

        assert_eq!(report.state, JobState::Cancelled);
        // First page finished before the flag was observed; later pages
        // were skipped but the document still produced one snapshot.
        assert_eq!(report.pages_written, 1);
        assert!(out.join("long_1.png").is_file());
        assert!(!out.join("long_2.png").exists());

        let events = events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].completed_documents, 1);
    }

    #[test]
    fn open_failure_is_recorded_and_run_continues() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let controller = controller(
            MockRenderer::new(&[("ok1.pdf", 1), ("ok2.pdf", 1)]).failing_open("broken.pdf"),
        );

        let config = JobConfig::new(
            vec![
                PathBuf::from("ok1.pdf"),
                PathBuf::from("broken.pdf"),
                PathBuf::from("ok2.pdf"),
            ],
            &out,
        );
        let (events, callback) = progress_recorder();

        let report = controller
            .start(config, Some(callback), None)
            .unwrap()
            .wait();

        assert_eq!(report.state, JobState::Completed);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, RunErrorKind::DocumentOpen);
        assert_eq!(report.errors[0].document_index, 1);
        assert!(report.errors[0].page_index.is_none());

        // The failed document still counted toward progress.
        let events = events.lock();
        assert_eq!(events.len(), 3);
        assert_eq!(events[2].completed_documents, 3);

        assert!(out.join("ok1_1.png").is_file());
        assert!(out.join("ok2_1.png").is_file());
    }

    #[test]
    fn page_failure_skips_only_that_page() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let controller =
            controller(MockRenderer::new(&[("doc.pdf", 3)]).failing_page("doc.pdf", 1));

        let config = JobConfig::new(vec![PathBuf::from("doc.pdf")], &out);
        let report = controller.start(config, None, None).unwrap().wait();

        assert_eq!(report.state, JobState::Completed);
        assert_eq!(report.pages_written, 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, RunErrorKind::PageRender);
        assert_eq!(report.errors[0].page_index, Some(1));

        assert!(out.join("doc_1.png").is_file());
        assert!(!out.join("doc_2.png").exists());
        assert!(out.join("doc_3.png").is_file());
    }

    #[test]
    fn write_failure_is_recorded_and_run_continues() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        // Block doc.pdf's output path with a directory so the PNG encode
        // fails; ensure_dir tolerates the pre-created output directory.
        std::fs::create_dir_all(out.join("doc_1.png")).unwrap();

        let controller = controller(MockRenderer::new(&[("doc.pdf", 1), ("other.pdf", 1)]));
        let config = JobConfig::new(
            vec![PathBuf::from("doc.pdf"), PathBuf::from("other.pdf")],
            &out,
        );

        let report = controller.start(config, None, None).unwrap().wait();

        assert_eq!(report.state, JobState::Completed);
        assert_eq!(report.pages_written, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, RunErrorKind::ImageWrite);
        assert_eq!(report.errors[0].document_index, 0);
        assert_eq!(report.errors[0].page_index, Some(0));

        // The blocked page produced no image; the next document still did.
        assert!(out.join("doc_1.png").is_dir());
        assert!(out.join("other_1.png").is_file());
    }

    #[test]
    fn empty_document_list_fails_fast() {
        let dir = tempdir().unwrap();
        let controller = controller(MockRenderer::new(&[]));
        let config = JobConfig::new(Vec::new(), dir.path().join("out"));

        assert!(matches!(
            controller.start(config, None, None),
            Err(StartError::NoDocuments)
        ));
    }

    #[test]
    fn unusable_output_dir_fails_fast() {
        let dir = tempdir().unwrap();
        // A regular file where the output directory should go.
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let controller = controller(MockRenderer::new(&[("doc.pdf", 1)]));
        let config = JobConfig::new(vec![PathBuf::from("doc.pdf")], &blocker);

        assert!(matches!(
            controller.start(config, None, None),
            Err(StartError::OutputDir(_))
        ));
    }

    #[test]
    fn watermarked_run_writes_marked_pages_end_to_end() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let out = dir.path().join("out");
        std::fs::create_dir_all(&src).unwrap();

        // Real PNG inputs through the image-file backend.
        for name in ["page_a.png", "page_b.png"] {
            RgbaImage::from_pixel(300, 420, image::Rgba([255, 255, 255, 255]))
                .save(src.join(name))
                .unwrap();
        }

        let controller = JobController::new(
            Settings::default(),
            Arc::new(ImageFileRenderer::new()),
            Arc::new(StubTextRenderer::new()),
        );

        let config = JobConfig::new(
            vec![src.join("page_a.png"), src.join("page_b.png")],
            &out,
        )
        .with_watermark(WatermarkSpec::with_text("CONFIDENTIAL"));

        let report = controller.start(config, None, None).unwrap().wait();

        assert_eq!(report.state, JobState::Completed);
        assert!(report.is_clean());
        assert_eq!(report.pages_written, 2);

        // Outputs exist, are PNG, and carry watermark pixels.
        let written = image::open(out.join("page_a_1.png")).unwrap().to_rgba8();
        let touched = written
            .pixels()
            .filter(|p| p[0] != 255 || p[1] != 255 || p[2] != 255)
            .count();
        assert!(touched > 0, "watermark should alter page pixels");

        // The run log landed next to the images.
        assert!(out.join("conversion.log").is_file());
    }
}
