//! Conversion job orchestration.
//!
//! `JobController::start` runs the document/page loop on a single
//! background worker thread, emitting one progress snapshot per document
//! and honoring cooperative cancellation at document and page
//! boundaries. Recoverable failures accumulate into the final
//! `RunReport`; the only fatal error is an output directory that cannot
//! be created, surfaced synchronously from `start`.

mod controller;
mod progress;

pub use controller::{CancelHandle, JobController, JobHandle, ProgressCallback, StartError};
pub use progress::format_progress;
