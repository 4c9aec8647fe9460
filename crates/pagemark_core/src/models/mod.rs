//! Data models for PageMark.
//!
//! This module contains the core data structures used throughout a
//! conversion run:
//! - Job configuration (source documents, output directory, watermark)
//! - Watermark parameters and colors
//! - Run state, progress snapshots, and accumulated errors

mod color;
mod job;

pub use color::RgbaColor;
pub use job::{
    JobConfig, JobState, ProgressSnapshot, RunError, RunErrorKind, RunReport, WatermarkSpec,
};
