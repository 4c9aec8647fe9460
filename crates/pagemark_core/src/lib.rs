//! PageMark Core - Backend logic for the PageMark batch converter
//!
//! This crate contains all conversion logic with zero UI dependencies:
//! document traversal, page rasterization orchestration, watermark
//! compositing, output persistence, and the cancellable job runner.
//! It can be used by the GUI application or a CLI tool.

pub mod config;
pub mod job;
pub mod logging;
pub mod models;
pub mod output;
pub mod render;
pub mod watermark;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
