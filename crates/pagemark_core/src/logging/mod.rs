//! Logging for PageMark.
//!
//! Two layers:
//! - `tracing` for library-level diagnostics (`init_tracing` wires a
//!   default subscriber honoring `RUST_LOG`);
//! - `RunLogger` for the per-run log file written next to the output
//!   images, with an optional UI callback mirroring every line.

mod run_logger;

pub use run_logger::RunLogger;

/// Callback that receives every formatted run log line (for a UI log view).
pub type UiLogCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Install a global tracing subscriber reading the `RUST_LOG` env filter.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
