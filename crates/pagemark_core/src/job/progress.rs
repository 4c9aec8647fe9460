//! Progress display formatting.

/// Format a progress snapshot as `"{completed}/{total} ({percent}%)"`.
///
/// Percent uses floor integer division. A run with zero documents
/// reports 0% instead of dividing.
pub fn format_progress(completed: usize, total: usize) -> String {
    let percent = if total == 0 { 0 } else { completed * 100 / total };
    format!("{}/{} ({}%)", completed, total, percent)
}
