//! Progress bar rendering for the issue comment.
//!
//! The orchestrator reports a monotone percentage plus a cumulative log of
//! human-readable action lines; this module turns that pair into the
//! comment body. No HTTP happens here.

/// Width of the rendered bar in cells.
const BAR_WIDTH: usize = 20;

/// Render the progress comment body for `percent` (clamped to 0-100) and
/// the cumulative action log.
pub fn render_progress_bar(percent: u32, log: &str) -> String {
    let percent = percent.min(100);
    let filled = (percent as usize * BAR_WIDTH) / 100;
    let bar: String = "█".repeat(filled) + &"░".repeat(BAR_WIDTH - filled);

    if log.is_empty() {
        format!("{bar} {percent}%")
    } else {
        format!("{bar} {percent}%\n\n{log}")
    }
}
