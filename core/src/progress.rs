//! Host-facing status and cancellation interface.

/// Callbacks a running job uses to report status text and coarse progress,
/// and to poll the host's cooperative is-running flag.
///
/// The flag is checked between ticks and at the progress granularity inside
/// the per-corpus loop; once it turns false the current tick returns without
/// emitting further results.
pub trait StatusHandler {
    fn set_status(&mut self, _status: &str) {}

    /// Progress as a fraction in `[0, 1]` of the current phase.
    fn set_progress(&mut self, _progress: f32) {}

    fn is_running(&self) -> bool {
        true
    }
}

/// Status handler that ignores everything and never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStatus;

impl StatusHandler for NullStatus {}
