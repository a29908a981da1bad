//! Progress callbacks for long-running pipeline phases.

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a step's output was taken from the journal.
    fn step_replayed(&self, step: &str);
    /// Called after each paper's extraction settles.
    fn paper_extracted(&self, title: &str, ok: bool, current: usize, total: usize);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn step_replayed(&self, _step: &str) {}
    fn paper_extracted(&self, _title: &str, _ok: bool, _current: usize, _total: usize) {}
}
