//! Progress reporting for batch analysis.
//!
//! The pipeline reports one unit per zone through [`ProgressCallback`];
//! the CLI renders it as a progress bar, tests pass [`NullProgress`].

use std::sync::Arc;

/// Receives progress updates from a batch run.
///
/// Implementations must be `Send + Sync` because zones are analysed
/// concurrently.
pub trait ProgressCallback: Send + Sync {
    /// Sets the number of zones in the batch.
    fn set_total(&self, total: u64);

    /// Marks `delta` more zones as done.
    fn inc(&self, delta: u64);

    /// Replaces the status message.
    fn set_message(&self, msg: String);

    /// Marks the batch as finished.
    fn finish(&self, msg: String);
}

/// Discards all progress updates.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// A shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
