use std::path::PathBuf;

/// Structured progress reported by the dataset loader, composer and batch runner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Descriptor computation is starting for `total` candidate files.
    IndexingStarted { total: usize },
    ImageIndexed { filename: String },
    /// The dataset index is ready; `from_cache` tells whether it was read back.
    IndexReady { entries: usize, from_cache: bool },
    JobStarted {
        job: usize,
        input: PathBuf,
        output: PathBuf,
        blocks: u64,
    },
    BlockComposed { job: usize },
    JobFinished { job: usize },
    JobFailed { job: usize, reason: String },
}

/// Receives progress events; implementations must tolerate calls from several threads.
pub trait ProgressObserver: Send + Sync {
    fn on_event(&self, event: ProgressEvent);
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_event(&self, _event: ProgressEvent) {}
}

impl<F> ProgressObserver for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn on_event(&self, event: ProgressEvent) {
        self(event)
    }
}
