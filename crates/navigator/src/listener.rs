/// Progress reporting used while waiting for navmesh jobs
pub trait Listener {
    /// Total amount of work to be reported
    fn set_progress_range(&mut self, range: usize);

    fn increase_progress(&mut self, increment: usize);
}

/// Listener that ignores all progress
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl Listener for NoopListener {
    fn set_progress_range(&mut self, _range: usize) {}

    fn increase_progress(&mut self, _increment: usize) {}
}
