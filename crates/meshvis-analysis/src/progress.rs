//! Progress reporting.

/// Receives coarse progress updates from [`analyze`](crate::analyze).
pub trait Progress {
    /// Called at each stage transition with a percentage in `0..=100`.
    fn report(&mut self, percent: u8, label: &str);
}

impl<F: FnMut(u8, &str)> Progress for F {
    fn report(&mut self, percent: u8, label: &str) {
        self(percent, label)
    }
}

/// Discards all progress updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn report(&mut self, _percent: u8, _label: &str) {}
}

/// Forwards progress updates to the `log` facade at `info` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl Progress for LogProgress {
    fn report(&mut self, percent: u8, label: &str) {
        log::info!("[{percent:>3}%] {label}");
    }
}
