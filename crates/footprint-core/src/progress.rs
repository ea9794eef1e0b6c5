use std::sync::Mutex;

pub trait ProgressObserver: Sync {
    fn on_progress(&self, percent: u8, message: &str);
}

impl<F> ProgressObserver for F
where
    F: Fn(u8, &str) + Sync,
{
    fn on_progress(&self, percent: u8, message: &str) {
        self(percent, message)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&self, _percent: u8, _message: &str) {}
}

/// Forwards progress to an observer, never letting the percentage go
/// backwards and capping it at 100.
///
/// The lock is held across the callback so concurrent reporters are
/// delivered in order.
pub struct ProgressTracker<'a> {
    observer: &'a dyn ProgressObserver,
    last: Mutex<u8>,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(observer: &'a dyn ProgressObserver) -> Self {
        Self {
            observer,
            last: Mutex::new(0),
        }
    }

    pub fn report(&self, percent: u8, message: &str) {
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let bounded = percent.min(100).max(*last);
        *last = bounded;
        self.observer.on_progress(bounded, message);
    }

    /// Reports step `done` of `total` mapped onto the `start..=end` band.
    pub fn report_step(&self, start: u8, end: u8, done: usize, total: usize, message: &str) {
        let span = u64::from(end.saturating_sub(start));
        let offset = if total == 0 {
            span
        } else {
            span * done.min(total) as u64 / total as u64
        };
        let percent = u64::from(start) + offset;
        self.report(u8::try_from(percent).unwrap_or(100), message);
    }
}
