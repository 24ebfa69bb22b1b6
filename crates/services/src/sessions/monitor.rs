use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MonitorError {
    #[error("exclusive monitoring unavailable: {0}")]
    Unavailable(String),
}

/// Exclusive screen ownership for a proctored attempt (full screen on a
/// desktop, a raw terminal, ...).
pub trait ScreenMonitor: Send + Sync {
    /// # Errors
    ///
    /// Returns `MonitorError` if exclusivity cannot be obtained.
    fn acquire(&self) -> Result<(), MonitorError>;

    fn release(&self);
}

/// Holds an acquired monitor and releases it exactly once: explicitly via
/// [`MonitorGuard::release`] or when dropped.
pub struct MonitorGuard {
    monitor: Arc<dyn ScreenMonitor>,
    held: bool,
}

impl MonitorGuard {
    /// # Errors
    ///
    /// Returns `MonitorError` if `monitor` refuses exclusivity.
    pub fn acquire(monitor: Arc<dyn ScreenMonitor>) -> Result<Self, MonitorError> {
        monitor.acquire()?;
        tracing::debug!("screen monitor acquired");
        Ok(Self {
            monitor,
            held: true,
        })
    }

    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if self.held {
            self.held = false;
            self.monitor.release();
            tracing::debug!("screen monitor released");
        }
    }
}

impl Drop for MonitorGuard {
    fn drop(&mut self) {
        self.release_once();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        acquired: AtomicUsize,
        released: AtomicUsize,
    }

    impl ScreenMonitor for Counting {
        fn acquire(&self) -> Result<(), MonitorError> {
            self.acquired.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn release(&self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Refusing;

    impl ScreenMonitor for Refusing {
        fn acquire(&self) -> Result<(), MonitorError> {
            Err(MonitorError::Unavailable("no display".into()))
        }

        fn release(&self) {
            panic!("released a monitor that was never acquired");
        }
    }

    #[test]
    fn explicit_release_is_not_repeated_on_drop() {
        let monitor = Arc::new(Counting::default());
        let guard = MonitorGuard::acquire(monitor.clone()).unwrap();
        guard.release();
        assert_eq!(monitor.acquired.load(Ordering::SeqCst), 1);
        assert_eq!(monitor.released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_releases() {
        let monitor = Arc::new(Counting::default());
        {
            let _guard = MonitorGuard::acquire(monitor.clone()).unwrap();
        }
        assert_eq!(monitor.released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn refused_acquire_yields_no_guard() {
        let result = MonitorGuard::acquire(Arc::new(Refusing));
        assert!(matches!(result, Err(MonitorError::Unavailable(_))));
    }
}
