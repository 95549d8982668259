//! Keep-device-awake collaborator

use std::sync::Arc;

use anyhow::Result;

/// Platform hook that keeps the device awake while a phase is running
pub trait WakeLock: Send + Sync {
    fn acquire(&self) -> Result<()>;
    fn release(&self) -> Result<()>;
}

/// Wake lock for hosts that have nothing to keep awake
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopWakeLock;

impl WakeLock for NoopWakeLock {
    fn acquire(&self) -> Result<()> {
        Ok(())
    }

    fn release(&self) -> Result<()> {
        Ok(())
    }
}

/// Idempotent wrapper around a [`WakeLock`]
///
/// Redundant acquire/release calls never reach the platform. Failures are
/// logged and otherwise ignored; the timer keeps running either way.
pub struct WakeLockGuard {
    inner: Arc<dyn WakeLock>,
    held: bool,
}

impl WakeLockGuard {
    pub fn new(inner: Arc<dyn WakeLock>) -> Self {
        Self { inner, held: false }
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn acquire(&mut self) {
        if self.held {
            return;
        }
        match self.inner.acquire() {
            Ok(()) => {
                self.held = true;
                tracing::debug!("Wake lock acquired");
            }
            Err(e) => tracing::error!("Failed to acquire wake lock: {:#}", e),
        }
    }

    pub fn release(&mut self) {
        if !self.held {
            return;
        }
        // Considered released even if the platform call fails
        self.held = false;
        match self.inner.release() {
            Ok(()) => tracing::debug!("Wake lock released"),
            Err(e) => tracing::error!("Failed to release wake lock: {:#}", e),
        }
    }
}

impl Drop for WakeLockGuard {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingWakeLock {
        acquired: AtomicUsize,
        released: AtomicUsize,
    }

    impl WakeLock for CountingWakeLock {
        fn acquire(&self) -> Result<()> {
            self.acquired.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn release(&self) -> Result<()> {
            self.released.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct BrokenWakeLock;

    impl WakeLock for BrokenWakeLock {
        fn acquire(&self) -> Result<()> {
            anyhow::bail!("no permission")
        }

        fn release(&self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_redundant_calls_are_swallowed() {
        let lock = Arc::new(CountingWakeLock::default());
        let mut guard = WakeLockGuard::new(lock.clone());

        guard.acquire();
        guard.acquire();
        assert!(guard.is_held());
        guard.release();
        guard.release();

        assert_eq!(lock.acquired.load(Ordering::SeqCst), 1);
        assert_eq!(lock.released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases() {
        let lock = Arc::new(CountingWakeLock::default());
        {
            let mut guard = WakeLockGuard::new(lock.clone());
            guard.acquire();
        }
        assert_eq!(lock.released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_acquire_is_not_held() {
        let mut guard = WakeLockGuard::new(Arc::new(BrokenWakeLock));
        guard.acquire();
        assert!(!guard.is_held());
    }
}
