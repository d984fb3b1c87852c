use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::broadcast::ProgressChannel;

/// Holds a run lock and releases it exactly once, on [`release`] or drop.
///
/// [`release`]: RunLockGuard::release
pub struct RunLockGuard {
    channel: Arc<dyn ProgressChannel>,
    lock_name: String,
    released: AtomicBool,
}

impl RunLockGuard {
    pub fn new(channel: Arc<dyn ProgressChannel>, lock_name: String) -> Self {
        Self {
            channel,
            lock_name,
            released: AtomicBool::new(false),
        }
    }

    pub fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.channel.release_lock(&self.lock_name) {
            log::error!("Failed to release {}: {}", self.lock_name, e);
        } else {
            log::debug!("Released {}", self.lock_name);
        }
    }
}

impl Drop for RunLockGuard {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::InMemoryChannel;
    use std::time::Duration;

    #[test]
    fn test_drop_releases_lock() {
        let channel = Arc::new(InMemoryChannel::new(Duration::from_secs(60), 4));
        let ttl = Duration::from_secs(60);
        assert!(channel.acquire_lock("l", ttl).unwrap());
        {
            let _guard = RunLockGuard::new(channel.clone(), "l".to_string());
            assert!(!channel.acquire_lock("l", ttl).unwrap());
        }
        assert!(channel.acquire_lock("l", ttl).unwrap());
    }

    #[test]
    fn test_release_happens_once() {
        let channel = Arc::new(InMemoryChannel::new(Duration::from_secs(60), 4));
        let ttl = Duration::from_secs(60);
        assert!(channel.acquire_lock("l", ttl).unwrap());
        let guard = RunLockGuard::new(channel.clone(), "l".to_string());
        guard.release();

        // Someone else takes the lock; the guard's drop must not free it.
        assert!(channel.acquire_lock("l", ttl).unwrap());
        drop(guard);
        assert!(!channel.acquire_lock("l", ttl).unwrap());
    }

    #[test]
    fn test_release_on_panic() {
        let channel = Arc::new(InMemoryChannel::new(Duration::from_secs(60), 4));
        let ttl = Duration::from_secs(60);
        assert!(channel.acquire_lock("l", ttl).unwrap());
        let ch = channel.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = RunLockGuard::new(ch, "l".to_string());
            panic!("boom");
        }));
        assert!(result.is_err());
        assert!(channel.acquire_lock("l", ttl).unwrap());
    }
}
