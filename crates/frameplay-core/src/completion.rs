//! Deferred delivery of end-of-stream.
//!
//! EOS arrives on the runtime's bus-dispatch context, but the host expects the
//! completion notification on the thread that polls playback position. The
//! tracker is a depth-1, latest-wins mailbox between the two: the bus handler
//! raises a flag, the next position query takes it.

use parking_lot::Mutex;

/// Pending-until-observed completion flag.
#[derive(Debug, Default)]
pub struct CompletionTracker {
    pending: Mutex<bool>,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an end-of-stream. Repeated signals before a drain collapse into one.
    pub fn signal(&self) {
        *self.pending.lock() = true;
    }

    /// Tests and clears the flag in one step.
    pub fn take(&self) -> bool {
        std::mem::take(&mut *self.pending.lock())
    }

    pub fn is_pending(&self) -> bool {
        *self.pending.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_take_clears() {
        let tracker = CompletionTracker::new();
        assert!(!tracker.take());
        tracker.signal();
        assert!(tracker.is_pending());
        assert!(tracker.take());
        assert!(!tracker.take());
    }

    #[test]
    fn test_duplicate_signals_collapse() {
        let tracker = CompletionTracker::new();
        tracker.signal();
        tracker.signal();
        assert!(tracker.take());
        assert!(!tracker.take());
    }

    #[test]
    fn test_cross_thread_signal() {
        let tracker = Arc::new(CompletionTracker::new());
        let signaller = {
            let tracker = Arc::clone(&tracker);
            thread::spawn(move || tracker.signal())
        };
        signaller.join().unwrap();
        assert!(tracker.take());
    }
}
