//! Buyer control handle.
//!
//! Carries the running/stopped state of the automated buyer and the run
//! generation used to invalidate scheduled resumes. Cloning shares the
//! underlying state.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Shared start/stop handle for the automation loop.
///
/// `start` is idempotent: starting an already-running buyer is a no-op.
/// `stop` bumps the run generation, so a resume scheduled before the stop
/// becomes a checked no-op when its timer fires.
#[derive(Clone)]
pub struct BuyerControl {
    inner: Arc<ControlInner>,
}

struct ControlInner {
    running: AtomicBool,
    generation: AtomicU64,
}

impl BuyerControl {
    pub fn new(running: bool) -> Self {
        BuyerControl {
            inner: Arc::new(ControlInner {
                running: AtomicBool::new(running),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Start the buyer. No-op when already running.
    pub fn start(&self) {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            debug!("Buyer already running, start ignored");
        } else {
            info!("Buyer started");
        }
    }

    /// Stop the buyer and invalidate any scheduled resume.
    pub fn stop(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        if self.inner.running.swap(false, Ordering::SeqCst) {
            info!("Buyer stopped");
        } else {
            debug!("Buyer already stopped");
        }
    }

    /// Token identifying the current run generation; capture it when
    /// arming a resume timer.
    pub fn resume_token(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    /// Restart the buyer if the generation still matches `token`.
    /// Stale tokens (a stop happened in between) are ignored.
    pub fn resume_if_current(&self, token: u64) {
        if self.inner.generation.load(Ordering::SeqCst) == token {
            self.start();
        } else {
            debug!(token, "Scheduled resume superseded by a later stop, ignored");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_is_idempotent() {
        let control = BuyerControl::new(true);
        control.start();
        control.start();
        assert!(control.is_running());
    }

    #[test]
    fn test_stop_then_start() {
        let control = BuyerControl::new(true);
        control.stop();
        assert!(!control.is_running());
        control.start();
        assert!(control.is_running());
    }

    #[test]
    fn test_resume_with_current_token_restarts() {
        let control = BuyerControl::new(true);
        control.stop();
        let token = control.resume_token();
        control.resume_if_current(token);
        assert!(control.is_running());
    }

    #[test]
    fn test_resume_with_stale_token_is_noop() {
        let control = BuyerControl::new(true);
        control.stop();
        let token = control.resume_token();
        // Operator stops again before the timer fires.
        control.stop();
        control.resume_if_current(token);
        assert!(!control.is_running());
    }

    #[test]
    fn test_resume_when_already_running_does_not_error() {
        let control = BuyerControl::new(true);
        control.stop();
        let token = control.resume_token();
        // Operator manually restarts before the timer fires.
        control.start();
        control.resume_if_current(token);
        assert!(control.is_running());
    }
}
