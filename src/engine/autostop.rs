//! Error-driven auto-stop.
//!
//! Tracks how often each failure status code occurs during the current
//! buyer run and halts the buyer once a configured code reaches its
//! trigger count, optionally scheduling a timed resume.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::warn;

use crate::config::AutoStopConfig;
use crate::engine::control::BuyerControl;
use crate::stats;

/// Auto-stop controller. One instance per buyer run; the tally is private
/// to it and never persisted.
pub struct AutoStopController {
    config: AutoStopConfig,
    control: BuyerControl,
    tally: Mutex<HashMap<String, u32>>,
}

impl AutoStopController {
    pub fn new(config: AutoStopConfig, control: BuyerControl) -> Self {
        AutoStopController {
            config,
            control,
            tally: Mutex::new(HashMap::new()),
        }
    }

    /// Current occurrence count for a status code.
    pub fn tally_count(&self, status: &str) -> u32 {
        self.tally
            .lock()
            .unwrap()
            .get(status)
            .copied()
            .unwrap_or(0)
    }

    /// React to one attempt failure. Returns true when the buyer was
    /// stopped by this call.
    pub fn on_failure(&self, status: &str) -> bool {
        let stop_codes = self.config.stop_code_set();
        if stop_codes.is_empty() {
            return false;
        }

        let count = {
            let mut tally = self.tally.lock().unwrap();
            let slot = tally.entry(status.to_string()).or_insert(0);
            *slot += 1;
            *slot
        };

        if !stop_codes.contains(status) || count < self.config.trigger_count {
            return false;
        }

        warn!(status, count, "Auto-stop threshold reached");
        stats::progress(&format!(
            "[!!!] Autostopping bot since error code {status} has occured {count} times"
        ));

        // Full reset: unrelated codes lose their counts too. Kept as-is,
        // callers depend on the observable behaviour.
        self.tally.lock().unwrap().clear();
        self.control.stop();

        if let Some(resume) = &self.config.resume_after {
            let pause_secs = resume.sample_secs();
            stats::progress(&format!("Bot will resume after {pause_secs}(s)"));

            let token = self.control.resume_token();
            let control = self.control.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(pause_secs)).await;
                control.resume_if_current(token);
            });
        }

        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DelaySpec;

    fn config(codes: &str, trigger_count: u32, resume_after: Option<DelaySpec>) -> AutoStopConfig {
        AutoStopConfig {
            stop_error_codes: codes.to_string(),
            trigger_count,
            resume_after,
        }
    }

    #[test]
    fn test_no_stop_codes_means_no_action() {
        let control = BuyerControl::new(true);
        let autostop = AutoStopController::new(config("", 1, None), control.clone());

        for _ in 0..10 {
            assert!(!autostop.on_failure("458"));
        }
        assert!(control.is_running());
        assert_eq!(autostop.tally_count("458"), 0);
    }

    #[tokio::test]
    async fn test_threshold_stops_and_clears_all_tallies() {
        let control = BuyerControl::new(true);
        let autostop = AutoStopController::new(config("458,463", 3, None), control.clone());

        // An unrelated code accumulated earlier.
        assert!(!autostop.on_failure("999"));
        assert_eq!(autostop.tally_count("999"), 1);

        assert!(!autostop.on_failure("458"));
        assert!(!autostop.on_failure("458"));
        assert!(autostop.on_failure("458"));

        assert!(!control.is_running());
        // Full clear, including the unrelated code.
        assert_eq!(autostop.tally_count("458"), 0);
        assert_eq!(autostop.tally_count("999"), 0);
    }

    #[test]
    fn test_non_member_code_never_stops() {
        let control = BuyerControl::new(true);
        let autostop = AutoStopController::new(config("458", 2, None), control.clone());

        for _ in 0..5 {
            assert!(!autostop.on_failure("521"));
        }
        assert!(control.is_running());
        assert_eq!(autostop.tally_count("521"), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_resume_restarts_buyer() {
        let control = BuyerControl::new(true);
        let autostop = AutoStopController::new(
            config("458", 1, Some(DelaySpec::Fixed(30))),
            control.clone(),
        );

        assert!(autostop.on_failure("458"));
        assert!(!control.is_running());

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(control.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_stop_invalidates_scheduled_resume() {
        let control = BuyerControl::new(true);
        let autostop = AutoStopController::new(
            config("458", 1, Some(DelaySpec::Fixed(30))),
            control.clone(),
        );

        assert!(autostop.on_failure("458"));
        // Operator stops again before the timer fires.
        control.stop();

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(!control.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_restart_before_resume_is_safe() {
        let control = BuyerControl::new(true);
        let autostop = AutoStopController::new(
            config("458", 1, Some(DelaySpec::Fixed(30))),
            control.clone(),
        );

        assert!(autostop.on_failure("458"));
        control.start();

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(control.is_running());
    }
}
