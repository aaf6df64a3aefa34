//! Purchase-outcome reaction engine.
//!
//! The evaluator interprets each resolved buy/bid attempt and drives all
//! side effects; the auto-stop controller halts the buyer on repeated
//! error codes; the control handle carries the running/stopped state.

pub mod autostop;
pub mod control;
pub mod evaluator;

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Shared view of the operator's current coin balance, updated by the
/// surrounding system and read by the evaluator for notifications and
/// the coin-floor check.
#[derive(Clone, Default)]
pub struct CoinBalance(Arc<AtomicI64>);

impl CoinBalance {
    pub fn new(coins: i64) -> Self {
        CoinBalance(Arc::new(AtomicI64::new(coins)))
    }

    pub fn get(&self) -> i64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, coins: i64) {
        self.0.store(coins, Ordering::Relaxed);
    }
}
