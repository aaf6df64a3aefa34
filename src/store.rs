//! Persistent counter store.
//!
//! Owns every counter, queue, and index the pipeline touches, behind one
//! explicit state object with atomic increment/append operations.
//! Saves and loads the whole state to/from a JSON file, the same way the
//! session is persisted elsewhere in this codebase family: JSON is
//! sufficient for the core persistence requirement.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::types::{SellQueueEntry, SessionStats};

/// Default state file path.
const DEFAULT_STORE_FILE: &str = "autobuyer_state.json";

/// Filter name used when no filter is active.
pub const DEFAULT_FILTER: &str = "default";

/// The named session counters. Monotone; reset only by an external
/// session boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Purchased,
    Win,
    Bid,
    Loss,
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreState {
    purchased_card_count: u64,
    win_count: u64,
    bid_count: u64,
    loss_count: u64,
    sell_queue: Vec<SellQueueEntry>,
    current_filter: Option<String>,
    /// Filter name -> trade ids of currently active bids placed under it.
    filter_bid_items: BTreeMap<String, BTreeSet<u64>>,
    session_stats: SessionStats,
}

/// Session store. One instance per run; all access goes through the lock
/// so increments are read-modify-write atomic even if callers overlap.
pub struct SessionStore {
    inner: Mutex<StoreState>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        SessionStore {
            inner: Mutex::new(StoreState::default()),
        }
    }

    // -- Counters ---------------------------------------------------------

    /// Increment a counter and return the new value.
    pub fn incr_and_get(&self, counter: Counter) -> u64 {
        let mut state = self.inner.lock().unwrap();
        let slot = match counter {
            Counter::Purchased => &mut state.purchased_card_count,
            Counter::Win => &mut state.win_count,
            Counter::Bid => &mut state.bid_count,
            Counter::Loss => &mut state.loss_count,
        };
        *slot += 1;
        *slot
    }

    pub fn get(&self, counter: Counter) -> u64 {
        let state = self.inner.lock().unwrap();
        match counter {
            Counter::Purchased => state.purchased_card_count,
            Counter::Win => state.win_count,
            Counter::Bid => state.bid_count,
            Counter::Loss => state.loss_count,
        }
    }

    // -- Sell queue -------------------------------------------------------

    pub fn push_sell_queue(&self, entry: SellQueueEntry) {
        let mut state = self.inner.lock().unwrap();
        state.sell_queue.push(entry);
    }

    pub fn sell_queue_len(&self) -> usize {
        self.inner.lock().unwrap().sell_queue.len()
    }

    /// Hand the queued items over to the selling subsystem, emptying the
    /// queue.
    pub fn drain_sell_queue(&self) -> Vec<SellQueueEntry> {
        let mut state = self.inner.lock().unwrap();
        std::mem::take(&mut state.sell_queue)
    }

    // -- Filters and bid tracking ----------------------------------------

    pub fn set_current_filter(&self, name: Option<String>) {
        self.inner.lock().unwrap().current_filter = name;
    }

    /// The active filter name, `"default"` when none is set.
    pub fn current_filter(&self) -> String {
        self.inner
            .lock()
            .unwrap()
            .current_filter
            .clone()
            .unwrap_or_else(|| DEFAULT_FILTER.to_string())
    }

    /// Associate a winning bid's trade id with the filter active at bid
    /// time; the filter's set is created on first use.
    pub fn register_bid(&self, filter: &str, trade_id: u64) {
        let mut state = self.inner.lock().unwrap();
        state
            .filter_bid_items
            .entry(filter.to_string())
            .or_default()
            .insert(trade_id);
    }

    pub fn bids_for(&self, filter: &str) -> BTreeSet<u64> {
        self.inner
            .lock()
            .unwrap()
            .filter_bid_items
            .get(filter)
            .cloned()
            .unwrap_or_default()
    }

    // -- Session stats ----------------------------------------------------

    pub fn session_stats(&self) -> SessionStats {
        self.inner.lock().unwrap().session_stats.clone()
    }

    pub fn set_session_stats(&self, stats: SessionStats) {
        self.inner.lock().unwrap().session_stats = stats;
    }

    // -- Persistence ------------------------------------------------------

    /// Save the store to a JSON file.
    pub fn save(&self, path: Option<&str>) -> Result<()> {
        let path = path.unwrap_or(DEFAULT_STORE_FILE);
        let state = self.inner.lock().unwrap().clone();
        let json =
            serde_json::to_string_pretty(&state).context("Failed to serialise session store")?;

        std::fs::write(path, &json).context(format!("Failed to write store to {path}"))?;

        debug!(path, wins = state.win_count, "Session store saved");
        Ok(())
    }

    /// Load the store from a JSON file, starting fresh if it doesn't exist.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let path = path.unwrap_or(DEFAULT_STORE_FILE);

        if !Path::new(path).exists() {
            info!(path, "No saved session store found, starting fresh");
            return Ok(SessionStore::new());
        }

        let json =
            std::fs::read_to_string(path).context(format!("Failed to read store from {path}"))?;

        let state: StoreState =
            serde_json::from_str(&json).context(format!("Failed to parse store from {path}"))?;

        info!(
            path,
            purchased = state.purchased_card_count,
            wins = state.win_count,
            bids = state.bid_count,
            losses = state.loss_count,
            "Session store loaded from disk"
        );

        Ok(SessionStore {
            inner: Mutex::new(state),
        })
    }

    /// Delete the store file (for testing or reset).
    pub fn delete(path: Option<&str>) -> Result<()> {
        let path = path.unwrap_or(DEFAULT_STORE_FILE);
        if Path::new(path).exists() {
            std::fs::remove_file(path).context(format!("Failed to delete store file {path}"))?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PlayerCard;

    fn temp_path() -> String {
        let mut p = std::env::temp_dir();
        p.push(format!("autobuyer_test_store_{}.json", uuid::Uuid::new_v4()));
        p.to_string_lossy().to_string()
    }

    fn entry(name: &str) -> SellQueueEntry {
        SellQueueEntry {
            card: PlayerCard::sample(82),
            name: name.to_string(),
            sell_price: 12_000,
            should_list: true,
            profit: 1_400.0,
        }
    }

    #[test]
    fn test_incr_and_get_returns_new_value() {
        let store = SessionStore::new();
        assert_eq!(store.incr_and_get(Counter::Win), 1);
        assert_eq!(store.incr_and_get(Counter::Win), 2);
        assert_eq!(store.get(Counter::Win), 2);
        assert_eq!(store.get(Counter::Loss), 0);
    }

    #[test]
    fn test_counters_are_independent() {
        let store = SessionStore::new();
        store.incr_and_get(Counter::Purchased);
        store.incr_and_get(Counter::Bid);
        store.incr_and_get(Counter::Bid);
        assert_eq!(store.get(Counter::Purchased), 1);
        assert_eq!(store.get(Counter::Bid), 2);
        assert_eq!(store.get(Counter::Win), 0);
    }

    #[test]
    fn test_sell_queue_push_and_drain() {
        let store = SessionStore::new();
        store.push_sell_queue(entry("Kante"));
        store.push_sell_queue(entry("Saka"));
        assert_eq!(store.sell_queue_len(), 2);

        let drained = store.drain_sell_queue();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].name, "Kante");
        assert_eq!(store.sell_queue_len(), 0);
    }

    #[test]
    fn test_register_bid_creates_filter_set() {
        let store = SessionStore::new();
        assert!(store.bids_for("gold-strikers").is_empty());

        store.register_bid("gold-strikers", 42);
        store.register_bid("gold-strikers", 43);
        store.register_bid("gold-strikers", 42); // duplicate, set semantics

        let bids = store.bids_for("gold-strikers");
        assert_eq!(bids.len(), 2);
        assert!(bids.contains(&42));
    }

    #[test]
    fn test_current_filter_defaults() {
        let store = SessionStore::new();
        assert_eq!(store.current_filter(), "default");

        store.set_current_filter(Some("icons".to_string()));
        assert_eq!(store.current_filter(), "icons");

        store.set_current_filter(None);
        assert_eq!(store.current_filter(), "default");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let path = temp_path();
        let store = SessionStore::new();
        store.incr_and_get(Counter::Win);
        store.incr_and_get(Counter::Purchased);
        store.push_sell_queue(entry("Modric"));
        store.register_bid("default", 7);
        store.set_session_stats(SessionStats {
            search_count: 120,
            profit: 4_500,
        });
        store.save(Some(&path)).unwrap();

        let loaded = SessionStore::load(Some(&path)).unwrap();
        assert_eq!(loaded.get(Counter::Win), 1);
        assert_eq!(loaded.get(Counter::Purchased), 1);
        assert_eq!(loaded.sell_queue_len(), 1);
        assert!(loaded.bids_for("default").contains(&7));
        assert_eq!(loaded.session_stats().search_count, 120);

        SessionStore::delete(Some(&path)).unwrap();
    }

    #[test]
    fn test_load_nonexistent_starts_fresh() {
        let store = SessionStore::load(Some("/tmp/autobuyer_nonexistent_98765.json")).unwrap();
        assert_eq!(store.get(Counter::Win), 0);
        assert_eq!(store.sell_queue_len(), 0);
    }

    #[test]
    fn test_delete_nonexistent_ok() {
        assert!(SessionStore::delete(Some("/tmp/autobuyer_does_not_exist_xyz.json")).is_ok());
    }
}
