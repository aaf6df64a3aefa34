//! Shared types for the auto-buyer.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that the store, pricing,
//! and engine modules can depend on them without circular references.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel resale price meaning "not eligible for forced listing by price".
pub const NO_LIST_PRICE: i64 = -1;

/// Card-count setting value meaning "no purchase target" (unbounded).
pub const UNBOUNDED_CARD_COUNT: u32 = 1000;

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// The marketplace item a purchase attempt targets.
///
/// The host system hands over a much richer object; the pipeline only
/// reads the rating (for the resale rating gate) and the discard value
/// (for quick-sell profit).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerCard {
    pub id: u64,
    /// Overall rating, used against the configured resale threshold.
    pub rating: u32,
    /// Coins returned by a quick-sell (discard).
    pub discard_value: i64,
}

impl PlayerCard {
    /// Helper to build a test card with sensible defaults.
    #[cfg(test)]
    pub fn sample(rating: u32) -> Self {
        PlayerCard {
            id: 158_023,
            rating,
            discard_value: 672,
        }
    }
}

// ---------------------------------------------------------------------------
// Attempts and results
// ---------------------------------------------------------------------------

/// One buy/bid attempt, immutable input for a single resolution event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseAttempt {
    pub card: PlayerCard,
    /// Display name as shown in logs and notifications.
    pub name: String,
    /// Price the attempt was made at, in coins.
    pub price: i64,
    /// Initial target resale price, in coins.
    pub sell_price: i64,
    /// True for an immediate "buy it now" purchase, false for an auction bid.
    pub is_bin: bool,
    pub trade_id: u64,
}

impl fmt::Display for PurchaseAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {} ({})",
            self.name.trim(),
            self.price,
            if self.is_bin { "bin" } else { "bid" },
        )
    }
}

/// Resolution of a purchase attempt, produced exactly once per attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptResult {
    pub success: bool,
    /// Marketplace error code, when the backend supplied one.
    #[serde(default)]
    pub error_code: Option<String>,
    /// Raw status field, the fallback when no error code is present.
    #[serde(default)]
    pub status: Option<String>,
}

impl AttemptResult {
    pub fn ok() -> Self {
        AttemptResult {
            success: true,
            error_code: None,
            status: None,
        }
    }

    pub fn failed(status: &str) -> Self {
        AttemptResult {
            success: false,
            error_code: Some(status.to_string()),
            status: None,
        }
    }

    /// The status string used for logging and auto-stop tallying:
    /// the error code when present, else the raw status field.
    pub fn status_string(&self) -> String {
        self.error_code
            .clone()
            .or_else(|| self.status.clone())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// A resolved attempt as delivered by the submission layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedAttempt {
    pub attempt: PurchaseAttempt,
    pub result: AttemptResult,
}

// ---------------------------------------------------------------------------
// Sell queue
// ---------------------------------------------------------------------------

/// An acquired item queued for the external selling subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellQueueEntry {
    pub card: PlayerCard,
    pub name: String,
    pub sell_price: i64,
    pub should_list: bool,
    pub profit: f64,
}

// ---------------------------------------------------------------------------
// Session stats
// ---------------------------------------------------------------------------

/// Session-wide search statistics, read-only from the pipeline's
/// perspective; used only for notification text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionStats {
    pub search_count: u64,
    pub profit: i64,
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Fixed-width left-padded price text (width 6), for aligned logs and
/// notifications. Presentation only, never a numeric semantic.
pub fn format_price(price: i64) -> String {
    format!("{price:>6}")
}

/// Thousands-grouped coin amount, e.g. 1234567 -> "1,234,567".
pub fn group_coins(amount: i64) -> String {
    let negative = amount < 0;
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        let remaining = digits.len() - i;
        if i > 0 && remaining % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if negative {
        format!("-{grouped}")
    } else {
        grouped
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
