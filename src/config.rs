//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs,
//! validated once at session start. Secrets (the Telegram bot token) are
//! referenced by env-var name in the config and resolved at runtime via
//! `std::env::var`.

use anyhow::{Context, Result};
use rand::Rng;
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::fs;
use std::str::FromStr;
use thiserror::Error;

use crate::types::UNBOUNDED_CARD_COUNT;

// ---------------------------------------------------------------------------
// Delay specification
// ---------------------------------------------------------------------------

/// A configured delay: fixed seconds (`"5"`) or a uniform-random range
/// (`"3-8"`), sampled anew on every use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DelaySpec {
    Fixed(u64),
    Range(u64, u64),
}

#[derive(Debug, Error)]
pub enum DelayParseError {
    #[error("empty delay value")]
    Empty,
    #[error("invalid delay value: {0:?}")]
    Invalid(String),
    #[error("delay range minimum {0} exceeds maximum {1}")]
    Inverted(u64, u64),
}

impl FromStr for DelaySpec {
    type Err = DelayParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DelayParseError::Empty);
        }
        match s.split_once('-') {
            Some((lo, hi)) => {
                let lo: u64 = lo
                    .trim()
                    .parse()
                    .map_err(|_| DelayParseError::Invalid(s.to_string()))?;
                let hi: u64 = hi
                    .trim()
                    .parse()
                    .map_err(|_| DelayParseError::Invalid(s.to_string()))?;
                if lo > hi {
                    return Err(DelayParseError::Inverted(lo, hi));
                }
                Ok(DelaySpec::Range(lo, hi))
            }
            None => {
                let secs: u64 = s
                    .parse()
                    .map_err(|_| DelayParseError::Invalid(s.to_string()))?;
                Ok(DelaySpec::Fixed(secs))
            }
        }
    }
}

impl<'de> Deserialize<'de> for DelaySpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl DelaySpec {
    /// Resolve to concrete seconds; ranges draw uniformly each call.
    pub fn sample_secs(&self) -> u64 {
        match *self {
            DelaySpec::Fixed(secs) => secs,
            DelaySpec::Range(lo, hi) => rand::thread_rng().gen_range(lo..=hi),
        }
    }
}

// ---------------------------------------------------------------------------
// Notification preferences
// ---------------------------------------------------------------------------

/// Which outcomes the operator wants pushed. Parsed from the mode string:
/// `"A"` means everything, otherwise `B` enables wins/bids and `L` losses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotificationPrefs {
    pub wins: bool,
    pub losses: bool,
}

impl NotificationPrefs {
    pub fn parse(mode: &str) -> Self {
        if mode == "A" {
            return NotificationPrefs {
                wins: true,
                losses: true,
            };
        }
        NotificationPrefs {
            wins: mode.contains('B'),
            losses: mode.contains('L'),
        }
    }

    pub fn any(&self) -> bool {
        self.wins || self.losses
    }
}

// ---------------------------------------------------------------------------
// Configuration sections
// ---------------------------------------------------------------------------

/// Top-level buyer configuration, one immutable snapshot per session.
#[derive(Debug, Deserialize, Clone)]
pub struct BuyerConfig {
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub sell: SellConfig,
    pub buyer: PurchaseConfig,
    #[serde(default)]
    pub autostop: AutoStopConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct NotifyConfig {
    /// Notification mode string: unset, "A", or any combination of "B"/"L".
    #[serde(default)]
    pub mode: String,
    pub telegram_bot_token_env: Option<String>,
    pub telegram_chat_id_env: Option<String>,
}

impl NotifyConfig {
    pub fn prefs(&self) -> NotificationPrefs {
        NotificationPrefs::parse(&self.mode)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SellConfig {
    /// Items rated above this are never relisted; unset disables the gate.
    pub rating_threshold: Option<u32>,
    /// Prefer a fresh market price estimate over the filter's target price.
    #[serde(default)]
    pub use_market_price: bool,
    /// Refuse forced listing when the buy price eats the resale margin.
    #[serde(default)]
    pub check_buy_price: bool,
    /// Console platform used for market price lookups: "ps" | "xbox" | "pc".
    #[serde(default = "default_platform")]
    pub platform: String,
}

fn default_platform() -> String {
    "ps".to_string()
}

impl Default for SellConfig {
    fn default() -> Self {
        SellConfig {
            rating_threshold: None,
            use_market_price: false,
            check_buy_price: false,
            platform: default_platform(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PurchaseConfig {
    /// Profit is computed against the discard value instead of resale.
    #[serde(default)]
    pub quick_sell: bool,
    /// Coin balance floor; at or below it the buyer is stopped.
    #[serde(default)]
    pub stop_if_coins_below: i64,
    /// Purchase target; 1000 is the "unbounded" sentinel.
    #[serde(default = "default_card_count")]
    pub card_count: u32,
    /// Leave won items where they are instead of queueing them for sale.
    #[serde(default)]
    pub dont_move_won: bool,
    #[serde(default)]
    pub add_buy_delay: bool,
    /// Post-attempt throttle, applied only when `add_buy_delay` is set.
    pub buy_delay: Option<DelaySpec>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AutoStopConfig {
    /// Comma-separated status codes that arm the auto-stop; empty disables.
    #[serde(default)]
    pub stop_error_codes: String,
    /// Occurrences of a single code required to trigger the stop.
    #[serde(default = "default_trigger_count")]
    pub trigger_count: u32,
    /// When set, the buyer restarts itself this long after an auto-stop.
    pub resume_after: Option<DelaySpec>,
}

impl Default for AutoStopConfig {
    fn default() -> Self {
        AutoStopConfig {
            stop_error_codes: String::new(),
            trigger_count: default_trigger_count(),
            resume_after: None,
        }
    }
}

impl AutoStopConfig {
    /// The configured stop set; empty entries are dropped.
    pub fn stop_code_set(&self) -> HashSet<String> {
        self.stop_error_codes
            .split(',')
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn default_card_count() -> u32 {
    UNBOUNDED_CARD_COUNT
}

fn default_trigger_count() -> u32 {
    1
}

impl PurchaseConfig {
    /// Whether a purchase target is configured (1000 means unbounded).
    pub fn has_card_target(&self) -> bool {
        self.card_count != UNBOUNDED_CARD_COUNT
    }
}

impl BuyerConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: BuyerConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_spec_fixed() {
        let spec: DelaySpec = "5".parse().unwrap();
        assert_eq!(spec, DelaySpec::Fixed(5));
        assert_eq!(spec.sample_secs(), 5);
    }

    #[test]
    fn test_delay_spec_range() {
        let spec: DelaySpec = "3-8".parse().unwrap();
        assert_eq!(spec, DelaySpec::Range(3, 8));
        for _ in 0..50 {
            let secs = spec.sample_secs();
            assert!((3..=8).contains(&secs));
        }
    }

    #[test]
    fn test_delay_spec_rejects_inverted_range() {
        let err = "8-3".parse::<DelaySpec>().unwrap_err();
        assert!(matches!(err, DelayParseError::Inverted(8, 3)));
    }

    #[test]
    fn test_delay_spec_rejects_garbage() {
        assert!("".parse::<DelaySpec>().is_err());
        assert!("abc".parse::<DelaySpec>().is_err());
        assert!("1-x".parse::<DelaySpec>().is_err());
    }

    #[test]
    fn test_notification_prefs() {
        assert_eq!(
            NotificationPrefs::parse("A"),
            NotificationPrefs {
                wins: true,
                losses: true
            }
        );
        assert_eq!(
            NotificationPrefs::parse("B"),
            NotificationPrefs {
                wins: true,
                losses: false
            }
        );
        assert_eq!(
            NotificationPrefs::parse("BL"),
            NotificationPrefs {
                wins: true,
                losses: true
            }
        );
        assert!(!NotificationPrefs::parse("").any());
    }

    #[test]
    fn test_stop_code_set_parsing() {
        let autostop = AutoStopConfig {
            stop_error_codes: "458, 463,,521".to_string(),
            trigger_count: 3,
            resume_after: None,
        };
        let set = autostop.stop_code_set();
        assert_eq!(set.len(), 3);
        assert!(set.contains("458"));
        assert!(set.contains("463"));
        assert!(set.contains("521"));
    }

    #[test]
    fn test_full_config_from_toml() {
        let toml_src = r#"
            [notify]
            mode = "A"

            [sell]
            rating_threshold = 84
            use_market_price = true
            check_buy_price = true

            [buyer]
            quick_sell = false
            stop_if_coins_below = 1000
            card_count = 5
            add_buy_delay = true
            buy_delay = "2-6"

            [autostop]
            stop_error_codes = "458,463"
            trigger_count = 3
            resume_after = "30"
        "#;
        let cfg: BuyerConfig = toml::from_str(toml_src).unwrap();
        assert!(cfg.notify.prefs().wins);
        assert_eq!(cfg.sell.rating_threshold, Some(84));
        assert!(cfg.buyer.has_card_target());
        assert_eq!(cfg.buyer.buy_delay, Some(DelaySpec::Range(2, 6)));
        assert_eq!(cfg.autostop.resume_after, Some(DelaySpec::Fixed(30)));
    }

    #[test]
    fn test_minimal_config_defaults() {
        let cfg: BuyerConfig = toml::from_str("[buyer]\n").unwrap();
        assert!(!cfg.notify.prefs().any());
        assert_eq!(cfg.buyer.card_count, UNBOUNDED_CARD_COUNT);
        assert!(!cfg.buyer.has_card_target());
        assert!(cfg.autostop.stop_code_set().is_empty());
        assert_eq!(cfg.autostop.trigger_count, 1);
    }
}
