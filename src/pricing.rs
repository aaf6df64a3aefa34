//! Market resale-price lookup.
//!
//! Defines the `PricingAdvisor` trait and the FutBin-backed implementation
//! used to refresh a won item's resale price before listing.
//!
//! Base URL: https://www.futbin.com/25/playerPrices
//! Prices come back as comma-grouped strings per console platform.

use anyhow::{Context, Result};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use tracing::debug;

use crate::types::PlayerCard;

const BASE_URL: &str = "https://www.futbin.com/25/playerPrices";

/// Timeout on the price lookup; resale pricing must never stall an
/// attempt's completion indefinitely.
const REQUEST_TIMEOUT_SECS: u64 = 10;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Abstraction over market resale-price estimators.
///
/// Implementors return a suggested relist price in coins for the given
/// item. Errors are surfaced to the caller, which keeps its previous
/// price candidate.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PricingAdvisor: Send + Sync {
    async fn sell_price(&self, name: &str, card: &PlayerCard) -> Result<i64>;
}

// ---------------------------------------------------------------------------
// FutBin client
// ---------------------------------------------------------------------------

/// FutBin price client.
pub struct FutbinClient {
    http: Client,
    /// Console platform key: "ps" | "xbox" | "pc".
    platform: String,
}

impl FutbinClient {
    pub fn new(platform: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent("autobuyer/0.1.0")
            .build()
            .context("Failed to build HTTP client for FutBin")?;

        Ok(Self {
            http,
            platform: platform.to_string(),
        })
    }

    /// Parse a comma-grouped FutBin price string ("12,500") into coins.
    fn parse_price_text(raw: &str) -> Result<i64> {
        let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
        cleaned
            .trim()
            .parse()
            .with_context(|| format!("Unparseable FutBin price: {raw:?}"))
    }
}

#[async_trait]
impl PricingAdvisor for FutbinClient {
    async fn sell_price(&self, name: &str, card: &PlayerCard) -> Result<i64> {
        let url = format!("{BASE_URL}?player={}", card.id);
        debug!(url = %url, name, "Fetching FutBin price");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("FutBin price request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            anyhow::bail!("FutBin API error {status} for {name}");
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .context("Failed to parse FutBin price response")?;

        let raw = body[card.id.to_string()]["prices"][&self.platform]["LCPrice"]
            .as_str()
            .with_context(|| format!("price missing for {name} on {}", self.platform))?;

        let price = Self::parse_price_text(raw)?;
        debug!(name, price, "FutBin price resolved");
        Ok(price)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price_text() {
        assert_eq!(FutbinClient::parse_price_text("12,500").unwrap(), 12_500);
        assert_eq!(FutbinClient::parse_price_text("750").unwrap(), 750);
        assert_eq!(
            FutbinClient::parse_price_text("1,200,000").unwrap(),
            1_200_000
        );
    }

    #[test]
    fn test_parse_price_text_rejects_garbage() {
        assert!(FutbinClient::parse_price_text("n/a").is_err());
        assert!(FutbinClient::parse_price_text("").is_err());
    }

    #[test]
    fn test_price_extraction_from_payload() {
        let body: serde_json::Value = serde_json::json!({
            "158023": { "prices": { "ps": { "LCPrice": "45,000" } } }
        });
        let raw = body["158023"]["prices"]["ps"]["LCPrice"].as_str().unwrap();
        assert_eq!(FutbinClient::parse_price_text(raw).unwrap(), 45_000);
    }
}
