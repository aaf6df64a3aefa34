//! Operator notifications.
//!
//! Defines the `Notifier` trait and a Telegram-backed implementation.
//! Delivery is best-effort: failures are logged and never propagated to
//! the pipeline.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Abstraction over operator notification channels.
///
/// `success` marks the message as a good or bad outcome; channels may use
/// it for styling. Implementations must swallow their own errors.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str, success: bool);
}

// ---------------------------------------------------------------------------
// Telegram
// ---------------------------------------------------------------------------

const TELEGRAM_API: &str = "https://api.telegram.org";

/// Telegram bot notifier.
pub struct TelegramNotifier {
    http: Client,
    bot_token: SecretString,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: SecretString, chat_id: String) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client for Telegram: {e}"))?;

        Ok(Self {
            http,
            bot_token,
            chat_id,
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &str, success: bool) {
        let url = format!(
            "{TELEGRAM_API}/bot{}/sendMessage",
            self.bot_token.expose_secret()
        );
        let payload = serde_json::json!({
            "chat_id": self.chat_id,
            "text": message,
        });

        match self.http.post(&url).json(&payload).send().await {
            Ok(resp) if resp.status().is_success() => {
                debug!(success, "Notification delivered");
            }
            Ok(resp) => {
                warn!(status = %resp.status(), "Telegram rejected notification");
            }
            Err(e) => {
                warn!(error = %e, "Failed to deliver notification");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Noop
// ---------------------------------------------------------------------------

/// Notifier used when no channel is configured.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send(&self, message: &str, success: bool) {
        debug!(success, message, "Notification suppressed (no channel)");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_notifier_never_fails() {
        let notifier = NoopNotifier;
        notifier.send("✅ 1 | buy | Kante |  15000", true).await;
        notifier.send("❌ 2 | Kante |  15000", false).await;
    }
}
