//! Autobuyer — marketplace purchase-outcome pipeline.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! restores the session store from disk (or starts fresh), and consumes
//! resolved-attempt events from stdin (one JSON object per line, as
//! handed over by the attempt-submission layer) with graceful shutdown.

use anyhow::Result;
use secrecy::SecretString;
use serde::Deserialize;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tracing::{error, info, warn};

use autobuyer::config::BuyerConfig;
use autobuyer::engine::control::BuyerControl;
use autobuyer::engine::evaluator::Evaluator;
use autobuyer::engine::CoinBalance;
use autobuyer::notify::{NoopNotifier, Notifier, TelegramNotifier};
use autobuyer::pricing::{FutbinClient, PricingAdvisor};
use autobuyer::stats::TransactionLog;
use autobuyer::store::SessionStore;
use autobuyer::types::ResolvedAttempt;

const BANNER: &str = r#"
    _         _        ____
   / \  _   _| |_ ___ | __ ) _   _ _   _  ___ _ __
  / _ \| | | | __/ _ \|  _ \| | | | | | |/ _ \ '__|
 / ___ \ |_| | || (_) | |_) | |_| | |_| |  __/ |
/_/   \_\__,_|\__\___/|____/ \__,_|\__, |\___|_|
                                   |___/
  v0.1.0 — purchase-outcome pipeline
"#;

/// One event from the submission layer. `coins` carries the current
/// balance snapshot when the host reports it.
#[derive(Debug, Deserialize)]
struct AttemptEvent {
    #[serde(flatten)]
    resolved: ResolvedAttempt,
    #[serde(default)]
    coins: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = BuyerConfig::load("config.toml")?;

    init_logging();

    println!("{BANNER}");
    info!(
        notify_mode = %cfg.notify.mode,
        card_count = cfg.buyer.card_count,
        stop_codes = %cfg.autostop.stop_error_codes,
        "Autobuyer starting up"
    );

    // -- Restore session state -------------------------------------------

    let store = Arc::new(SessionStore::load(None)?);

    // -- Initialise components -------------------------------------------

    let pricing: Arc<dyn PricingAdvisor> = Arc::new(FutbinClient::new(&cfg.sell.platform)?);
    let notifier = build_notifier(&cfg)?;
    let control = BuyerControl::new(true);
    let coins = CoinBalance::new(i64::MAX);

    let evaluator = Evaluator::new(
        cfg.clone(),
        store.clone(),
        pricing,
        notifier,
        TransactionLog::default(),
        control.clone(),
        coins.clone(),
    );

    // -- Event loop -------------------------------------------------------

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!("Listening for resolved attempts on stdin. Press Ctrl+C to stop.");

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => match serde_json::from_str::<AttemptEvent>(&line) {
                    Ok(event) => {
                        if let Some(balance) = event.coins {
                            coins.set(balance);
                        }
                        let outcome = evaluator
                            .handle(&event.resolved.attempt, &event.resolved.result)
                            .await;
                        info!(
                            attempt = %event.resolved.attempt,
                            success = outcome.success,
                            counter = outcome.counter,
                            should_list = outcome.should_list,
                            stopped = outcome.stopped,
                            "Attempt handled"
                        );
                        if let Err(e) = store.save(None) {
                            error!(error = %e, "Failed to save session store");
                        }
                    }
                    Err(e) => warn!(error = %e, "Skipping malformed attempt event"),
                },
                None => {
                    info!("Event stream closed.");
                    break;
                }
            },
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    // Save final state
    store.save(None)?;
    info!(
        wins = store.get(autobuyer::store::Counter::Win),
        bids = store.get(autobuyer::store::Counter::Bid),
        losses = store.get(autobuyer::store::Counter::Loss),
        queued = store.sell_queue_len(),
        "Autobuyer shut down cleanly."
    );

    Ok(())
}

/// Pick the notification channel from config; Noop when Telegram is not
/// fully configured.
fn build_notifier(cfg: &BuyerConfig) -> Result<Arc<dyn Notifier>> {
    let token_env = cfg.notify.telegram_bot_token_env.as_deref();
    let chat_env = cfg.notify.telegram_chat_id_env.as_deref();

    match (token_env, chat_env) {
        (Some(token_env), Some(chat_env)) => {
            let token = SecretString::new(BuyerConfig::resolve_env(token_env)?);
            let chat_id = BuyerConfig::resolve_env(chat_env)?;
            info!("Telegram notifications enabled");
            Ok(Arc::new(TelegramNotifier::new(token, chat_id)?))
        }
        _ => {
            if cfg.notify.prefs().any() {
                warn!("Notification mode set but no Telegram channel configured");
            }
            Ok(Arc::new(NoopNotifier))
        }
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("autobuyer=info"));

    let json_logging = std::env::var("AUTOBUYER_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
