//! Outcome evaluator.
//!
//! Runs once per resolved buy/bid attempt: decides resale eligibility and
//! profit, updates the session counters and queues, records transaction
//! and progress lines, notifies the operator, and hands failure statuses
//! to the auto-stop controller. The returned handle resolves only after
//! every side effect, including the optional post-attempt delay.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::BuyerConfig;
use crate::engine::autostop::AutoStopController;
use crate::engine::control::BuyerControl;
use crate::engine::CoinBalance;
use crate::error_codes;
use crate::notify::Notifier;
use crate::pricing::PricingAdvisor;
use crate::stats::{self, TransactionLog};
use crate::store::{Counter, SessionStore};
use crate::types::{
    format_price, group_coins, AttemptResult, PurchaseAttempt, SellQueueEntry, SessionStats,
    NO_LIST_PRICE,
};

/// Marketplace fee retained on a sale; resale proceeds are 95% of price.
const SALE_FEE_KEEP: f64 = 0.95;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// What the evaluator decided for one resolved attempt.
#[derive(Debug, Clone)]
pub struct EvaluationOutcome {
    pub success: bool,
    /// The win/bid counter (success) or loss counter (failure) after
    /// this attempt was recorded.
    pub counter: u64,
    /// Final resale price; `NO_LIST_PRICE` when price-gated.
    pub sell_price: i64,
    pub should_list: bool,
    pub profit: f64,
    /// Whether this attempt's handling stopped the buyer (coin floor or
    /// error threshold).
    pub stopped: bool,
}

// ---------------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------------

pub struct Evaluator {
    config: BuyerConfig,
    store: Arc<SessionStore>,
    pricing: Arc<dyn PricingAdvisor>,
    notifier: Arc<dyn Notifier>,
    transactions: TransactionLog,
    autostop: AutoStopController,
    control: BuyerControl,
    coins: CoinBalance,
}

impl Evaluator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: BuyerConfig,
        store: Arc<SessionStore>,
        pricing: Arc<dyn PricingAdvisor>,
        notifier: Arc<dyn Notifier>,
        transactions: TransactionLog,
        control: BuyerControl,
        coins: CoinBalance,
    ) -> Self {
        let autostop = AutoStopController::new(config.autostop.clone(), control.clone());
        Evaluator {
            config,
            store,
            pricing,
            notifier,
            transactions,
            autostop,
            control,
            coins,
        }
    }

    pub fn autostop(&self) -> &AutoStopController {
        &self.autostop
    }

    /// Handle one resolved attempt. Never fails: every recognised
    /// condition is logged, possibly notified, and possibly halts the
    /// buyer, but nothing is propagated as an error.
    pub async fn handle(&self, attempt: &PurchaseAttempt, result: &AttemptResult) -> EvaluationOutcome {
        let outcome = if result.success {
            self.on_success(attempt).await
        } else {
            self.on_failure(attempt, result).await
        };

        // Throttle: callers observe completion only after the delay.
        if self.config.buyer.add_buy_delay {
            if let Some(delay) = &self.config.buyer.buy_delay {
                let secs = delay.sample_secs();
                debug!(secs, "Post-attempt delay");
                tokio::time::sleep(Duration::from_secs(secs)).await;
            }
        }

        outcome
    }

    // -- Success path -----------------------------------------------------

    async fn on_success(&self, attempt: &PurchaseAttempt) -> EvaluationOutcome {
        let cfg = &self.config;
        let name = attempt.name.trim();
        let mut sell_price = attempt.sell_price;

        if attempt.is_bin {
            self.store.incr_and_get(Counter::Purchased);
            self.card_won_cue();
        }

        let is_valid_rating = cfg
            .sell
            .rating_threshold
            .map_or(true, |threshold| attempt.card.rating <= threshold);

        if is_valid_rating && cfg.sell.use_market_price && attempt.is_bin {
            match self.pricing.sell_price(name, &attempt.card).await {
                Ok(price) => sell_price = price,
                Err(e) => {
                    warn!(error = %e, name, "Market price lookup failed, keeping candidate price")
                }
            }
        }

        if cfg.sell.check_buy_price && attempt.price as f64 > sell_price as f64 * SALE_FEE_KEEP {
            sell_price = NO_LIST_PRICE;
        }

        let should_list = sell_price > 0 && is_valid_rating;
        let profit = if cfg.buyer.quick_sell {
            (attempt.card.discard_value - attempt.price) as f64
        } else {
            sell_price as f64 * SALE_FEE_KEEP - attempt.price as f64
        };

        let purchased = self.store.get(Counter::Purchased);
        let session = self.store.session_stats();
        let coins = self.coins.get();

        let counter = if attempt.is_bin {
            let win = self.store.incr_and_get(Counter::Win);
            self.transactions.append(&format!(
                "[{}] {} buy success - Price : {}",
                TransactionLog::timestamp(),
                name,
                attempt.price
            ));
            stats::progress(&format!(
                "W: {win} {name} {}buy success added to sell queue",
                bought_bracket(purchased, cfg.buyer.card_count, cfg.buyer.has_card_target()),
            ));

            if !cfg.buyer.dont_move_won {
                self.store.push_sell_queue(SellQueueEntry {
                    card: attempt.card.clone(),
                    name: attempt.name.clone(),
                    sell_price,
                    should_list,
                    profit,
                });
            }
            win
        } else {
            let bid = self.store.incr_and_get(Counter::Bid);
            self.transactions.append(&format!(
                "[{}] {} bid success - Price : {}",
                TransactionLog::timestamp(),
                name,
                attempt.price
            ));
            stats::progress(&format!("B: {bid} {name} bid success"));

            let filter = self.store.current_filter();
            self.store.register_bid(&filter, attempt.trade_id);
            bid
        };

        if cfg.notify.prefs().wins {
            let message = success_message(
                counter,
                attempt.is_bin,
                name,
                attempt.price,
                profit,
                coins,
                &session,
                purchased,
                cfg.buyer.card_count,
                cfg.buyer.has_card_target(),
            );
            self.notifier.send(&message, true).await;
        }

        // Coin floor is independent of the error-based auto-stop.
        let mut stopped = false;
        if coins <= cfg.buyer.stop_if_coins_below {
            let line = format!(
                "⚠ | 🪙 Coins to stop threshold reached | {}",
                group_coins(coins)
            );
            stats::progress(&line);
            self.notifier.send(&line, false).await;
            self.control.stop();
            stopped = true;
        }

        info!(
            name,
            price = attempt.price,
            sell_price,
            should_list,
            profit,
            "Attempt succeeded"
        );

        EvaluationOutcome {
            success: true,
            counter,
            sell_price,
            should_list,
            profit,
            stopped,
        }
    }

    // -- Failure path -----------------------------------------------------

    async fn on_failure(&self, attempt: &PurchaseAttempt, result: &AttemptResult) -> EvaluationOutcome {
        let cfg = &self.config;
        let name = attempt.name.trim();

        let loss = self.store.incr_and_get(Counter::Loss);
        self.transactions.append(&format!(
            "[{}] {} buy failed - Price : {}",
            TransactionLog::timestamp(),
            name,
            attempt.price
        ));

        let status = result.status_string();
        stats::progress(&format!(
            "L: {loss} {name} {} failure ERR: ({})",
            if attempt.is_bin { "buy" } else { "bid" },
            error_codes::describe(&status),
        ));

        if cfg.notify.prefs().losses {
            let session = self.store.session_stats();
            let message = failure_message(loss, name, attempt.price, session.search_count);
            self.notifier.send(&message, false).await;
        }

        let stopped = self.autostop.on_failure(&status);

        EvaluationOutcome {
            success: false,
            counter: loss,
            sell_price: attempt.sell_price,
            should_list: false,
            profit: 0.0,
            stopped,
        }
    }

    /// Fire-and-forget "card won" cue for the operator.
    fn card_won_cue(&self) {
        info!(target: "autobuyer::cue", cue = "card_won");
    }
}

// ---------------------------------------------------------------------------
// Message formatting
// ---------------------------------------------------------------------------

/// `"[X Of Y] "` progress fragment; empty when no target is configured.
fn bought_bracket(purchased: u64, card_count: u32, has_target: bool) -> String {
    if has_target {
        format!("[{purchased} Of {card_count}] ")
    } else {
        String::new()
    }
}

#[allow(clippy::too_many_arguments)]
fn success_message(
    counter: u64,
    is_bin: bool,
    name: &str,
    price: i64,
    profit: f64,
    coins: i64,
    session: &SessionStats,
    purchased: u64,
    card_count: u32,
    has_target: bool,
) -> String {
    let mut message = format!(
        "✅ {counter} | {} | {name} | {} (profit {profit:.0})\n🪙 {}\n🤑 {}\n🔍 {}",
        if is_bin { "buy" } else { "bid" },
        format_price(price),
        group_coins(coins),
        session.profit,
        session.search_count,
    );
    if has_target {
        message.push_str(&format!("\n#️⃣ Bought {purchased} Of {card_count}"));
    }
    message
}

fn failure_message(loss: u64, name: &str, price: i64, search_count: u64) -> String {
    format!("❌ {loss} | {name} | {}\n🔍 {search_count}", format_price(price))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
