//! Rebalance orchestration.
//!
//! A single request resolves its account set, fetches price and sentiment
//! for the tracked ticker, prices exactly one execution per minute bucket,
//! and fans one BUY order out per account. Keyed submissions cache their
//! result so retries return the original batch instead of re-executing.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use log::{debug, info};
use thiserror::Error;
use uuid::Uuid;

use crate::idempotency::IdempotencyStore;
use crate::model::{Order, OrderSide, RebalanceRequest, RebalanceResult};
use crate::pricing;
use crate::provider::{find_price, MarketDataProvider, ProviderError};

/// The single ticker the stub advisor trades.
pub const TRACKED_TICKER: &str = "AAPL";
/// Untilted per-account order size.
pub const BASE_QTY: i64 = 10;
/// ADV assumed for bars that carry none.
pub const DEFAULT_ADV: f64 = 1_000_000.0;

const CLIENT_PAGE_SIZE: usize = 100;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(
        "No price found for {ticker} (asOf={as_of}). Upload prices via /ingest/upload or configure the judge provider."
    )]
    NoPrice { ticker: String, as_of: String },
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Orchestrates rebalance requests against a market data backend.
pub struct RebalanceEngine {
    provider: Arc<dyn MarketDataProvider>,
    results: IdempotencyStore<RebalanceResult>,
}

impl RebalanceEngine {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            provider,
            results: IdempotencyStore::new(),
        }
    }

    /// Runs one rebalance. A supplied `idempotency_key` that already has a
    /// stored result short-circuits everything else in the request.
    pub async fn rebalance(
        &self,
        req: &RebalanceRequest,
        idempotency_key: Option<&str>,
    ) -> Result<RebalanceResult, EngineError> {
        if let Some(key) = idempotency_key {
            if let Some(prior) = self.results.get(key) {
                info!("Rebalance replay for idempotency key, returning stored result");
                return Ok(prior);
            }
        }

        let accounts = self.resolve_accounts(req).await?;

        let bars = self.provider.get_prices(Some(&req.as_of), None).await?;
        let bar = match find_price(&bars, TRACKED_TICKER, Some(&req.as_of)) {
            Some(bar) => bar.clone(),
            None => {
                // No bar at the requested date; fall back to the first
                // tracked-ticker bar at any date.
                let all = self.provider.get_prices(None, None).await?;
                find_price(&all, TRACKED_TICKER, None)
                    .cloned()
                    .ok_or_else(|| EngineError::NoPrice {
                        ticker: TRACKED_TICKER.to_string(),
                        as_of: req.as_of.clone(),
                    })?
            }
        };

        let sentiment = self
            .provider
            .get_sentiment(None, None, Some(&[TRACKED_TICKER.to_string()]))
            .await?;
        let tilt = sentiment
            .iter()
            .find(|s| s.ticker == TRACKED_TICKER)
            .map(|s| (s.score - 0.5) * 2.0)
            .unwrap_or(0.0);

        // One shared size for the whole batch: single-ticker uniform
        // sizing is the documented stub behavior.
        let qty = (BASE_QTY as f64 * (1.0 + req.sentiment_weight * tilt))
            .round()
            .max(1.0) as i64;

        // One execution price per (ticker, minute bucket); every order in
        // this call reuses it.
        let bucket = minute_bucket(Utc::now());
        // A bar with adv 0 reads as "no liquidity figure", not a thin market.
        let adv = bar.adv.filter(|a| *a != 0.0).unwrap_or(DEFAULT_ADV);
        let exec_price = pricing::execution_price(bar.close, qty, adv);
        debug!(
            "Priced {}@{} at {} for {} accounts",
            TRACKED_TICKER,
            bucket,
            exec_price,
            accounts.len()
        );

        let orders: Vec<Order> = accounts
            .into_iter()
            .map(|account_id| Order {
                account_id,
                ticker: TRACKED_TICKER.to_string(),
                side: OrderSide::Buy,
                qty,
                exec_price,
                ts: now_iso(),
            })
            .collect();

        let result = RebalanceResult {
            request_id: format!("rb-{}", Uuid::new_v4()),
            orders,
        };
        info!(
            "Rebalance {} built {} orders (qty {}, tilt {:.3})",
            result.request_id,
            result.orders.len(),
            qty,
            tilt
        );

        if let Some(key) = idempotency_key {
            // The first writer wins; a racing caller on the same key gets
            // the stored batch back.
            let (stored, _existed) = self.results.put_if_absent(key, result);
            return Ok(stored);
        }
        Ok(result)
    }

    async fn resolve_accounts(&self, req: &RebalanceRequest) -> Result<Vec<String>, EngineError> {
        if let Some(ids) = &req.filters.account_ids {
            if !ids.is_empty() {
                return Ok(ids.clone());
            }
        }
        let mut accounts = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self
                .provider
                .list_clients(CLIENT_PAGE_SIZE, cursor.as_deref())
                .await?;
            accounts.extend(page.items.into_iter().map(|c| c.client_id));
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(accounts)
    }
}

/// Current UTC time truncated to the minute, as an RFC 3339 string. A
/// deliberate coarsening used only as a grouping key, never for
/// uniqueness.
pub fn minute_bucket(now: DateTime<Utc>) -> String {
    now.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now)
        .to_rfc3339_opts(SecondsFormat::Secs, false)
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
