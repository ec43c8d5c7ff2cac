//! The `MarketDataProvider` contract.
//!
//! One capability interface with the five judge queries; the gateway crate
//! supplies an in-memory implementation and a remote HTTP proxy, selected
//! at construction time.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Client, Holding, IndexConstituent, PriceBar, SentimentRecord};

/// One page of clients plus the cursor for the next page, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPage {
    pub items: Vec<Client>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Failure surfaced by a provider backend. Propagated without retry.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("judge request failed: {0}")]
    Upstream(String),
    #[error("judge returned status {0}")]
    Status(u16),
}

/// Supplies client lists, holdings, index constituents, price bars and
/// sentiment records, either from an in-process fixture set or a remote
/// judge service.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn list_clients(
        &self,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<ClientPage, ProviderError>;

    async fn list_holdings(
        &self,
        account_ids: Option<&[String]>,
    ) -> Result<Vec<Holding>, ProviderError>;

    async fn get_index(&self) -> Result<Vec<IndexConstituent>, ProviderError>;

    async fn get_prices(
        &self,
        date: Option<&str>,
        ticker: Option<&str>,
    ) -> Result<Vec<PriceBar>, ProviderError>;

    async fn get_sentiment(
        &self,
        from_date: Option<&str>,
        to_date: Option<&str>,
        tickers: Option<&[String]>,
    ) -> Result<Vec<SentimentRecord>, ProviderError>;
}

/// First bar matching `ticker` (and `date`, when given). Duplicate bars may
/// coexist in the list; the first match wins.
pub fn find_price<'a>(
    prices: &'a [PriceBar],
    ticker: &str,
    date: Option<&str>,
) -> Option<&'a PriceBar> {
    prices
        .iter()
        .find(|p| p.ticker == ticker && date.map_or(true, |d| p.date == d))
}
