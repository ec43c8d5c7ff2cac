//! Remote judge backend.
//!
//! Pass-through proxy: each trait method maps to one GET against the judge
//! service with query parameters mirroring the in-memory filters. Calls are
//! bounded by a construction-time timeout; reqwest aborts the in-flight
//! request when it expires. Any non-success status surfaces as a provider
//! error, with no local retry and no caching.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;

use advisor_core::model::{Holding, IndexConstituent, PriceBar, SentimentRecord};
use advisor_core::provider::{ClientPage, MarketDataProvider, ProviderError};

/// `MarketDataProvider` backed by a remote judge service.
pub struct RemoteProvider {
    http: reqwest::Client,
    base_url: String,
}

impl RemoteProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            headers.insert("X-API-Key", HeaderValue::from_str(key)?);
        }
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(upstream)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }
        resp.json().await.map_err(upstream)
    }
}

fn upstream(err: reqwest::Error) -> ProviderError {
    ProviderError::Upstream(err.to_string())
}

#[async_trait]
impl MarketDataProvider for RemoteProvider {
    async fn list_clients(
        &self,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<ClientPage, ProviderError> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }
        self.get_json("/judge/clients", &query).await
    }

    async fn list_holdings(
        &self,
        account_ids: Option<&[String]>,
    ) -> Result<Vec<Holding>, ProviderError> {
        let mut query = Vec::new();
        if let Some(ids) = account_ids {
            query.push(("accountIds", ids.join(",")));
        }
        self.get_json("/judge/holdings", &query).await
    }

    async fn get_index(&self) -> Result<Vec<IndexConstituent>, ProviderError> {
        self.get_json("/judge/index", &[]).await
    }

    async fn get_prices(
        &self,
        date: Option<&str>,
        ticker: Option<&str>,
    ) -> Result<Vec<PriceBar>, ProviderError> {
        let mut query = Vec::new();
        if let Some(date) = date {
            query.push(("date", date.to_string()));
        }
        if let Some(ticker) = ticker {
            query.push(("ticker", ticker.to_string()));
        }
        self.get_json("/judge/prices", &query).await
    }

    async fn get_sentiment(
        &self,
        from_date: Option<&str>,
        to_date: Option<&str>,
        tickers: Option<&[String]>,
    ) -> Result<Vec<SentimentRecord>, ProviderError> {
        let mut query = Vec::new();
        if let Some(from) = from_date {
            query.push(("from", from.to_string()));
        }
        if let Some(to) = to_date {
            query.push(("to", to.to_string()));
        }
        if let Some(tickers) = tickers {
            query.push(("tickers", tickers.join(",")));
        }
        self.get_json("/judge/sentiment", &query).await
    }
}
