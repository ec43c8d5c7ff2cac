//! In-memory judge backend.
//!
//! Serves filtered views over a `SharedDataset`. Ingestion builds a full
//! replacement dataset off to the side and publishes it with one pointer
//! swap, so concurrent readers see either the old or the new set in full,
//! never a mix.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use advisor_core::model::{Client, Holding, IndexConstituent, PriceBar, SentimentRecord};
use advisor_core::provider::{ClientPage, MarketDataProvider, ProviderError};

/// The bulk-replaceable fixture set owned by the stub backend.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub clients: Vec<Client>,
    pub holdings: Vec<Holding>,
    pub index: Vec<IndexConstituent>,
    pub prices: Vec<PriceBar>,
    pub sentiment: Vec<SentimentRecord>,
}

impl Dataset {
    /// The built-in fixtures the service boots with.
    pub fn seeded() -> Self {
        Self {
            clients: vec![
                client("C001", "retail", "balanced"),
                client("C002", "retail", "conservative"),
                client("C003", "hni", "growth"),
                client("C004", "retail", "balanced"),
            ],
            holdings: vec![
                holding("C001", "AAPL", 120),
                holding("C001", "MSFT", 80),
                holding("C002", "V", 50),
                holding("C003", "NVDA", 30),
                holding("C004", "TSLA", 20),
                holding("C004", "AAPL", 15),
            ],
            index: vec![
                constituent("AAPL", 0.035, "Information Technology"),
                constituent("MSFT", 0.040, "Information Technology"),
                constituent("NVDA", 0.030, "Information Technology"),
                constituent("AMZN", 0.028, "Consumer Discretionary"),
                constituent("TSLA", 0.020, "Consumer Discretionary"),
                constituent("V", 0.018, "Financials"),
            ],
            prices: vec![
                bar("2025-08-25", "AAPL", 227.13, 82_000_000.0),
                bar("2025-08-25", "MSFT", 430.55, 25_000_000.0),
                bar("2025-08-25", "NVDA", 116.22, 60_000_000.0),
                bar("2025-08-25", "AMZN", 171.40, 50_000_000.0),
                bar("2025-08-25", "TSLA", 238.65, 150_000_000.0),
                bar("2025-08-25", "V", 278.90, 7_000_000.0),
            ],
            sentiment: vec![
                sentiment("2025-08-25", "AAPL", "pos", 0.78, "https://news.example/a"),
                sentiment("2025-08-25", "TSLA", "neg", 0.66, "https://news.example/b"),
                sentiment("2025-08-25", "MSFT", "neu", 0.52, "https://news.example/c"),
            ],
        }
    }
}

fn client(id: &str, segment: &str, risk_profile: &str) -> Client {
    Client {
        client_id: id.into(),
        segment: segment.into(),
        risk_profile: risk_profile.into(),
        preferences: Default::default(),
    }
}

fn holding(account_id: &str, ticker: &str, qty: i64) -> Holding {
    Holding {
        account_id: account_id.into(),
        ticker: ticker.into(),
        qty,
    }
}

fn constituent(ticker: &str, weight: f64, sector: &str) -> IndexConstituent {
    IndexConstituent {
        ticker: ticker.into(),
        weight,
        sector: sector.into(),
    }
}

fn bar(date: &str, ticker: &str, close: f64, adv: f64) -> PriceBar {
    PriceBar {
        date: date.into(),
        ticker: ticker.into(),
        close,
        adv: Some(adv),
    }
}

fn sentiment(date: &str, ticker: &str, label: &str, score: f64, source: &str) -> SentimentRecord {
    SentimentRecord {
        date: date.into(),
        ticker: ticker.into(),
        label: label.into(),
        score,
        source: Some(source.into()),
    }
}

/// Handle to the currently published dataset. Cheap to clone; readers take
/// a snapshot, writers publish a complete replacement.
#[derive(Clone)]
pub struct SharedDataset {
    current: Arc<RwLock<Arc<Dataset>>>,
}

impl SharedDataset {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(dataset))),
        }
    }

    pub fn seeded() -> Self {
        Self::new(Dataset::seeded())
    }

    /// The dataset as of this call. Later publishes do not affect the
    /// returned snapshot.
    pub fn snapshot(&self) -> Arc<Dataset> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Atomically replaces the published dataset.
    pub fn publish(&self, dataset: Dataset) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(dataset);
    }
}

/// `MarketDataProvider` over the in-process fixture set.
pub struct StubProvider {
    dataset: SharedDataset,
}

impl StubProvider {
    pub fn new(dataset: SharedDataset) -> Self {
        Self { dataset }
    }
}

#[async_trait]
impl MarketDataProvider for StubProvider {
    async fn list_clients(
        &self,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<ClientPage, ProviderError> {
        let data = self.dataset.snapshot();
        // Offset cursor: the next start index as a literal string; anything
        // non-numeric reads as the start of the set.
        let start = cursor.and_then(|c| c.parse::<usize>().ok()).unwrap_or(0);
        let items: Vec<Client> = data.clients.iter().skip(start).take(limit).cloned().collect();
        let next_cursor = if start + limit < data.clients.len() {
            Some((start + limit).to_string())
        } else {
            None
        };
        Ok(ClientPage { items, next_cursor })
    }

    async fn list_holdings(
        &self,
        account_ids: Option<&[String]>,
    ) -> Result<Vec<Holding>, ProviderError> {
        let data = self.dataset.snapshot();
        let ids: Option<HashSet<&str>> =
            account_ids.map(|ids| ids.iter().map(String::as_str).collect());
        Ok(data
            .holdings
            .iter()
            .filter(|h| ids.as_ref().map_or(true, |s| s.contains(h.account_id.as_str())))
            .cloned()
            .collect())
    }

    async fn get_index(&self) -> Result<Vec<IndexConstituent>, ProviderError> {
        Ok(self.dataset.snapshot().index.clone())
    }

    async fn get_prices(
        &self,
        date: Option<&str>,
        ticker: Option<&str>,
    ) -> Result<Vec<PriceBar>, ProviderError> {
        let data = self.dataset.snapshot();
        Ok(data
            .prices
            .iter()
            .filter(|p| date.map_or(true, |d| p.date == d))
            .filter(|p| ticker.map_or(true, |t| p.ticker == t))
            .cloned()
            .collect())
    }

    async fn get_sentiment(
        &self,
        _from_date: Option<&str>,
        _to_date: Option<&str>,
        tickers: Option<&[String]>,
    ) -> Result<Vec<SentimentRecord>, ProviderError> {
        let data = self.dataset.snapshot();
        let wanted: Option<HashSet<String>> =
            tickers.map(|ts| ts.iter().map(|t| t.to_uppercase()).collect());
        Ok(data
            .sentiment
            .iter()
            .filter(|s| wanted.as_ref().map_or(true, |w| w.contains(&s.ticker)))
            .cloned()
            .collect())
    }
}
