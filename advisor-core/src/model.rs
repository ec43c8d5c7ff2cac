//! Data model shared across the advisor services.
//!
//! All types serialize with camelCase field names so the in-memory stub,
//! the remote judge service, and the public HTTP surface speak the same
//! wire format.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// An advisory client. Replaced wholesale on ingestion, immutable between
/// ingestions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub client_id: String,
    pub segment: String,
    pub risk_profile: String,
    #[serde(default)]
    pub preferences: HashMap<String, serde_json::Value>,
}

/// One account's position in a single ticker. Quantity is a signed share count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub account_id: String,
    pub ticker: String,
    pub qty: i64,
}

/// Index membership row. Weights are not required to sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexConstituent {
    pub ticker: String,
    pub weight: f64,
    pub sector: String,
}

/// Daily close bar. Duplicates for the same (date, ticker) may coexist;
/// lookups take the first match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBar {
    pub date: String,
    pub ticker: String,
    pub close: f64,
    #[serde(default)]
    pub adv: Option<f64>,
}

/// News-derived sentiment reading for a ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentRecord {
    pub date: String,
    pub ticker: String,
    pub label: String,
    pub score: f64,
    #[serde(default)]
    pub source: Option<String>,
}

/// Order direction, serialized in broker convention ("BUY"/"SELL").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

/// One account's fill in a rebalance batch. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub account_id: String,
    pub ticker: String,
    pub side: OrderSide,
    pub qty: i64,
    pub exec_price: f64,
    pub ts: String,
}

/// The unit of idempotency: once stored under a key, returned unchanged on
/// every retry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebalanceResult {
    pub request_id: String,
    pub orders: Vec<Order>,
}

/// Account selection and portfolio bounds for a rebalance call.
///
/// The three numeric bounds deserialize with their documented defaults but
/// are not consulted by the sizing algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebalanceFilters {
    #[serde(default)]
    pub account_ids: Option<Vec<String>>,
    #[serde(default = "default_min_cash_pct")]
    pub min_cash_pct: f64,
    #[serde(default = "default_max_security_weight")]
    pub max_security_weight: f64,
    #[serde(default = "default_max_sector_weight")]
    pub max_sector_weight: f64,
}

impl Default for RebalanceFilters {
    fn default() -> Self {
        Self {
            account_ids: None,
            min_cash_pct: default_min_cash_pct(),
            max_security_weight: default_max_security_weight(),
            max_sector_weight: default_max_sector_weight(),
        }
    }
}

fn default_min_cash_pct() -> f64 {
    0.02
}

fn default_max_security_weight() -> f64 {
    0.10
}

fn default_max_sector_weight() -> f64 {
    0.25
}

/// A rebalance submission. `risk_target_vol` is accepted for forward
/// compatibility and has no effect on sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebalanceRequest {
    pub as_of: String,
    #[serde(default)]
    pub filters: RebalanceFilters,
    #[serde(default = "default_sentiment_weight")]
    pub sentiment_weight: f64,
    #[serde(default)]
    pub risk_target_vol: Option<f64>,
}

fn default_sentiment_weight() -> f64 {
    0.20
}
