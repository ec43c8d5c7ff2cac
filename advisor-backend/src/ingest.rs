//! Dataset ingestion.
//!
//! Unpacks an uploaded zip into a full replacement `Dataset`. The archive
//! must carry `clients.csv`, `holdings.csv`, `index.csv`, `sentiment.jsonl`
//! and one of `prices.csv` / `prices.parquet`; a short archive is rejected
//! before anything is touched. Parsing is pure: the caller publishes the
//! returned dataset in one atomic swap, so a failed ingest never leaves a
//! half-updated fixture set behind.
//!
//! CSV headers tolerate the exporter's aliases (`client_id`/`clientId`,
//! `account_id`/`accountId`, `weight`/`target_weight`, `qty`/`quantity`).
//! `prices.parquet` satisfies the member requirement but is not parsed.

use std::collections::{BTreeSet, HashMap};
use std::io::{Cursor, Read};

use sha2::{Digest, Sha256};
use thiserror::Error;
use zip::ZipArchive;

use advisor_core::model::{Client, Holding, IndexConstituent, PriceBar, SentimentRecord};
use judge_gateway::Dataset;

const REQUIRED_COMMON: [&str; 4] = [
    "clients.csv",
    "holdings.csv",
    "index.csv",
    "sentiment.jsonl",
];

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(
        "Zip must include clients.csv, holdings.csv, index.csv, prices.csv (or prices.parquet), sentiment.jsonl. Found: {0:?}"
    )]
    MissingMembers(Vec<String>),
    #[error("could not read archive: {0}")]
    BadArchive(String),
    #[error("{member}: {detail}")]
    BadMember { member: String, detail: String },
}

/// What an accepted archive produced.
#[derive(Debug)]
pub struct IngestOutcome {
    pub received_files: Vec<String>,
    pub parsed_prices_csv: bool,
    pub dataset: Dataset,
}

/// Content checksum of an uploaded blob, `sha256:`-prefixed hex.
pub fn checksum(blob: &[u8]) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(blob)))
}

/// Validates the archive and builds the replacement dataset: sections
/// present in the zip are re-parsed, the rest carry over from `current`.
pub fn apply_archive(blob: &[u8], current: &Dataset) -> Result<IngestOutcome, IngestError> {
    let mut archive =
        ZipArchive::new(Cursor::new(blob)).map_err(|e| IngestError::BadArchive(e.to_string()))?;
    let names: BTreeSet<String> = archive.file_names().map(str::to_string).collect();

    let has_common = REQUIRED_COMMON.iter().all(|n| names.contains(*n));
    let has_prices = names.contains("prices.csv") || names.contains("prices.parquet");
    if !has_common || !has_prices {
        return Err(IngestError::MissingMembers(names.into_iter().collect()));
    }

    let mut dataset = current.clone();
    dataset.clients = parse_clients(&read_member(&mut archive, "clients.csv")?)?;
    dataset.holdings = parse_holdings(&read_member(&mut archive, "holdings.csv")?)?;
    dataset.index = parse_index(&read_member(&mut archive, "index.csv")?)?;
    dataset.sentiment = parse_sentiment(&read_member(&mut archive, "sentiment.jsonl")?)?;

    let mut parsed_prices_csv = false;
    if names.contains("prices.csv") {
        dataset.prices = parse_prices(&read_member(&mut archive, "prices.csv")?)?;
        parsed_prices_csv = true;
    }

    Ok(IngestOutcome {
        received_files: names.into_iter().collect(),
        parsed_prices_csv,
        dataset,
    })
}

fn read_member(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<Vec<u8>, IngestError> {
    let mut member = archive.by_name(name).map_err(|e| IngestError::BadMember {
        member: name.to_string(),
        detail: e.to_string(),
    })?;
    let mut buf = Vec::new();
    member.read_to_end(&mut buf).map_err(|e| IngestError::BadMember {
        member: name.to_string(),
        detail: e.to_string(),
    })?;
    Ok(buf)
}

type Row = HashMap<String, String>;

fn csv_rows(member: &str, bytes: &[u8]) -> Result<Vec<Row>, IngestError> {
    let mut reader = csv::Reader::from_reader(bytes);
    reader
        .deserialize()
        .collect::<Result<Vec<Row>, _>>()
        .map_err(|e| bad_row(member, e))
}

fn bad_row(member: &str, detail: impl ToString) -> IngestError {
    IngestError::BadMember {
        member: member.to_string(),
        detail: detail.to_string(),
    }
}

/// First non-empty value among the aliased column names.
fn field(row: &Row, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|n| row.get(*n).filter(|v| !v.is_empty()).cloned())
}

fn parse_clients(bytes: &[u8]) -> Result<Vec<Client>, IngestError> {
    csv_rows("clients.csv", bytes)?
        .iter()
        .map(|row| {
            Ok(Client {
                client_id: field(row, &["client_id", "clientId"])
                    .ok_or_else(|| bad_row("clients.csv", "row missing client_id"))?,
                segment: field(row, &["segment"]).unwrap_or_else(|| "retail".to_string()),
                risk_profile: field(row, &["risk_profile", "riskProfile"])
                    .unwrap_or_else(|| "balanced".to_string()),
                preferences: Default::default(),
            })
        })
        .collect()
}

fn parse_holdings(bytes: &[u8]) -> Result<Vec<Holding>, IngestError> {
    csv_rows("holdings.csv", bytes)?
        .iter()
        .map(|row| {
            let qty = field(row, &["qty", "quantity"]).unwrap_or_else(|| "0".to_string());
            Ok(Holding {
                account_id: field(row, &["client_id", "account_id", "accountId"])
                    .ok_or_else(|| bad_row("holdings.csv", "row missing account_id"))?,
                ticker: field(row, &["ticker"])
                    .ok_or_else(|| bad_row("holdings.csv", "row missing ticker"))?,
                qty: qty
                    .parse::<f64>()
                    .map_err(|e| bad_row("holdings.csv", format!("qty {qty:?}: {e}")))?
                    as i64,
            })
        })
        .collect()
}

fn parse_index(bytes: &[u8]) -> Result<Vec<IndexConstituent>, IngestError> {
    csv_rows("index.csv", bytes)?
        .iter()
        .map(|row| {
            let weight = field(row, &["weight", "target_weight"]).unwrap_or_else(|| "0".to_string());
            Ok(IndexConstituent {
                ticker: field(row, &["ticker"])
                    .ok_or_else(|| bad_row("index.csv", "row missing ticker"))?,
                weight: weight
                    .parse::<f64>()
                    .map_err(|e| bad_row("index.csv", format!("weight {weight:?}: {e}")))?,
                sector: field(row, &["sector"]).unwrap_or_else(|| "Unknown".to_string()),
            })
        })
        .collect()
}

fn parse_prices(bytes: &[u8]) -> Result<Vec<PriceBar>, IngestError> {
    csv_rows("prices.csv", bytes)?
        .iter()
        .map(|row| {
            let close = field(row, &["close"])
                .ok_or_else(|| bad_row("prices.csv", "row missing close"))?;
            Ok(PriceBar {
                date: field(row, &["date"])
                    .ok_or_else(|| bad_row("prices.csv", "row missing date"))?,
                ticker: field(row, &["ticker"])
                    .ok_or_else(|| bad_row("prices.csv", "row missing ticker"))?,
                close: close
                    .parse::<f64>()
                    .map_err(|e| bad_row("prices.csv", format!("close {close:?}: {e}")))?,
                adv: match field(row, &["adv"]) {
                    Some(adv) => Some(
                        adv.parse::<f64>()
                            .map_err(|e| bad_row("prices.csv", format!("adv {adv:?}: {e}")))?,
                    ),
                    None => None,
                },
            })
        })
        .collect()
}

fn parse_sentiment(bytes: &[u8]) -> Result<Vec<SentimentRecord>, IngestError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| bad_row("sentiment.jsonl", format!("not utf-8: {e}")))?;
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(|e| bad_row("sentiment.jsonl", e)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    const CLIENTS: &str = "client_id,segment,risk_profile\nC001,retail,balanced\nC002,hni,growth\n";
    const HOLDINGS: &str = "account_id,ticker,qty\nC001,AAPL,120\nC002,V,50.0\n";
    const INDEX: &str = "ticker,weight,sector\nAAPL,0.035,Information Technology\n";
    const PRICES: &str = "date,ticker,close,adv\n2025-08-25,AAPL,227.13,82000000\n2025-08-25,V,278.90,\n";
    const SENTIMENT: &str =
        "{\"date\":\"2025-08-25\",\"ticker\":\"AAPL\",\"label\":\"pos\",\"score\":0.78}\n\n";

    fn build_zip(members: &[(&str, &str)]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        let mut writer = zip::ZipWriter::new(&mut cursor);
        for (name, content) in members {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
        cursor.into_inner()
    }

    fn full_zip() -> Vec<u8> {
        build_zip(&[
            ("clients.csv", CLIENTS),
            ("holdings.csv", HOLDINGS),
            ("index.csv", INDEX),
            ("prices.csv", PRICES),
            ("sentiment.jsonl", SENTIMENT),
        ])
    }

    #[test]
    fn full_archive_replaces_every_section() {
        let outcome = apply_archive(&full_zip(), &Dataset::seeded()).unwrap();
        assert!(outcome.parsed_prices_csv);
        assert_eq!(outcome.received_files.len(), 5);
        assert_eq!(outcome.dataset.clients.len(), 2);
        assert_eq!(outcome.dataset.clients[0].client_id, "C001");
        assert_eq!(outcome.dataset.holdings[1].qty, 50);
        assert_eq!(outcome.dataset.index[0].sector, "Information Technology");
        assert_eq!(outcome.dataset.prices[0].adv, Some(82_000_000.0));
        assert_eq!(outcome.dataset.prices[1].adv, None);
        assert_eq!(outcome.dataset.sentiment.len(), 1);
    }

    #[test]
    fn missing_sentiment_is_rejected_without_touching_fixtures() {
        let blob = build_zip(&[
            ("clients.csv", CLIENTS),
            ("holdings.csv", HOLDINGS),
            ("index.csv", INDEX),
            ("prices.csv", PRICES),
        ]);
        let current = Dataset::seeded();
        let err = apply_archive(&blob, &current).unwrap_err();
        assert!(matches!(err, IngestError::MissingMembers(_)));
        // Parsing is pure; the caller never sees a dataset to publish.
        assert_eq!(current.clients.len(), 4);
    }

    #[test]
    fn parquet_satisfies_the_member_check_but_is_not_parsed() {
        let blob = build_zip(&[
            ("clients.csv", CLIENTS),
            ("holdings.csv", HOLDINGS),
            ("index.csv", INDEX),
            ("prices.parquet", "not-actually-parsed"),
            ("sentiment.jsonl", SENTIMENT),
        ]);
        let seeded = Dataset::seeded();
        let outcome = apply_archive(&blob, &seeded).unwrap();
        assert!(!outcome.parsed_prices_csv);
        // Price bars carry over from the current dataset.
        assert_eq!(outcome.dataset.prices.len(), seeded.prices.len());
    }

    #[test]
    fn header_aliases_are_accepted() {
        let blob = build_zip(&[
            ("clients.csv", "clientId,riskProfile\nC009,conservative\n"),
            ("holdings.csv", "client_id,ticker,quantity\nC009,MSFT,12.9\n"),
            ("index.csv", "ticker,target_weight\nMSFT,0.04\n"),
            ("prices.csv", PRICES),
            ("sentiment.jsonl", SENTIMENT),
        ]);
        let outcome = apply_archive(&blob, &Dataset::default()).unwrap();
        assert_eq!(outcome.dataset.clients[0].client_id, "C009");
        assert_eq!(outcome.dataset.clients[0].segment, "retail");
        assert_eq!(outcome.dataset.clients[0].risk_profile, "conservative");
        // Fractional quantities truncate toward zero.
        assert_eq!(outcome.dataset.holdings[0].qty, 12);
        assert_eq!(outcome.dataset.index[0].weight, 0.04);
        assert_eq!(outcome.dataset.index[0].sector, "Unknown");
    }

    #[test]
    fn client_row_without_an_id_is_malformed() {
        let blob = build_zip(&[
            ("clients.csv", "segment\nretail\n"),
            ("holdings.csv", HOLDINGS),
            ("index.csv", INDEX),
            ("prices.csv", PRICES),
            ("sentiment.jsonl", SENTIMENT),
        ]);
        let err = apply_archive(&blob, &Dataset::default()).unwrap_err();
        assert!(matches!(err, IngestError::BadMember { .. }));
    }

    #[test]
    fn garbage_blob_is_a_bad_archive() {
        let err = apply_archive(b"definitely not a zip", &Dataset::default()).unwrap_err();
        assert!(matches!(err, IngestError::BadArchive(_)));
    }

    #[test]
    fn checksum_is_prefixed_hex() {
        let sum = checksum(b"abc");
        assert!(sum.starts_with("sha256:"));
        assert_eq!(sum.len(), "sha256:".len() + 64);
        assert_eq!(sum, checksum(b"abc"));
        assert_ne!(sum, checksum(b"abd"));
    }
}
