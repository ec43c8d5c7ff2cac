//! HTTP handlers for the public advisor surface.

use std::sync::Arc;

use axum::extract::{Multipart, Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use log::info;
use serde::Deserialize;
use serde_json::json;

use advisor_core::engine::RebalanceEngine;
use advisor_core::idempotency::{AckTracker, IdempotencyStore};
use advisor_core::model::{RebalanceRequest, RebalanceResult};
use judge_gateway::SharedDataset;

use crate::error::{ApiError, ApiResult};
use crate::ingest;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RebalanceEngine>,
    pub acks: Arc<AckTracker>,
    pub ingested: Arc<IdempotencyStore<String>>,
    pub dataset: SharedDataset,
}

#[derive(Debug, Deserialize)]
pub struct IngestParams {
    #[serde(rename = "asOf")]
    pub as_of: Option<String>,
    #[serde(rename = "sourceId")]
    pub source_id: Option<String>,
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// `POST /ingest/upload`: multipart zip upload replacing the fixture set.
///
/// The dedup key is the `Idempotency-Key` header when present, else the
/// blob's content checksum; a key hit returns the original dataset version
/// without re-ingesting.
pub async fn ingest_upload(
    State(state): State<AppState>,
    Query(params): Query<IngestParams>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<Json<serde_json::Value>> {
    let mut blob: Option<Vec<u8>> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("could not read upload: {e}")))?;
            blob = Some(bytes.to_vec());
            break;
        }
    }
    let blob = blob.ok_or_else(|| ApiError::BadRequest("multipart field 'file' is required".into()))?;

    let checksum = ingest::checksum(&blob);
    let key = idempotency_key(&headers).unwrap_or_else(|| checksum.clone());

    if let Some(version) = state.ingested.get(&key) {
        return Ok(Json(json!({
            "datasetVersion": version,
            "checksum": checksum,
            "receivedFiles": [],
            "asOf": params.as_of,
            "idempotent": true,
        })));
    }

    let outcome = ingest::apply_archive(&blob, &state.dataset.snapshot())
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    state.dataset.publish(outcome.dataset);

    let version = format!("v{}", Utc::now().format("%Y%m%d-%H%M%S"));
    let (version, _existed) = state.ingested.put_if_absent(&key, version);
    info!(
        "Ingested dataset {} ({} files, source {:?})",
        version,
        outcome.received_files.len(),
        params.source_id
    );

    Ok(Json(json!({
        "datasetVersion": version,
        "checksum": checksum,
        "receivedFiles": outcome.received_files,
        "asOf": params.as_of,
        "parsed": { "prices_csv": outcome.parsed_prices_csv },
    })))
}

/// `POST /rebalance`: runs the pipeline, honoring `Idempotency-Key`.
pub async fn rebalance(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RebalanceRequest>,
) -> ApiResult<Json<RebalanceResult>> {
    let key = idempotency_key(&headers);
    let result = state.engine.rebalance(&req, key.as_deref()).await?;
    Ok(Json(result))
}

/// `POST /ack`: marks a rebalance batch acknowledged, flagging repeats.
pub async fn ack(
    State(state): State<AppState>,
    Json(result): Json<RebalanceResult>,
) -> impl IntoResponse {
    let duplicate = state.acks.acknowledge(&result.request_id);
    Json(json!({
        "status": "ok",
        "duplicate": duplicate,
        "received": { "requestId": result.request_id, "orders": result.orders.len() },
    }))
}

fn idempotency_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Idempotency-Key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_core::provider::MarketDataProvider;
    use axum::body::Body;
    use axum::http::{HeaderValue, Request, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use http_body_util::BodyExt;
    use judge_gateway::StubProvider;
    use std::io::{Cursor, Write};
    use tower::ServiceExt;
    use zip::write::SimpleFileOptions;

    #[test]
    fn idempotency_key_header_is_read_case_insensitively() {
        let mut headers = HeaderMap::new();
        headers.insert("idempotency-key", HeaderValue::from_static("abc"));
        assert_eq!(idempotency_key(&headers).as_deref(), Some("abc"));
        assert!(idempotency_key(&HeaderMap::new()).is_none());
    }

    fn test_app() -> (Router, SharedDataset) {
        let dataset = SharedDataset::seeded();
        let provider: Arc<dyn MarketDataProvider> =
            Arc::new(StubProvider::new(dataset.clone()));
        let state = AppState {
            engine: Arc::new(RebalanceEngine::new(provider)),
            acks: Arc::new(AckTracker::new()),
            ingested: Arc::new(IdempotencyStore::new()),
            dataset: dataset.clone(),
        };
        let app = Router::new()
            .route("/ingest/upload", post(ingest_upload))
            .with_state(state);
        (app, dataset)
    }

    fn dataset_zip(client_id: &str) -> Vec<u8> {
        let members = [
            (
                "clients.csv",
                format!("client_id,segment,risk_profile\n{client_id},retail,balanced\n"),
            ),
            (
                "holdings.csv",
                format!("account_id,ticker,qty\n{client_id},AAPL,10\n"),
            ),
            ("index.csv", "ticker,weight,sector\nAAPL,0.035,IT\n".into()),
            (
                "prices.csv",
                "date,ticker,close,adv\n2025-08-25,AAPL,227.13,82000000\n".into(),
            ),
            (
                "sentiment.jsonl",
                "{\"date\":\"2025-08-25\",\"ticker\":\"AAPL\",\"label\":\"pos\",\"score\":0.78}\n"
                    .into(),
            ),
        ];
        let mut cursor = Cursor::new(Vec::new());
        let mut writer = zip::ZipWriter::new(&mut cursor);
        for (name, content) in &members {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
        cursor.into_inner()
    }

    fn upload_request(blob: &[u8], idempotency_key: Option<&str>) -> Request<Body> {
        const BOUNDARY: &str = "ingest-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
                 filename=\"data.zip\"\r\nContent-Type: application/zip\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(blob);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let mut builder = Request::builder()
            .method("POST")
            .uri("/ingest/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(key) = idempotency_key {
            builder = builder.header("Idempotency-Key", key);
        }
        builder.body(Body::from(body)).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn keyed_upload_replay_skips_reingestion() {
        let (app, dataset) = test_app();

        let first = app
            .clone()
            .oneshot(upload_request(&dataset_zip("C100"), Some("ing-1")))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let first = json_body(first).await;
        assert!(first.get("idempotent").is_none());
        assert_eq!(first["receivedFiles"].as_array().unwrap().len(), 5);
        assert_eq!(dataset.snapshot().clients[0].client_id, "C100");

        // Same key, different archive: the original receipt comes back and
        // the published dataset is untouched.
        let second = app
            .clone()
            .oneshot(upload_request(&dataset_zip("C200"), Some("ing-1")))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::OK);
        let second = json_body(second).await;
        assert_eq!(second["idempotent"], true);
        assert!(second["receivedFiles"].as_array().unwrap().is_empty());
        assert_eq!(second["datasetVersion"], first["datasetVersion"]);
        assert_eq!(dataset.snapshot().clients[0].client_id, "C100");
    }

    #[tokio::test]
    async fn keyless_upload_dedupes_on_content_checksum() {
        let (app, _dataset) = test_app();
        let blob = dataset_zip("C300");

        let first = json_body(
            app.clone()
                .oneshot(upload_request(&blob, None))
                .await
                .unwrap(),
        )
        .await;
        let second = json_body(
            app.clone()
                .oneshot(upload_request(&blob, None))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(second["idempotent"], true);
        assert_eq!(second["checksum"], first["checksum"]);
        assert_eq!(second["datasetVersion"], first["datasetVersion"]);
    }

    #[tokio::test]
    async fn short_archive_upload_is_a_bad_request() {
        let (app, dataset) = test_app();
        // Zip with only one member fails the required-file check.
        let mut cursor = Cursor::new(Vec::new());
        let mut writer = zip::ZipWriter::new(&mut cursor);
        writer
            .start_file("clients.csv", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"client_id\nC900\n").unwrap();
        writer.finish().unwrap();
        let blob = cursor.into_inner();

        let response = app
            .clone()
            .oneshot(upload_request(&blob, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["detail"].as_str().unwrap().contains("clients.csv"));
        // Seeded fixtures stay published.
        assert_eq!(dataset.snapshot().clients.len(), 4);
    }
}
