use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::metrics::MetricsSnapshot;
use crate::pipeline::{ExtractionResult, FieldExtractor};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    pub data_fields: Vec<String>,
    pub data_fields_description: Vec<String>,
}

#[derive(Deserialize)]
struct IngestRequest {
    path: String,
}

#[derive(Serialize)]
struct IngestResponse {
    chunks_indexed: usize,
    namespace: String,
}

#[derive(Serialize)]
struct HealthResponse {
    qdrant: String,
    llm: String,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/chat", post(extract_fields))
        .route("/extract", post(extract_fields))
        .route("/ingest", post(ingest_documents))
        .route("/health", get(health_check).post(health_check))
        .route("/stats", get(get_stats))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn extract_fields(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ExtractRequest>, JsonRejection>,
) -> AppResult<Json<ExtractionResult>> {
    let started = Instant::now();
    let request_id = Uuid::new_v4();

    let outcome = async {
        let outcome = run_extraction(&state, body).await;
        match &outcome {
            Ok(result) => info!(
                fields = result.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Extraction finished"
            ),
            Err(e) => error!(error = %e, "Extraction failed"),
        }
        outcome
    }
    .instrument(info_span!("extract", %request_id))
    .await;

    state.metrics.record_request(outcome.is_ok(), started.elapsed());
    if let Ok(result) = &outcome {
        state.metrics.record_fields(result.len());
    }
    outcome.map(Json)
}

async fn run_extraction(
    state: &AppState,
    body: Result<Json<ExtractRequest>, JsonRejection>,
) -> AppResult<ExtractionResult> {
    let Json(request) = body?;
    info!(fields = request.data_fields.len(), "Extraction requested");

    let concurrency = &state.config.concurrency;
    let extractor = FieldExtractor::new(
        state.llm.clone(),
        state.retriever.clone(),
        concurrency.max_concurrent_fields,
    );

    let timeout = Duration::from_secs(concurrency.request_timeout_secs);
    let result = tokio::time::timeout(
        timeout,
        extractor.extract(&request.data_fields, &request.data_fields_description),
    )
    .await
    .map_err(|_| AppError::Timeout(concurrency.request_timeout_secs))??;

    Ok(result)
}

async fn ingest_documents(
    State(state): State<Arc<AppState>>,
    body: Result<Json<IngestRequest>, JsonRejection>,
) -> AppResult<Json<IngestResponse>> {
    let Json(request) = body?;
    let path = PathBuf::from(&request.path);
    if !path.exists() {
        return Err(AppError::NotFound(request.path));
    }

    let store = state
        .store
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("no vector store configured"))?;

    let chunks = ingest::ingest_path(&path, &state.splitter).await?;
    let chunks_indexed = store.upsert_chunks(&chunks).await?;
    state.metrics.record_ingest(chunks_indexed);

    info!(path = %request.path, chunks_indexed, "Corpus ingested");
    Ok(Json(IngestResponse {
        chunks_indexed,
        namespace: store.namespace().to_string(),
    }))
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let qdrant = match &state.store {
        Some(store) => match store.health().await {
            Ok(()) => "ok".to_string(),
            Err(e) => format!("error: {}", e),
        },
        None => "not configured".to_string(),
    };

    let llm = match reqwest::get(&state.config.llm.base_url).await {
        Ok(resp) if resp.status().is_success() => "ok".to_string(),
        Ok(resp) => format!("error: status {}", resp.status()),
        Err(e) => format!("error: {}", e),
    };

    Json(HealthResponse { qdrant, llm })
}

async fn get_stats(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
