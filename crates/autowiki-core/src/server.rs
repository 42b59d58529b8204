//! HTTP adapter over the ingestion and search services.
//!
//! A thin `axum` router around `Arc<ServerState>`, translating
//! `AutoWikiError::status_code()` into the HTTP status and exposing the
//! four-endpoint surface: ingest, search, clear, stats.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::config::Config;
use crate::embedder::{EmbeddingProvider, HashingEmbedder};
use crate::error::AutoWikiError;
use crate::graph::GraphService;
use crate::orchestrator::IngestionOrchestrator;
use crate::search::SearchService;
use crate::types::{IngestStats, ModuleTreeNode, ProjectId, SearchStats, VectorHit, VectorStats};
use crate::vector::VectorStore;

/// Shared server state: the collaborators every handler needs, built
/// once at startup and cloned cheaply per-request via `Arc`.
pub struct ServerState {
    orchestrator: IngestionOrchestrator,
    search: SearchService,
    vector: Arc<VectorStore>,
    graph: Arc<GraphService>,
    default_search_limit: usize,
}

impl ServerState {
    /// Build server state from configuration, wiring a default
    /// hashing-based `EmbeddingProvider`.
    pub fn new(config: Config) -> Self {
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbedder::new(config.vector.dimensions));
        let graph = Arc::new(GraphService::new(&config));
        let vector = Arc::new(VectorStore::new(&config, embedder));
        let orchestrator = IngestionOrchestrator::new(config.clone(), Arc::clone(&graph), Arc::clone(&vector));
        let search = SearchService::new(Arc::clone(&graph), Arc::clone(&vector));

        Self {
            orchestrator,
            search,
            vector,
            graph,
            default_search_limit: config.search.default_limit,
        }
    }
}

/// Build the axum router mounting all four endpoints over `state`.
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/api/ingest", post(ingest))
        .route("/api/search", get(search))
        .route("/api/clear", post(clear))
        .route("/api/stats", get(stats))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct IngestRequest {
    repo_url: String,
    #[serde(default)]
    project_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct IngestResponse {
    status: &'static str,
    stats: IngestStats,
}

async fn ingest(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, ApiError> {
    let stats = state.orchestrator.ingest(&body.repo_url, body.project_id).await?;
    Ok(Json(IngestResponse { status: "ok", stats }))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: String,
    project_id: String,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum SearchResponse {
    Tree {
        tree: ModuleTreeNode,
        stats: SearchStats,
    },
    Fallback {
        results: Vec<VectorHit>,
        fallback: bool,
    },
}

async fn search(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let project_id = ProjectId::new(params.project_id);
    let limit = params.limit.unwrap_or(state.default_search_limit);

    match state.search.search(&project_id, &params.q, limit) {
        Ok((tree, stats)) => Ok(Json(SearchResponse::Tree { tree, stats })),
        Err(AutoWikiError::TreeMissing(_)) => {
            let results = state.search.search_raw(&project_id, &params.q, limit)?;
            Ok(Json(SearchResponse::Fallback { results, fallback: true }))
        }
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Deserialize)]
struct ProjectParam {
    project_id: String,
}

#[derive(Debug, Serialize)]
struct ClearResponse {
    status: &'static str,
    deleted_count: usize,
}

async fn clear(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<ProjectParam>,
) -> Result<Json<ClearResponse>, ApiError> {
    let project_id = ProjectId::new(params.project_id);
    let deleted_count = state.vector.stats(&project_id)?.count;
    state.vector.delete_collection(&project_id)?;
    state.graph.delete_graph(&project_id)?;
    Ok(Json(ClearResponse { status: "ok", deleted_count }))
}

async fn stats(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<ProjectParam>,
) -> Result<Json<VectorStats>, ApiError> {
    let project_id = ProjectId::new(params.project_id);
    Ok(Json(state.vector.stats(&project_id)?))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

struct ApiError(AutoWikiError);

impl From<AutoWikiError> for ApiError {
    fn from(err: AutoWikiError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorBody { error: self.0.to_string() })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_carries_configured_default_search_limit() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = Config::default();
        config.base_dir = dir.path().to_path_buf();
        config.search.default_limit = 42;

        let state = ServerState::new(config);
        assert_eq!(state.default_search_limit, 42);
    }

    #[test]
    fn api_error_maps_status_code_from_taxonomy() {
        let err: ApiError = AutoWikiError::TreeMissing("p".into()).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
