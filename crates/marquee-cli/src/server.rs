//! HTTP surface over the two pipelines.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use marquee_core::{Error, SyncReport};

use crate::services::Services;

pub type AppState = Arc<Services>;

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/get-episode-data", get(sync_library))
        .route("/querydb", get(query_library))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct QueryParams {
    #[serde(default)]
    query: String,
    model: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct QueryResponse {
    response: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct SyncResponse {
    reports: Vec<SyncReport>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ErrorBody {
    error: String,
    stage: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<SyncReport>,
}

/// A pipeline error rendered as a JSON response.
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            err if err.is_config() => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("Request failed in {} stage: {}", self.0.stage(), self.0);
        }
        let body = ErrorBody {
            error: self.0.to_string(),
            stage: self.0.stage().to_string(),
            report: self.0.partial_report().cloned(),
        };
        (status, Json(body)).into_response()
    }
}

async fn healthz() -> &'static str {
    "ok"
}

async fn sync_library(State(state): State<AppState>) -> Result<Json<SyncResponse>, ApiError> {
    let reports = state.ingest.sync_all(state.sections.as_slice()).await?;
    Ok(Json(SyncResponse { reports }))
}

async fn query_library(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> Result<Json<QueryResponse>, ApiError> {
    let result = state
        .query
        .answer(&params.query, params.model.as_deref())
        .await?;
    Ok(Json(QueryResponse {
        response: result.answer,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use futures::stream::{self, StreamExt};

    use marquee_core::{
        CatalogRecord, CatalogSource, EmbeddingVector, Embedder, Generator, IndexSpec,
        InMemoryIndex, MediaKind, Metric, Provider, ProviderError, ProviderResult, RecordId,
        RecordStream, RetryPolicy, SupportedModel, VectorIndex,
    };
    use marquee_etl::{IngestPipeline, IngestSettings};
    use marquee_search::QueryPipeline;

    const DIM: usize = 3;

    struct Library(Vec<CatalogRecord>);

    #[async_trait]
    impl CatalogSource for Library {
        fn list_section<'a>(&'a self, _section: &'a str) -> RecordStream<'a> {
            stream::iter(self.0.iter().cloned().map(Ok)).boxed()
        }

        async fn fetch_by_id(&self, id: &RecordId) -> ProviderResult<CatalogRecord> {
            self.0
                .iter()
                .find(|r| &r.id == id)
                .cloned()
                .ok_or_else(|| ProviderError::NotFound {
                    provider: Provider::Catalog,
                    entity: id.to_string(),
                })
        }
    }

    struct LengthEmbedder;

    #[async_trait]
    impl Embedder for LengthEmbedder {
        async fn embed(&self, text: &str) -> ProviderResult<EmbeddingVector> {
            Ok(EmbeddingVector::new(vec![text.len() as f32, 1.0, 1.0]))
        }
    }

    struct EchoGenerator {
        fail: bool,
    }

    #[async_trait]
    impl Generator for EchoGenerator {
        async fn complete(
            &self,
            model: SupportedModel,
            _system_prompt: &str,
            _user_prompt: &str,
        ) -> ProviderResult<String> {
            if self.fail {
                return Err(ProviderError::Rejected {
                    provider: Provider::Generation,
                    message: "invalid api key".to_string(),
                });
            }
            Ok(format!("Try Heat ({model})"))
        }
    }

    fn services(index: Arc<InMemoryIndex>, fail_generation: bool) -> Services {
        let library = Arc::new(Library(vec![
            CatalogRecord::new("1", MediaKind::Movie, "Heat").with_year(1995),
            CatalogRecord::new("2", MediaKind::Show, "The Wire").with_year(2002),
        ]));
        let embedder = Arc::new(LengthEmbedder);
        let spec = IndexSpec::new("media", DIM, Metric::Cosine);
        let retry = RetryPolicy::new(0);

        let ingest = IngestPipeline::new(
            Arc::clone(&library) as _,
            Arc::clone(&embedder) as _,
            Arc::clone(&index) as _,
            spec.clone(),
        )
        .with_settings(IngestSettings {
            batch_size: 10,
            concurrency: 2,
            retry,
        });
        let query = QueryPipeline::new(
            embedder,
            index,
            library,
            Arc::new(EchoGenerator {
                fail: fail_generation,
            }),
            spec,
        )
        .with_retry(retry);

        Services {
            ingest,
            query,
            sections: vec!["Movies".to_string(), "TV Shows".to_string()],
        }
    }

    async fn spawn(services: Services) -> (String, tokio::task::JoinHandle<()>) {
        let app = app_router(Arc::new(services));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), handle)
    }

    #[test]
    fn test_status_mapping() {
        let validation = ApiError::from(Error::Validation("bad model".to_string()));
        assert_eq!(validation.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let config = ApiError::from(Error::DimensionMismatch {
            context: "index 'media'".to_string(),
            expected: 1536,
            actual: 768,
        });
        assert_eq!(config.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let retrieval = ApiError::from(Error::Retrieval(ProviderError::Timeout {
            provider: Provider::VectorIndex,
        }));
        assert_eq!(retrieval.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_healthz() {
        let (base, handle) = spawn(services(Arc::new(InMemoryIndex::new()), false)).await;

        let response = reqwest::get(format!("{base}/healthz")).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(response.text().await.unwrap(), "ok");

        handle.abort();
    }

    #[tokio::test]
    async fn test_sync_then_query() {
        let index = Arc::new(InMemoryIndex::new());
        let (base, handle) = spawn(services(Arc::clone(&index), false)).await;

        let response = reqwest::get(format!("{base}/get-episode-data")).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: SyncResponse = response.json().await.unwrap();
        assert_eq!(body.reports.len(), 2);
        assert_eq!(body.reports[0].items_processed, 2);
        assert_eq!(index.entry_count("media").await, Some(2));

        let response = reqwest::get(format!("{base}/querydb?query=crime%20drama&model=gpt-4"))
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: QueryResponse = response.json().await.unwrap();
        assert_eq!(body.response, "Try Heat (gpt-4)");

        handle.abort();
    }

    #[tokio::test]
    async fn test_unsupported_model_is_422() {
        let (base, handle) = spawn(services(Arc::new(InMemoryIndex::new()), false)).await;

        let response = reqwest::get(format!("{base}/querydb?query=heist&model=gpt-2"))
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
        let body: ErrorBody = response.json().await.unwrap();
        assert_eq!(body.stage, "validation");

        handle.abort();
    }

    #[tokio::test]
    async fn test_missing_query_is_422() {
        let (base, handle) = spawn(services(Arc::new(InMemoryIndex::new()), false)).await;

        let response = reqwest::get(format!("{base}/querydb")).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);

        handle.abort();
    }

    #[tokio::test]
    async fn test_generation_failure_names_stage() {
        let index = Arc::new(InMemoryIndex::new());
        index
            .create_index(&IndexSpec::new("media", DIM, Metric::Cosine))
            .await
            .unwrap();
        let (base, handle) = spawn(services(index, true)).await;

        let response = reqwest::get(format!("{base}/querydb?query=heist")).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_GATEWAY);
        let body: ErrorBody = response.json().await.unwrap();
        assert_eq!(body.stage, "generation");

        handle.abort();
    }

    #[tokio::test]
    async fn test_index_dimension_mismatch_is_500() {
        let index = Arc::new(InMemoryIndex::new());
        index
            .create_index(&IndexSpec::new("media", 1536, Metric::Cosine))
            .await
            .unwrap();
        let (base, handle) = spawn(services(index, false)).await;

        let response = reqwest::get(format!("{base}/get-episode-data")).await.unwrap();
        assert_eq!(
            response.status(),
            reqwest::StatusCode::INTERNAL_SERVER_ERROR
        );
        let body: ErrorBody = response.json().await.unwrap();
        assert_eq!(body.stage, "configuration");

        handle.abort();
    }
}
