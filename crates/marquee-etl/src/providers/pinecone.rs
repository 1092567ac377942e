//! Pinecone vector index client.
//!
//! Index lifecycle calls go to the control plane; upsert, query, and
//! delete go to the per-index data-plane host, which is resolved with a
//! describe call and cached by index name.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;

use marquee_core::{
    EmbeddingVector, Error, IndexEntry, IndexSpec, Metric, Provider, ProviderError,
    ProviderResult, RecordId, RetrievalMatch, VectorIndex,
};

use crate::config::Config;
use crate::providers::http::{decode, ensure_success, transport_error};

const PROVIDER: Provider = Provider::VectorIndex;
const API_VERSION: &str = "2024-07";
const POD_TYPE: &str = "p1.x1";

/// How often and how long to wait for a new index to become ready.
const READY_POLL_INTERVAL: Duration = Duration::from_secs(2);
const READY_POLL_ATTEMPTS: usize = 60;

#[derive(Debug, Deserialize)]
struct IndexDescription {
    name: String,
    dimension: usize,
    metric: Metric,
    host: String,
    #[serde(default)]
    status: IndexState,
}

#[derive(Debug, Default, Deserialize)]
struct IndexState {
    #[serde(default)]
    ready: bool,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<VectorPayload<'a>>,
}

#[derive(Serialize)]
struct VectorPayload<'a> {
    id: &'a str,
    values: &'a [f32],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_values: bool,
    include_metadata: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
}

/// Where new indexes are provisioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deployment {
    Pod { environment: String },
    Serverless { cloud: String, region: String },
}

impl Deployment {
    fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Pod { environment } => json!({
                "pod": { "environment": environment, "pod_type": POD_TYPE }
            }),
            Self::Serverless { cloud, region } => json!({
                "serverless": { "cloud": cloud, "region": region }
            }),
        }
    }
}

/// Pinecone REST client.
#[derive(Debug)]
pub struct PineconeClient {
    http: Client,
    controller_url: String,
    deployment: Deployment,
    hosts: RwLock<HashMap<String, String>>,
}

impl PineconeClient {
    /// # Errors
    /// Returns [`Error::Config`] if the key is not a valid header value or
    /// the HTTP client cannot be built.
    pub fn new(
        api_key: &str,
        controller_url: &str,
        deployment: Deployment,
        timeout: Duration,
    ) -> marquee_core::Result<Self> {
        let mut key = HeaderValue::from_str(api_key.trim())
            .map_err(|_| Error::Config("invalid Pinecone API key".to_string()))?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("Api-Key", key);
        headers.insert("X-Pinecone-API-Version", HeaderValue::from_static(API_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .user_agent("marquee/0.1.0")
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to build Pinecone HTTP client: {e}")))?;

        Ok(Self {
            http,
            controller_url: controller_url.trim_end_matches('/').to_string(),
            deployment,
            hosts: RwLock::new(HashMap::new()),
        })
    }

    pub fn from_config(config: &Config) -> marquee_core::Result<Self> {
        let deployment = match config.pinecone_environment.as_deref().map(str::trim) {
            Some(env) if !env.is_empty() => Deployment::Pod {
                environment: env.to_string(),
            },
            _ => Deployment::Serverless {
                cloud: config.pinecone_cloud.clone(),
                region: config.pinecone_region.clone(),
            },
        };
        Self::new(
            config.pinecone_api_key()?,
            &config.pinecone_controller_url,
            deployment,
            config.request_timeout(),
        )
    }

    async fn describe(&self, name: &str) -> ProviderResult<Option<IndexDescription>> {
        let response = self
            .http
            .get(format!("{}/indexes/{}", self.controller_url, name))
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = ensure_success(PROVIDER, response).await?;
        let description: IndexDescription = decode(PROVIDER, response).await?;

        if description.status.ready {
            self.hosts
                .write()
                .await
                .insert(description.name.clone(), data_plane_url(&description.host));
        }
        Ok(Some(description))
    }

    async fn wait_until_ready(&self, name: &str) -> ProviderResult<()> {
        for _ in 0..READY_POLL_ATTEMPTS {
            if let Some(description) = self.describe(name).await? {
                if description.status.ready {
                    return Ok(());
                }
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
        Err(ProviderError::Timeout { provider: PROVIDER })
    }

    async fn host(&self, index: &str) -> ProviderResult<String> {
        if let Some(host) = self.hosts.read().await.get(index) {
            return Ok(host.clone());
        }
        match self.describe(index).await? {
            Some(description) if description.status.ready => {
                Ok(data_plane_url(&description.host))
            }
            Some(_) => Err(ProviderError::Http {
                provider: PROVIDER,
                status: StatusCode::SERVICE_UNAVAILABLE.as_u16(),
                message: format!("index '{index}' is not ready"),
            }),
            None => Err(ProviderError::NotFound {
                provider: PROVIDER,
                entity: format!("index '{index}'"),
            }),
        }
    }
}

fn data_plane_url(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("https://{}", host.trim_end_matches('/'))
    }
}

#[async_trait]
impl VectorIndex for PineconeClient {
    async fn describe_index(&self, name: &str) -> ProviderResult<Option<IndexSpec>> {
        Ok(self
            .describe(name)
            .await?
            .map(|d| IndexSpec::new(d.name, d.dimension, d.metric)))
    }

    async fn create_index(&self, spec: &IndexSpec) -> ProviderResult<()> {
        let body = json!({
            "name": spec.name,
            "dimension": spec.dimension,
            "metric": spec.metric.as_str(),
            "spec": self.deployment.to_json(),
        });
        let response = self
            .http
            .post(format!("{}/indexes", self.controller_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        // Another process created it first.
        if response.status() != StatusCode::CONFLICT {
            ensure_success(PROVIDER, response).await?;
        }
        self.wait_until_ready(&spec.name).await
    }

    async fn upsert(&self, index: &str, entries: &[IndexEntry]) -> ProviderResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let host = self.host(index).await?;
        let request = UpsertRequest {
            vectors: entries
                .iter()
                .map(|e| VectorPayload {
                    id: e.id.as_str(),
                    values: e.vector.as_slice(),
                })
                .collect(),
        };
        let response = self
            .http
            .post(format!("{host}/vectors/upsert"))
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        let response = ensure_success(PROVIDER, response).await?;
        let confirmed: UpsertResponse = decode(PROVIDER, response).await?;

        if confirmed.upserted_count != entries.len() {
            return Err(ProviderError::Rejected {
                provider: PROVIDER,
                message: format!(
                    "index '{index}' confirmed {} of {} vectors",
                    confirmed.upserted_count,
                    entries.len()
                ),
            });
        }
        Ok(())
    }

    async fn query(
        &self,
        index: &str,
        vector: &EmbeddingVector,
        top_k: usize,
    ) -> ProviderResult<Vec<RetrievalMatch>> {
        let host = self.host(index).await?;
        let request = QueryRequest {
            vector: vector.as_slice(),
            top_k,
            include_values: false,
            include_metadata: false,
        };
        let response = self
            .http
            .post(format!("{host}/query"))
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        let response = ensure_success(PROVIDER, response).await?;
        let parsed: QueryResponse = decode(PROVIDER, response).await?;

        Ok(parsed
            .matches
            .into_iter()
            .map(|m| RetrievalMatch::new(m.id, m.score))
            .collect())
    }

    async fn delete(&self, index: &str, ids: &[RecordId]) -> ProviderResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let host = self.host(index).await?;
        let ids: Vec<&str> = ids.iter().map(RecordId::as_str).collect();
        let response = self
            .http
            .post(format!("{host}/vectors/delete"))
            .json(&json!({ "ids": ids }))
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        ensure_success(PROVIDER, response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_plane_url() {
        assert_eq!(
            data_plane_url("media-abc123.svc.pinecone.io"),
            "https://media-abc123.svc.pinecone.io"
        );
        assert_eq!(data_plane_url("http://localhost:5081/"), "http://localhost:5081");
    }

    #[test]
    fn test_deployment_json() {
        let pod = Deployment::Pod {
            environment: "us-west1-gcp".to_string(),
        };
        assert_eq!(pod.to_json()["pod"]["environment"], "us-west1-gcp");

        let serverless = Deployment::Serverless {
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
        };
        assert_eq!(serverless.to_json()["serverless"]["region"], "us-east-1");
    }

    #[test]
    fn test_from_config_picks_serverless_without_environment() {
        let config = Config {
            pinecone_api_key: Some("pc-key".to_string()),
            ..Config::default()
        };
        let client = PineconeClient::from_config(&config).unwrap();
        assert!(matches!(client.deployment, Deployment::Serverless { .. }));
    }

    #[test]
    fn test_from_config_requires_key() {
        let err = PineconeClient::from_config(&Config::default()).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_index_description_deserialize() {
        let json = r#"{
            "name": "media-library",
            "dimension": 1536,
            "metric": "cosine",
            "host": "media-library-xyz.svc.pinecone.io",
            "status": {"ready": true, "state": "Ready"}
        }"#;
        let description: IndexDescription = serde_json::from_str(json).unwrap();
        assert_eq!(description.dimension, 1536);
        assert_eq!(description.metric, Metric::Cosine);
        assert!(description.status.ready);
    }

    #[test]
    fn test_query_request_uses_camel_case() {
        let request = QueryRequest {
            vector: &[0.5, 0.5],
            top_k: 20,
            include_values: false,
            include_metadata: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["topK"], 20);
        assert_eq!(json["includeValues"], false);
    }

    #[test]
    fn test_query_response_deserialize() {
        let json = r#"{"matches":[{"id":"101","score":0.91},{"id":"7","score":0.83}],"namespace":""}"#;
        let parsed: QueryResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.matches.len(), 2);
        assert_eq!(parsed.matches[0].id, "101");
    }

    #[test]
    fn test_upsert_response_deserialize() {
        let parsed: UpsertResponse = serde_json::from_str(r#"{"upsertedCount":100}"#).unwrap();
        assert_eq!(parsed.upserted_count, 100);
    }
}
