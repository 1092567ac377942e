//! OpenAI embeddings and chat completions.
//!
//! One client serves both the [`Embedder`] and [`Generator`] contracts;
//! embedding requests are paced by an [`EmbedPacer`].

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use marquee_core::{
    EmbeddingVector, Embedder, Error, Generator, Provider, ProviderError, ProviderResult,
    SupportedModel,
};

use crate::config::Config;
use crate::providers::http::{decode, ensure_success, transport_error};
use crate::providers::pacing::EmbedPacer;

const TEMPERATURE: f32 = 0.7;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI API client.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    base_url: String,
    embedding_model: String,
    pacer: Arc<EmbedPacer>,
}

impl OpenAiClient {
    /// Create a client for an OpenAI-compatible endpoint.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the key is not a valid header value or
    /// the HTTP client cannot be built.
    pub fn new(
        api_key: &str,
        base_url: &str,
        embedding_model: impl Into<String>,
        timeout: Duration,
        requests_per_second: u32,
    ) -> marquee_core::Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
            .map_err(|_| Error::Config("invalid OpenAI API key".to_string()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .user_agent("marquee/0.1.0")
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to build OpenAI HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            embedding_model: embedding_model.into(),
            pacer: Arc::new(EmbedPacer::per_second(requests_per_second)),
        })
    }

    pub fn from_config(config: &Config) -> marquee_core::Result<Self> {
        Self::new(
            config.openai_api_key()?,
            &config.openai_base_url,
            config.embedding_model.clone(),
            config.request_timeout(),
            config.embedding_requests_per_second,
        )
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl Embedder for OpenAiClient {
    async fn embed(&self, text: &str) -> ProviderResult<EmbeddingVector> {
        let provider = Provider::Embedding;
        if text.trim().is_empty() {
            return Err(ProviderError::EmptyInput { provider });
        }

        self.pacer.wait_turn().await;

        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: text,
        };
        let response = self
            .http
            .post(self.endpoint("embeddings"))
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(provider, e))?;
        let response = ensure_success(provider, response).await?;
        let parsed: EmbeddingResponse = decode(provider, response).await?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| EmbeddingVector::new(d.embedding))
            .ok_or_else(|| ProviderError::Parse {
                provider,
                message: "response contained no embeddings".to_string(),
            })
    }
}

#[async_trait]
impl Generator for OpenAiClient {
    async fn complete(
        &self,
        model: SupportedModel,
        system_prompt: &str,
        user_prompt: &str,
    ) -> ProviderResult<String> {
        let provider = Provider::Generation;
        let request = ChatRequest {
            model: model.as_str(),
            temperature: TEMPERATURE,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
        };
        let response = self
            .http
            .post(self.endpoint("chat/completions"))
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(provider, e))?;
        let response = ensure_success(provider, response).await?;
        let parsed: ChatResponse = decode(provider, response).await?;

        parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ProviderError::Parse {
                provider,
                message: "response contained no message content".to_string(),
            })
    }
}
