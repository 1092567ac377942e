//! Shared mapping from `reqwest` outcomes to [`ProviderError`].

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use marquee_core::{Provider, ProviderError, ProviderResult};

/// Longest response body kept in an error message.
const MAX_BODY_CHARS: usize = 512;

/// Classify a transport-level failure.
pub fn transport_error(provider: Provider, err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout { provider }
    } else if err.is_decode() {
        ProviderError::Parse {
            provider,
            message: err.to_string(),
        }
    } else {
        ProviderError::Transport {
            provider,
            message: err.to_string(),
        }
    }
}

/// Classify a non-success HTTP status.
///
/// 429 is a rate limit, 408/504 a timeout, 400/401/403/422 a
/// non-retryable rejection; anything else keeps its status.
pub fn status_error(provider: Provider, status: StatusCode, body: &str) -> ProviderError {
    let message = truncate(body);
    match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited { provider },
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            ProviderError::Timeout { provider }
        }
        StatusCode::BAD_REQUEST
        | StatusCode::UNAUTHORIZED
        | StatusCode::FORBIDDEN
        | StatusCode::UNPROCESSABLE_ENTITY => ProviderError::Rejected {
            provider,
            message: format!("{status}: {message}"),
        },
        _ => ProviderError::Http {
            provider,
            status: status.as_u16(),
            message,
        },
    }
}

/// Pass a successful response through, turn anything else into an error.
pub async fn ensure_success(provider: Provider, response: Response) -> ProviderResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    Err(status_error(provider, status, &body))
}

/// Decode a JSON body.
pub async fn decode<T: DeserializeOwned>(provider: Provider, response: Response) -> ProviderResult<T> {
    response.json::<T>().await.map_err(|e| ProviderError::Parse {
        provider,
        message: e.to_string(),
    })
}

fn truncate(body: &str) -> String {
    let body = body.trim();
    if body.chars().count() <= MAX_BODY_CHARS {
        body.to_string()
    } else {
        let mut cut: String = body.chars().take(MAX_BODY_CHARS).collect();
        cut.push_str("...");
        cut
    }
}
