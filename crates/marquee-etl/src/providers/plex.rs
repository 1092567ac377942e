//! Plex Media Server catalog client.
//!
//! Sections are enumerated page by page with the container start/size
//! headers, so a large library is never held in memory at once.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use marquee_core::{
    CatalogRecord, CatalogSource, Error, MediaKind, Provider, ProviderError, ProviderResult,
    RecordId, RecordStream, RetryPolicy,
};

use crate::config::Config;
use crate::providers::http::{decode, ensure_success, transport_error};

const PROVIDER: Provider = Provider::Catalog;

/// Items requested per page when enumerating a section.
pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(rename = "MediaContainer")]
    container: T,
}

#[derive(Debug, Deserialize)]
struct SectionList {
    #[serde(rename = "Directory", default)]
    directories: Vec<SectionDirectory>,
}

#[derive(Debug, Deserialize)]
struct SectionDirectory {
    key: String,
    title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataPage {
    #[serde(default)]
    total_size: Option<usize>,
    #[serde(rename = "Metadata", default)]
    metadata: Vec<PlexMetadata>,
}

#[derive(Debug, Deserialize)]
struct Tag {
    tag: String,
}

/// One item as Plex describes it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlexMetadata {
    rating_key: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    title: String,
    year: Option<i32>,
    #[serde(rename = "Genre", default)]
    genres: Vec<Tag>,
    #[serde(rename = "Role", default)]
    roles: Vec<Tag>,
    #[serde(rename = "Director", default)]
    directors: Vec<Tag>,
    content_rating: Option<String>,
    studio: Option<String>,
    audience_rating: Option<f64>,
    summary: Option<String>,
}

fn tags(tags: Vec<Tag>) -> Vec<String> {
    tags.into_iter().map(|t| t.tag).collect()
}

impl From<PlexMetadata> for CatalogRecord {
    fn from(item: PlexMetadata) -> Self {
        Self {
            id: RecordId::new(item.rating_key),
            kind: MediaKind::from_catalog_type(&item.kind),
            title: item.title,
            year: item.year,
            genres: tags(item.genres),
            cast: tags(item.roles),
            directors: tags(item.directors),
            content_rating: item.content_rating,
            studio: item.studio,
            audience_rating: item.audience_rating,
            summary: item.summary,
        }
    }
}

/// Plex REST client.
#[derive(Debug, Clone)]
pub struct PlexClient {
    http: Client,
    base_url: String,
    page_size: usize,
    retry: RetryPolicy,
}

impl PlexClient {
    /// # Errors
    /// Returns [`Error::Config`] if the token is not a valid header value or
    /// the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        token: &str,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> marquee_core::Result<Self> {
        let mut token = HeaderValue::from_str(token.trim())
            .map_err(|_| Error::Config("invalid Plex token".to_string()))?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("X-Plex-Token", token);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .user_agent("marquee/0.1.0")
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to build Plex HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            retry,
        })
    }

    pub fn from_config(config: &Config) -> marquee_core::Result<Self> {
        Self::new(
            &config.plex_url,
            config.plex_token()?,
            config.request_timeout(),
            config.retry_policy(),
        )
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        page: Option<(usize, usize)>,
    ) -> ProviderResult<T> {
        let mut request = self.http.get(format!("{}{}", self.base_url, path));
        if let Some((start, size)) = page {
            request = request
                .header("X-Plex-Container-Start", start)
                .header("X-Plex-Container-Size", size);
        }
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        let response = ensure_success(PROVIDER, response).await?;
        let envelope: Envelope<T> = decode(PROVIDER, response).await?;
        Ok(envelope.container)
    }

    /// Resolve a section title to its library key.
    async fn section_key(&self, section: &str) -> ProviderResult<String> {
        let sections: SectionList = self
            .retry
            .run("list Plex sections", || self.get("/library/sections", None))
            .await?;
        find_section_key(&sections.directories, section).ok_or_else(|| ProviderError::NotFound {
            provider: PROVIDER,
            entity: format!("section '{section}'"),
        })
    }

    async fn page(&self, key: &str, start: usize) -> ProviderResult<MetadataPage> {
        let path = format!("/library/sections/{key}/all");
        self.retry
            .run("list Plex section page", || {
                self.get(&path, Some((start, self.page_size)))
            })
            .await
    }
}

fn find_section_key(directories: &[SectionDirectory], section: &str) -> Option<String> {
    let wanted = section.trim();
    directories
        .iter()
        .find(|d| d.title.trim().eq_ignore_ascii_case(wanted))
        .map(|d| d.key.clone())
}

/// Whether a page of `received` items ends the enumeration.
///
/// `totalSize` decides when the server reports it, since a server may cap
/// pages below `page_size`. An empty page always ends the run.
fn is_last_page(received: usize, page_size: usize, next_start: usize, total: Option<usize>) -> bool {
    if received == 0 {
        return true;
    }
    match total {
        Some(total) => next_start >= total,
        None => received < page_size,
    }
}

struct Pager<'a> {
    client: &'a PlexClient,
    section: &'a str,
    key: Option<String>,
    start: usize,
    buffer: VecDeque<CatalogRecord>,
    done: bool,
}

impl Pager<'_> {
    async fn fill(&mut self) -> ProviderResult<()> {
        let key = match &self.key {
            Some(key) => key.clone(),
            None => {
                let key = self.client.section_key(self.section).await?;
                log::debug!("Plex section '{}' has key {}", self.section, key);
                self.key = Some(key.clone());
                key
            }
        };

        let page = self.client.page(&key, self.start).await?;
        let received = page.metadata.len();
        self.start += received;
        self.done = is_last_page(received, self.client.page_size, self.start, page.total_size);
        self.buffer
            .extend(page.metadata.into_iter().map(CatalogRecord::from));
        Ok(())
    }
}

#[async_trait]
impl CatalogSource for PlexClient {
    fn list_section<'a>(&'a self, section: &'a str) -> RecordStream<'a> {
        let pager = Pager {
            client: self,
            section,
            key: None,
            start: 0,
            buffer: VecDeque::new(),
            done: false,
        };

        stream::unfold(pager, |mut pager| async move {
            loop {
                if let Some(record) = pager.buffer.pop_front() {
                    return Some((Ok(record), pager));
                }
                if pager.done {
                    return None;
                }
                if let Err(e) = pager.fill().await {
                    pager.done = true;
                    return Some((Err(e), pager));
                }
            }
        })
        .boxed()
    }

    async fn fetch_by_id(&self, id: &RecordId) -> ProviderResult<CatalogRecord> {
        let not_found = || ProviderError::NotFound {
            provider: PROVIDER,
            entity: format!("record {id}"),
        };

        let response = self
            .http
            .get(format!("{}/library/metadata/{}", self.base_url, id))
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(not_found());
        }
        let response = ensure_success(PROVIDER, response).await?;
        let envelope: Envelope<MetadataPage> = decode(PROVIDER, response).await?;

        envelope
            .container
            .metadata
            .into_iter()
            .next()
            .map(CatalogRecord::from)
            .ok_or_else(not_found)
    }
}
