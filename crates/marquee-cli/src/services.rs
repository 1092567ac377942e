//! Client construction and pipeline wiring.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use marquee_core::{InMemoryIndex, VectorIndex};
use marquee_etl::{
    config, Config, IngestPipeline, IngestSettings, OpenAiClient, PineconeClient, PlexClient,
};
use marquee_search::QueryPipeline;

/// Both pipelines plus the sections a full sync covers.
#[derive(Debug)]
pub struct Services {
    pub ingest: IngestPipeline,
    pub query: QueryPipeline,
    pub sections: Vec<String>,
}

/// Load config from `path`, or the default location.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path),
        None => Config::load_from(&config::config_file_path()),
    }
    .context("Failed to load configuration")?;
    config.validate()?;
    Ok(config)
}

impl Services {
    /// Build every client from `config` and inject them into the pipelines.
    ///
    /// Both pipelines share one index handle and one [`marquee_core::IndexSpec`].
    pub fn from_config(config: &Config, in_memory_index: bool) -> Result<Self> {
        let openai = Arc::new(OpenAiClient::from_config(config)?);
        let plex = Arc::new(PlexClient::from_config(config)?);
        let index: Arc<dyn VectorIndex> = if in_memory_index {
            log::info!("Using in-memory vector index");
            Arc::new(InMemoryIndex::new())
        } else {
            Arc::new(PineconeClient::from_config(config)?)
        };
        let spec = config.index_spec();

        let ingest = IngestPipeline::new(
            Arc::clone(&plex) as _,
            Arc::clone(&openai) as _,
            Arc::clone(&index),
            spec.clone(),
        )
        .with_settings(IngestSettings::from_config(config));

        let query = QueryPipeline::new(Arc::clone(&openai) as _, index, plex, openai, spec)
            .with_top_k(config.top_k)
            .with_retry(config.retry_policy());

        Ok(Self {
            ingest,
            query,
            sections: config.sections.clone(),
        })
    }
}
