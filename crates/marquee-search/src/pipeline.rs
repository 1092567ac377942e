use std::fmt;
use std::sync::Arc;

use futures::future::join_all;

use marquee_core::{
    CatalogSource, Descriptor, Embedder, Error, Generator, IndexSpec, QueryResult, Result,
    RetrievalMatch, RetryPolicy, SupportedModel, VectorIndex,
};

use crate::prompt::{grounding_text, user_prompt, SYSTEM_PROMPT};

/// Nearest neighbours retrieved per query.
pub const DEFAULT_TOP_K: usize = 20;

/// Answers free-text requests from the indexed library.
///
/// The index is assumed to exist; it is ensured once at startup or by
/// ingestion, never per query.
pub struct QueryPipeline {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    catalog: Arc<dyn CatalogSource>,
    generator: Arc<dyn Generator>,
    spec: IndexSpec,
    top_k: usize,
    retry: RetryPolicy,
}

impl fmt::Debug for QueryPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryPipeline")
            .field("spec", &self.spec)
            .field("top_k", &self.top_k)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl QueryPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        catalog: Arc<dyn CatalogSource>,
        generator: Arc<dyn Generator>,
        spec: IndexSpec,
    ) -> Self {
        Self {
            embedder,
            index,
            catalog,
            generator,
            spec,
            top_k: DEFAULT_TOP_K,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Answer `query` with the model named `model`, or the default model.
    ///
    /// # Errors
    /// [`Error::Validation`] for an unsupported model or blank query,
    /// before any provider is called; otherwise see
    /// [`QueryPipeline::answer_with`].
    pub async fn answer(&self, query: &str, model: Option<&str>) -> Result<QueryResult> {
        let model = match model.map(str::trim).filter(|m| !m.is_empty()) {
            Some(name) => name.parse::<SupportedModel>()?,
            None => SupportedModel::default(),
        };
        self.answer_with(query, model).await
    }

    /// Answer `query` with `model`.
    ///
    /// Zero matches is not an error: generation still runs against the
    /// no-matches grounding.
    ///
    /// # Errors
    /// [`Error::Embedding`], [`Error::Retrieval`], or
    /// [`Error::Generation`] once retries are exhausted.
    pub async fn answer_with(&self, query: &str, model: SupportedModel) -> Result<QueryResult> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::Validation("query must not be empty".to_string()));
        }

        let vector = self
            .retry
            .run("embed query", || self.embedder.embed(query))
            .await
            .map_err(Error::Embedding)?;
        vector.check_dimension(self.spec.dimension, "query embedding")?;

        let mut matches = self
            .retry
            .run("query index", || {
                self.index.query(&self.spec.name, &vector, self.top_k)
            })
            .await
            .map_err(Error::Retrieval)?;
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(self.top_k);
        log::debug!("Retrieved {} matches for query", matches.len());

        let (used, descriptors) = self.resolve(matches).await;
        let grounding = grounding_text(&descriptors);
        let prompt = user_prompt(query, &grounding);

        let answer = self
            .retry
            .run("generate answer", || {
                self.generator.complete(model, SYSTEM_PROMPT, &prompt)
            })
            .await
            .map_err(Error::Generation)?;

        Ok(QueryResult {
            answer,
            matches: used,
        })
    }

    /// Fetch the record behind each match concurrently, keeping rank
    /// order. Matches whose record cannot be fetched or described are
    /// dropped, so the returned matches are exactly those grounded on.
    async fn resolve(
        &self,
        matches: Vec<RetrievalMatch>,
    ) -> (Vec<RetrievalMatch>, Vec<Descriptor>) {
        let fetches = matches.iter().map(|m| async move {
            self.retry
                .run("fetch catalog record", || self.catalog.fetch_by_id(&m.id))
                .await
        });
        let fetched = join_all(fetches).await;

        let mut used = Vec::with_capacity(matches.len());
        let mut descriptors = Vec::with_capacity(matches.len());
        for (m, result) in matches.into_iter().zip(fetched) {
            match result {
                Ok(record) => {
                    if let Err(e) = record.validate() {
                        log::warn!("Skipping match {}: {}", m.id, e);
                        continue;
                    }
                    let descriptor = Descriptor::for_query(&record);
                    if descriptor.is_empty() {
                        log::warn!("Skipping match {}: empty descriptor", m.id);
                        continue;
                    }
                    used.push(m);
                    descriptors.push(descriptor);
                }
                Err(e) if e.is_not_found() => {
                    log::warn!("Skipping match {}: record no longer in catalog", m.id);
                }
                Err(e) => log::warn!("Skipping match {}: {}", m.id, e),
            }
        }
        (used, descriptors)
    }
}
