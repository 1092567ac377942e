//! Full-library sync: catalog → descriptor → embedding → vector index.
//!
//! Records are embedded concurrently up to `concurrency` at a time, but
//! results are consumed in enumeration order so batches are assembled
//! and flushed in that order and at most one batch of vectors is held.

use std::fmt;
use std::sync::Arc;

use futures::StreamExt;

use marquee_core::{
    CatalogRecord, CatalogSource, Descriptor, Embedder, Error, IndexEntry, IndexSpec,
    IndexStatus, ProviderResult, Result, RetryPolicy, SyncReport, VectorIndex,
};

use crate::config::Config;

/// Tuning knobs for a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSettings {
    /// Entries per upsert call.
    pub batch_size: usize,
    /// Records embedded concurrently.
    pub concurrency: usize,
    pub retry: RetryPolicy,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            batch_size: 100,
            concurrency: 8,
            retry: RetryPolicy::default(),
        }
    }
}

impl IngestSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            batch_size: config.batch_size,
            concurrency: config.concurrency,
            retry: config.retry_policy(),
        }
    }
}

/// What became of one enumerated record.
enum Prepared {
    Entry(IndexEntry),
    Skipped,
}

/// Syncs catalog sections into the vector index.
///
/// Each call to [`IngestPipeline::sync`] owns its own batch; nothing is
/// shared between runs apart from the injected clients.
pub struct IngestPipeline {
    catalog: Arc<dyn CatalogSource>,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    spec: IndexSpec,
    settings: IngestSettings,
}

impl fmt::Debug for IngestPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestPipeline")
            .field("spec", &self.spec)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl IngestPipeline {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        spec: IndexSpec,
    ) -> Self {
        Self {
            catalog,
            embedder,
            index,
            spec,
            settings: IngestSettings::default(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: IngestSettings) -> Self {
        self.settings = IngestSettings {
            batch_size: settings.batch_size.max(1),
            concurrency: settings.concurrency.max(1),
            retry: settings.retry,
        };
        self
    }

    pub fn spec(&self) -> &IndexSpec {
        &self.spec
    }

    /// Create the target index if it is missing.
    ///
    /// # Errors
    /// A configuration error if an index with the same name but a
    /// different dimension exists; an index error if the provider fails.
    pub async fn ensure_index(&self) -> Result<IndexStatus> {
        self.index.ensure_index(&self.spec).await
    }

    /// Index every record of `section`.
    ///
    /// Records that cannot be described or embedded are skipped and
    /// counted. Catalog failures, dimension mismatches, and upsert
    /// failures stop the run with [`Error::SyncAborted`] carrying what
    /// was confirmed so far.
    ///
    /// # Errors
    /// See above; also fails if the index cannot be ensured.
    pub async fn sync(&self, section: &str) -> Result<SyncReport> {
        self.ensure_index().await?;

        let mut report = SyncReport::new(section);
        log::info!("Starting sync of section '{}' (run {})", section, report.run_id);

        let mut prepared = self
            .catalog
            .list_section(section)
            .map(|item| self.prepare(item))
            .buffered(self.settings.concurrency);

        let mut batch: Vec<IndexEntry> = Vec::with_capacity(self.settings.batch_size);

        while let Some(outcome) = prepared.next().await {
            match outcome {
                Ok(Prepared::Entry(entry)) => {
                    batch.push(entry);
                    if batch.len() >= self.settings.batch_size {
                        if let Err(e) = self.flush(&mut batch, &mut report).await {
                            return Err(abort(report, e));
                        }
                    }
                }
                Ok(Prepared::Skipped) => report.items_skipped += 1,
                Err(e) => return Err(abort(report, e)),
            }
        }

        if !batch.is_empty() {
            if let Err(e) = self.flush(&mut batch, &mut report).await {
                return Err(abort(report, e));
            }
        }

        report.finish();
        log::info!(
            "Finished sync of section '{}': {} processed, {} skipped, {} batches",
            section,
            report.items_processed,
            report.items_skipped,
            report.batches_upserted
        );
        Ok(report)
    }

    /// Sync each section in turn. The first fatal error stops the run.
    ///
    /// # Errors
    /// The error of the first section that failed.
    pub async fn sync_all<S: AsRef<str>>(&self, sections: &[S]) -> Result<Vec<SyncReport>> {
        let mut reports = Vec::with_capacity(sections.len());
        for section in sections {
            reports.push(self.sync(section.as_ref()).await?);
        }
        Ok(reports)
    }

    async fn prepare(&self, item: ProviderResult<CatalogRecord>) -> Result<Prepared> {
        let record = item.map_err(Error::Catalog)?;

        if let Err(e) = record.validate() {
            log::warn!("Skipping record: {}", e);
            return Ok(Prepared::Skipped);
        }

        let descriptor = Descriptor::for_ingestion(&record);
        if descriptor.is_empty() {
            log::warn!("Skipping record {}: empty descriptor", record.id);
            return Ok(Prepared::Skipped);
        }

        let embedded = self
            .settings
            .retry
            .run("embed record", || self.embedder.embed(descriptor.as_str()))
            .await;
        let vector = match embedded {
            Ok(vector) => vector,
            Err(e) => {
                log::warn!("Skipping record {} ('{}'): {}", record.id, record.title, e);
                return Ok(Prepared::Skipped);
            }
        };

        vector.check_dimension(self.spec.dimension, format!("embedding of record {}", record.id))?;
        Ok(Prepared::Entry(IndexEntry::new(record.id, vector)))
    }

    /// Upsert `batch` and count it. The batch is only counted once the
    /// provider confirms it.
    async fn flush(&self, batch: &mut Vec<IndexEntry>, report: &mut SyncReport) -> Result<()> {
        let entries: &[IndexEntry] = batch;
        self.settings
            .retry
            .run("upsert batch", || self.index.upsert(&self.spec.name, entries))
            .await
            .map_err(Error::Index)?;

        report.items_processed += batch.len();
        report.batches_upserted += 1;
        log::info!(
            "Upserted batch {} ({} entries) into '{}'",
            report.batches_upserted,
            batch.len(),
            self.spec.name
        );
        batch.clear();
        Ok(())
    }
}

fn abort(mut report: SyncReport, source: Error) -> Error {
    report.finish();
    log::error!(
        "Sync of section '{}' aborted after {} batches: {}",
        report.section,
        report.batches_upserted,
        source
    );
    Error::aborted(report, source)
}
