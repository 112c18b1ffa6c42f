//! Run orchestration.
//!
//! [`Pipeline::run`] wires the stages together in their fixed order:
//! discover, load ledger, extract, encode, upload, persist ledger, request
//! warehouse loads. The ledger is persisted on every run, including empty
//! ones, and always after the uploads succeed. A crash between upload and
//! ledger save therefore re-emits the window's rows on the next run; the
//! reverse order would silently drop them, which is the worse failure.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::Instrument;

use areapulse_core::{PipelinePaths, Result, StorageBackend, WritePrecondition, observability};

use crate::civil;
use crate::config::PipelineConfig;
use crate::discovery;
use crate::encode;
use crate::extract::{self, ExtractStats};
use crate::ledger::ProcessedLedger;
use crate::warehouse::{CopyRequest, WarehouseLoader};

/// Outcome of one pipeline run.
#[derive(Debug)]
pub struct RunSummary {
    /// Area rows encoded and uploaded.
    pub area_rows: usize,
    /// Category rows encoded and uploaded.
    pub category_rows: usize,
    /// Extraction outcome counts.
    pub stats: ExtractStats,
    /// Key of the uploaded area table blob, if any rows were produced.
    pub area_table_path: Option<String>,
    /// Key of the uploaded category table blob, if any rows were produced.
    pub category_table_path: Option<String>,
    /// Observations appended to the ledger by this run.
    pub new_ledger_entries: usize,
}

/// The assembled pipeline.
pub struct Pipeline {
    storage: Arc<dyn StorageBackend>,
    warehouse: Arc<dyn WarehouseLoader>,
    config: PipelineConfig,
    paths: PipelinePaths,
}

impl Pipeline {
    /// Assembles a pipeline over the given collaborators.
    #[must_use]
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        warehouse: Arc<dyn WarehouseLoader>,
        config: PipelineConfig,
    ) -> Self {
        let paths = config.paths();
        Self {
            storage,
            warehouse,
            config,
            paths,
        }
    }

    /// Executes one run for the window derived from `trigger`.
    ///
    /// # Errors
    ///
    /// Fatal conditions abort the run before the ledger is persisted:
    /// storage failures, malformed snapshot bodies or keys, an unreadable
    /// ledger document, encode failures, and a lost ledger write race.
    pub async fn run(&self, trigger: DateTime<Utc>) -> Result<RunSummary> {
        let civil_trigger = civil::to_civil(trigger);
        let span = observability::run_span("run", &civil::format_timestamp(civil_trigger));
        self.run_inner(civil_trigger).instrument(span).await
    }

    async fn run_inner(&self, trigger: chrono::NaiveDateTime) -> Result<RunSummary> {
        let storage = self.storage.as_ref();

        let refs = discovery::discover_window(storage, &self.paths, trigger).await?;

        let ledger_key = self.paths.ledger_key();
        let mut ledger = ProcessedLedger::load(storage, &ledger_key).await?;
        let entries_before = ledger.len();

        let batch = extract::extract_window(storage, &self.paths, &mut ledger, &refs).await?;

        // Output blobs are addressed by processing time, one pair per run.
        let processed_at = civil::now();
        let mut requests = Vec::new();

        let area_table_path = if batch.areas.is_empty() {
            tracing::info!("no area rows this window, skipping upload");
            None
        } else {
            let key = self.paths.area_table_key(processed_at);
            let blob = encode::write_area_observations(&batch.areas)?;
            storage.put(&key, blob, WritePrecondition::None).await?;
            tracing::info!(key, rows = batch.areas.len(), "uploaded area table");
            requests.push(CopyRequest::area(
                self.object_url(&key),
                self.config.warehouse_iam_role.clone(),
            ));
            Some(key)
        };

        let category_table_path = if batch.categories.is_empty() {
            tracing::info!("no category rows this window, skipping upload");
            None
        } else {
            let key = self.paths.category_table_key(processed_at);
            let blob = encode::write_category_observations(&batch.categories)?;
            storage.put(&key, blob, WritePrecondition::None).await?;
            tracing::info!(key, rows = batch.categories.len(), "uploaded category table");
            requests.push(CopyRequest::category(
                self.object_url(&key),
                self.config.warehouse_iam_role.clone(),
            ));
            Some(key)
        };

        ledger.save(storage, &ledger_key).await?;

        if requests.is_empty() {
            tracing::warn!("nothing uploaded this run, no warehouse loads requested");
        }
        for request in &requests {
            self.warehouse.copy_into(request).await?;
        }

        let summary = RunSummary {
            area_rows: batch.areas.len(),
            category_rows: batch.categories.len(),
            stats: batch.stats,
            area_table_path,
            category_table_path,
            new_ledger_entries: ledger.len() - entries_before,
        };
        tracing::info!(
            area_rows = summary.area_rows,
            category_rows = summary.category_rows,
            new_ledger_entries = summary.new_ledger_entries,
            "run complete"
        );
        Ok(summary)
    }

    /// Location of an uploaded blob as the warehouse will address it.
    fn object_url(&self, key: &str) -> String {
        let bucket = &self.config.storage_bucket;
        if bucket.contains("://") {
            format!("{bucket}/{key}")
        } else {
            format!("s3://{bucket}/{key}")
        }
    }
}
