//! Warehouse bulk-load interface.
//!
//! The warehouse load is an external collaborator: this module only fixes
//! the contract (target tables, positional column lists matching the
//! Parquet schemas in [`crate::encode`], and the COPY statement text) and
//! exposes the [`WarehouseLoader`] trait the orchestrator hands upload
//! locations to. Execution, connections, and credentials live outside the
//! pipeline.

use async_trait::async_trait;

use areapulse_core::Result;

/// Target table for area observations.
pub const AREA_TABLE: &str = "source.source_commercial";

/// Target table for category observations.
pub const CATEGORY_TABLE: &str = "source.source_commercial_rsb";

/// Positionally-ordered column list of the area table.
pub const AREA_COLUMNS: [&str; 19] = [
    "source_id",
    "area_code",
    "area_name",
    "congestion_level",
    "total_payment_count",
    "payment_amount_min",
    "payment_amount_max",
    "male_ratio",
    "female_ratio",
    "age_10s_ratio",
    "age_20s_ratio",
    "age_30s_ratio",
    "age_40s_ratio",
    "age_50s_ratio",
    "age_60s_ratio",
    "individual_consumer_ratio",
    "corporate_consumer_ratio",
    "observed_at",
    "created_at",
];

/// Positionally-ordered column list of the category table.
pub const CATEGORY_COLUMNS: [&str; 11] = [
    "source_id",
    "category_large",
    "category_medium",
    "category_congestion_level",
    "category_payment_count",
    "category_payment_min",
    "category_payment_max",
    "merchant_count",
    "merchant_basis_month",
    "observed_at",
    "created_at",
];

/// One bulk-load request for an uploaded Parquet blob.
#[derive(Debug, Clone)]
pub struct CopyRequest {
    /// Fully-qualified target table.
    pub table: &'static str,
    /// Positional column list of the target table.
    pub columns: &'static [&'static str],
    /// Location of the uploaded blob, e.g. `s3://bucket/key`.
    pub source_url: String,
    /// IAM role the warehouse assumes to read the blob.
    pub iam_role: String,
}

impl CopyRequest {
    /// Builds a request against the area table.
    #[must_use]
    pub fn area(source_url: String, iam_role: String) -> Self {
        Self {
            table: AREA_TABLE,
            columns: &AREA_COLUMNS,
            source_url,
            iam_role,
        }
    }

    /// Builds a request against the category table.
    #[must_use]
    pub fn category(source_url: String, iam_role: String) -> Self {
        Self {
            table: CATEGORY_TABLE,
            columns: &CATEGORY_COLUMNS,
            source_url,
            iam_role,
        }
    }
}

/// Renders the COPY statement for a request.
///
/// The column list is positional and must match the Parquet schema of the
/// blob exactly.
#[must_use]
pub fn copy_statement(request: &CopyRequest) -> String {
    format!(
        "COPY {} (\n    {}\n)\nFROM '{}'\nIAM_ROLE '{}'\nFORMAT AS PARQUET;",
        request.table,
        request.columns.join(", "),
        request.source_url,
        request.iam_role,
    )
}

/// External collaborator that executes warehouse bulk loads.
#[async_trait]
pub trait WarehouseLoader: Send + Sync {
    /// Loads one uploaded blob into its target table.
    ///
    /// # Errors
    ///
    /// Implementations surface load failures as pipeline errors; the
    /// orchestrator treats them as fatal for the run.
    async fn copy_into(&self, request: &CopyRequest) -> Result<()>;
}

/// Loader that emits COPY statements for an external executor.
///
/// The pipeline binary has no warehouse connection of its own; it logs the
/// exact statement so the surrounding scheduler can execute it.
#[derive(Debug, Default)]
pub struct StatementLogger;

#[async_trait]
impl WarehouseLoader for StatementLogger {
    async fn copy_into(&self, request: &CopyRequest) -> Result<()> {
        tracing::info!(
            table = request.table,
            source_url = %request.source_url,
            statement = %copy_statement(request),
            "warehouse load requested"
        );
        Ok(())
    }
}

/// Loader that records requests in memory, for tests.
#[derive(Debug, Default)]
pub struct RecordingLoader {
    requests: std::sync::Mutex<Vec<CopyRequest>>,
}

impl RecordingLoader {
    /// Creates an empty recording loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the requests received so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn requests(&self) -> Vec<CopyRequest> {
        self.requests.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl WarehouseLoader for RecordingLoader {
    async fn copy_into(&self, request: &CopyRequest) -> Result<()> {
        self.requests
            .lock()
            .map_err(|_| areapulse_core::Error::Internal {
                message: "lock poisoned".into(),
            })?
            .push(request.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_lists_match_encode_schemas() {
        let area: Vec<_> = crate::encode::area_table_schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        assert_eq!(area, AREA_COLUMNS);

        let category: Vec<_> = crate::encode::category_table_schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        assert_eq!(category, CATEGORY_COLUMNS);
    }

    #[test]
    fn copy_statement_is_positional_parquet_import() {
        let request = CopyRequest::area(
            "s3://bucket/pq/commercial/20250708/0935.parquet".into(),
            "arn:aws:iam::123:role/load".into(),
        );
        let sql = copy_statement(&request);

        assert!(sql.starts_with("COPY source.source_commercial ("));
        assert!(sql.contains("source_id, area_code, area_name"));
        assert!(sql.contains("FROM 's3://bucket/pq/commercial/20250708/0935.parquet'"));
        assert!(sql.contains("IAM_ROLE 'arn:aws:iam::123:role/load'"));
        assert!(sql.trim_end().ends_with("FORMAT AS PARQUET;"));
    }

    #[tokio::test]
    async fn recording_loader_captures_requests() {
        let loader = RecordingLoader::new();
        loader
            .copy_into(&CopyRequest::category("s3://b/k".into(), "role".into()))
            .await
            .unwrap();

        let requests = loader.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].table, CATEGORY_TABLE);
    }
}
