//! Canonical storage paths for the pipeline.
//!
//! This module is the single source of truth for every key the pipeline
//! reads or writes. No hardcoded path strings should exist outside it.
//!
//! # Key Layout
//!
//! ```text
//! {raw_prefix}/{YYYYMMDD}/{HHmm}_{area_id}.json      raw snapshots (external producer)
//! {history_prefix}/commercial.json                   processing ledger
//! {area_table_prefix}/{YYYYMMDD}/{HHmm}.parquet      encoded area table
//! {category_table_prefix}/{YYYYMMDD}/{HHmm}.parquet  encoded category table
//! ```
//!
//! Date and time segments are civil Asia/Seoul values supplied by the caller
//! as naive datetimes; this module only formats, it never converts zones.

use chrono::NaiveDateTime;

/// File name of the ledger document under the history prefix.
pub const LEDGER_FILE: &str = "commercial.json";

/// Extension of encoded columnar table blobs.
pub const TABLE_EXT: &str = "parquet";

/// Canonical path generator for pipeline storage.
#[derive(Debug, Clone)]
pub struct PipelinePaths {
    raw_prefix: String,
    area_table_prefix: String,
    category_table_prefix: String,
    history_prefix: String,
}

impl PipelinePaths {
    /// Creates a path generator from the four configured prefixes.
    ///
    /// Trailing slashes are stripped so prefixes compose cleanly.
    #[must_use]
    pub fn new(
        raw_prefix: &str,
        area_table_prefix: &str,
        category_table_prefix: &str,
        history_prefix: &str,
    ) -> Self {
        Self {
            raw_prefix: raw_prefix.trim_end_matches('/').to_string(),
            area_table_prefix: area_table_prefix.trim_end_matches('/').to_string(),
            category_table_prefix: category_table_prefix.trim_end_matches('/').to_string(),
            history_prefix: history_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Listing prefix for one minute bucket of raw snapshots, e.g.
    /// `raw_json_data/20250708/0930_`.
    #[must_use]
    pub fn raw_minute_prefix(&self, minute: NaiveDateTime) -> String {
        format!(
            "{}/{}/{}_",
            self.raw_prefix,
            minute.format("%Y%m%d"),
            minute.format("%H%M")
        )
    }

    /// Full key of one raw snapshot given its minute bucket and file name.
    #[must_use]
    pub fn raw_snapshot_key(&self, minute: NaiveDateTime, file_name: &str) -> String {
        format!("{}/{}/{file_name}", self.raw_prefix, minute.format("%Y%m%d"))
    }

    /// Key of the processing ledger document.
    #[must_use]
    pub fn ledger_key(&self) -> String {
        format!("{}/{LEDGER_FILE}", self.history_prefix)
    }

    /// Output key for the encoded area table, addressed by processing time.
    #[must_use]
    pub fn area_table_key(&self, processed_at: NaiveDateTime) -> String {
        Self::table_key(&self.area_table_prefix, processed_at)
    }

    /// Output key for the encoded category table, addressed by processing time.
    #[must_use]
    pub fn category_table_key(&self, processed_at: NaiveDateTime) -> String {
        Self::table_key(&self.category_table_prefix, processed_at)
    }

    fn table_key(prefix: &str, at: NaiveDateTime) -> String {
        format!(
            "{prefix}/{}/{}.{TABLE_EXT}",
            at.format("%Y%m%d"),
            at.format("%H%M")
        )
    }
}
