//! Fetching and normalization of raw snapshot files.
//!
//! For every candidate file the extractor fetches the JSON body, pulls the
//! nested live-status object apart, and produces one [`AreaObservation`]
//! plus its [`CategoryObservation`]s, unless the file earns a skip:
//!
//! - object absent for that minute/area (the producer simply had nothing)
//! - unparseable observation timestamp
//! - `(area_id, observed_at)` already in the ledger
//!
//! Skips are logged and counted, never errors. A malformed JSON body or any
//! storage failure other than not-found aborts the whole run; the ledger is
//! only persisted after extraction, so an abort commits nothing.

use serde::Deserialize;
use serde_json::Value;

use areapulse_core::{Error, PipelinePaths, Result, StorageBackend};

use crate::civil;
use crate::coerce::{coerce_float, coerce_int, coerce_string};
use crate::identity;
use crate::ledger::ProcessedLedger;
use crate::records::{AreaObservation, CategoryObservation, SourceFileRef};

/// Raw snapshot document as produced upstream. Extra fields are ignored.
#[derive(Debug, Deserialize)]
struct RawSnapshot {
    #[serde(rename = "AREA_CD", default)]
    area_code: Option<String>,
    #[serde(rename = "AREA_NM", default)]
    area_name: Option<String>,
    #[serde(rename = "LIVE_CMRCL_STTS")]
    live_status: RawLiveStatus,
}

/// Nested live-status object holding the observation payload.
#[derive(Debug, Deserialize)]
struct RawLiveStatus {
    #[serde(rename = "CMRCL_TIME", default)]
    observed_at: Option<Value>,
    #[serde(rename = "AREA_CMRCL_LVL", default)]
    congestion_level: Option<Value>,
    #[serde(rename = "AREA_SH_PAYMENT_CNT", default)]
    payment_count: Option<Value>,
    #[serde(rename = "AREA_SH_PAYMENT_AMT_MIN", default)]
    payment_amount_min: Option<Value>,
    #[serde(rename = "AREA_SH_PAYMENT_AMT_MAX", default)]
    payment_amount_max: Option<Value>,
    #[serde(rename = "CMRCL_MALE_RATE", default)]
    male_rate: Option<Value>,
    #[serde(rename = "CMRCL_FEMALE_RATE", default)]
    female_rate: Option<Value>,
    #[serde(rename = "CMRCL_10_RATE", default)]
    age_10s_rate: Option<Value>,
    #[serde(rename = "CMRCL_20_RATE", default)]
    age_20s_rate: Option<Value>,
    #[serde(rename = "CMRCL_30_RATE", default)]
    age_30s_rate: Option<Value>,
    #[serde(rename = "CMRCL_40_RATE", default)]
    age_40s_rate: Option<Value>,
    #[serde(rename = "CMRCL_50_RATE", default)]
    age_50s_rate: Option<Value>,
    #[serde(rename = "CMRCL_60_RATE", default)]
    age_60s_rate: Option<Value>,
    #[serde(rename = "CMRCL_PERSONAL_RATE", default)]
    individual_rate: Option<Value>,
    #[serde(rename = "CMRCL_CORPORATION_RATE", default)]
    corporate_rate: Option<Value>,
    #[serde(rename = "CMRCL_RSB", default)]
    categories: Vec<RawCategory>,
}

/// One category breakdown entry of the live-status object.
#[derive(Debug, Deserialize)]
struct RawCategory {
    #[serde(rename = "RSB_LRG_CTGR", default)]
    category_large: Option<Value>,
    #[serde(rename = "RSB_MID_CTGR", default)]
    category_medium: Option<Value>,
    #[serde(rename = "RSB_PAYMENT_LVL", default)]
    congestion_level: Option<Value>,
    #[serde(rename = "RSB_SH_PAYMENT_CNT", default)]
    payment_count: Option<Value>,
    #[serde(rename = "RSB_SH_PAYMENT_AMT_MIN", default)]
    payment_min: Option<Value>,
    #[serde(rename = "RSB_SH_PAYMENT_AMT_MAX", default)]
    payment_max: Option<Value>,
    #[serde(rename = "RSB_MCT_CNT", default)]
    merchant_count: Option<Value>,
    #[serde(rename = "RSB_MCT_TIME", default)]
    merchant_basis_month: Option<Value>,
}

/// Per-outcome counts for one extraction pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractStats {
    /// Files normalized into record sets.
    pub extracted: usize,
    /// Candidate references whose object did not exist.
    pub missing: usize,
    /// Files skipped for an unparseable observation timestamp.
    pub unparseable: usize,
    /// Files whose observation was already in the ledger.
    pub duplicates: usize,
}

/// The two correlated record sets produced by one extraction pass.
#[derive(Debug, Default)]
pub struct ExtractedBatch {
    /// Area-level observations, one per freshly processed file.
    pub areas: Vec<AreaObservation>,
    /// Category-level sub-records across all processed files.
    pub categories: Vec<CategoryObservation>,
    /// Outcome counts for observability.
    pub stats: ExtractStats,
}

/// Extracts all candidate files in order, consulting and updating `ledger`.
///
/// The ledger is mutated in memory only; persisting it is the caller's
/// responsibility once the run's outputs are safely uploaded.
///
/// # Errors
///
/// Fatal on any storage failure other than not-found and on snapshot bodies
/// that are not valid JSON or lack the live-status object.
pub async fn extract_window(
    storage: &dyn StorageBackend,
    paths: &PipelinePaths,
    ledger: &mut ProcessedLedger,
    refs: &[SourceFileRef],
) -> Result<ExtractedBatch> {
    let mut batch = ExtractedBatch::default();

    for file_ref in refs {
        let key = paths.raw_snapshot_key(file_ref.bucket_time, &file_ref.file_name);

        let body = match storage.get(&key).await {
            Ok(body) => body,
            Err(err) if err.is_not_found() => {
                tracing::info!(key, "no snapshot for this minute, skipping");
                batch.stats.missing += 1;
                continue;
            }
            Err(err) => return Err(err),
        };

        let raw: RawSnapshot = serde_json::from_slice(&body)
            .map_err(|e| Error::serialization(format!("snapshot '{key}': {e}")))?;

        let raw_observed_at = raw.live_status.observed_at.as_ref().and_then(Value::as_str);
        let observed_at = match raw_observed_at.map(civil::parse_raw_timestamp) {
            Some(Ok(ts)) => ts,
            _ => {
                tracing::warn!(
                    key,
                    raw_observed_at,
                    "unparseable observation timestamp, skipping file"
                );
                batch.stats.unparseable += 1;
                continue;
            }
        };

        if ledger.contains(file_ref.area_id, observed_at) {
            tracing::info!(
                key,
                area_id = file_ref.area_id,
                observed_at = %civil::format_timestamp(observed_at),
                "observation already processed, skipping"
            );
            batch.stats.duplicates += 1;
            continue;
        }

        let now = civil::now();
        let area_code = raw.area_code.unwrap_or_default();
        let source_id = identity::source_id(&area_code, observed_at);
        let live = &raw.live_status;

        batch.areas.push(AreaObservation {
            source_id: source_id.clone(),
            area_code,
            area_name: raw.area_name.unwrap_or_default(),
            congestion_level: coerce_string(live.congestion_level.as_ref()),
            total_payment_count: coerce_int(live.payment_count.as_ref()),
            payment_amount_min: coerce_int(live.payment_amount_min.as_ref()),
            payment_amount_max: coerce_int(live.payment_amount_max.as_ref()),
            male_ratio: coerce_float(live.male_rate.as_ref()),
            female_ratio: coerce_float(live.female_rate.as_ref()),
            age_10s_ratio: coerce_float(live.age_10s_rate.as_ref()),
            age_20s_ratio: coerce_float(live.age_20s_rate.as_ref()),
            age_30s_ratio: coerce_float(live.age_30s_rate.as_ref()),
            age_40s_ratio: coerce_float(live.age_40s_rate.as_ref()),
            age_50s_ratio: coerce_float(live.age_50s_rate.as_ref()),
            age_60s_ratio: coerce_float(live.age_60s_rate.as_ref()),
            individual_consumer_ratio: coerce_float(live.individual_rate.as_ref()),
            corporate_consumer_ratio: coerce_float(live.corporate_rate.as_ref()),
            observed_at,
            created_at: now,
        });

        for category in &live.categories {
            batch.categories.push(CategoryObservation {
                source_id: source_id.clone(),
                category_large: coerce_string(category.category_large.as_ref()),
                category_medium: coerce_string(category.category_medium.as_ref()),
                category_congestion_level: coerce_string(category.congestion_level.as_ref()),
                category_payment_count: coerce_int(category.payment_count.as_ref()),
                category_payment_min: coerce_int(category.payment_min.as_ref()),
                category_payment_max: coerce_int(category.payment_max.as_ref()),
                merchant_count: coerce_int(category.merchant_count.as_ref()),
                merchant_basis_month: coerce_string(category.merchant_basis_month.as_ref()),
                observed_at,
                created_at: now,
            });
        }

        ledger.record(file_ref.area_id, observed_at, now);
        batch.stats.extracted += 1;
        tracing::info!(key, source_id, "extracted snapshot");
    }

    tracing::info!(
        extracted = batch.stats.extracted,
        missing = batch.stats.missing,
        unparseable = batch.stats.unparseable,
        duplicates = batch.stats.duplicates,
        area_rows = batch.areas.len(),
        category_rows = batch.categories.len(),
        "extraction pass complete"
    );
    Ok(batch)
}
