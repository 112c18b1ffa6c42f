//! Typed record sets produced by extraction.
//!
//! The untyped, dictionary-shaped rows of the upstream feed map onto explicit
//! structs here, with missing values as `Option` rather than sentinels. One
//! [`AreaObservation`] owns its [`CategoryObservation`]s only through the
//! shared `source_id`; nothing else enforces the relationship.

use chrono::NaiveDateTime;

/// One candidate snapshot file, derived purely from the naming convention
/// `{raw_prefix}/{YYYYMMDD}/{HHmm}_{area_id}.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFileRef {
    /// Minute bucket the file belongs to, in pipeline civil time.
    pub bucket_time: NaiveDateTime,
    /// Area identifier parsed from the file name.
    pub area_id: i64,
    /// Normalized file name, `{HHmm}_{area_id}.json`.
    pub file_name: String,
}

/// One row per `(area, observed_at)`: the area-level observation.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaObservation {
    /// Deterministic 32-character identifier, see [`crate::identity`].
    pub source_id: String,
    /// Upstream area code.
    pub area_code: String,
    /// Human-readable area name.
    pub area_name: String,
    /// Categorical congestion label for the whole area.
    pub congestion_level: String,
    /// Total card payment count in the window.
    pub total_payment_count: Option<i32>,
    /// Lower bound of the payment amount band.
    pub payment_amount_min: Option<i32>,
    /// Upper bound of the payment amount band.
    pub payment_amount_max: Option<i32>,
    /// Male consumption ratio.
    pub male_ratio: Option<f64>,
    /// Female consumption ratio.
    pub female_ratio: Option<f64>,
    /// Consumption ratio, ages 10-19.
    pub age_10s_ratio: Option<f64>,
    /// Consumption ratio, ages 20-29.
    pub age_20s_ratio: Option<f64>,
    /// Consumption ratio, ages 30-39.
    pub age_30s_ratio: Option<f64>,
    /// Consumption ratio, ages 40-49.
    pub age_40s_ratio: Option<f64>,
    /// Consumption ratio, ages 50-59.
    pub age_50s_ratio: Option<f64>,
    /// Consumption ratio, ages 60 and up.
    pub age_60s_ratio: Option<f64>,
    /// Individual-card consumption ratio.
    pub individual_consumer_ratio: Option<f64>,
    /// Corporate-card consumption ratio.
    pub corporate_consumer_ratio: Option<f64>,
    /// Observation timestamp, pipeline civil time at second precision.
    pub observed_at: NaiveDateTime,
    /// Pipeline-assigned extraction timestamp.
    pub created_at: NaiveDateTime,
}

/// One per-business-category sub-record of an [`AreaObservation`].
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryObservation {
    /// Identifier of the owning area observation.
    pub source_id: String,
    /// Large business-category label.
    pub category_large: String,
    /// Medium business-category label.
    pub category_medium: String,
    /// Categorical congestion label for this category.
    pub category_congestion_level: String,
    /// Card payment count for this category.
    pub category_payment_count: Option<i32>,
    /// Lower bound of the category payment amount band.
    pub category_payment_min: Option<i32>,
    /// Upper bound of the category payment amount band.
    pub category_payment_max: Option<i32>,
    /// Number of merchants in the category.
    pub merchant_count: Option<i32>,
    /// Month the merchant count is based on.
    pub merchant_basis_month: String,
    /// Observation timestamp, shared with the owning area observation.
    pub observed_at: NaiveDateTime,
    /// Pipeline-assigned extraction timestamp.
    pub created_at: NaiveDateTime,
}
