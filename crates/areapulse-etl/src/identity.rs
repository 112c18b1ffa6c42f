//! Deterministic content-derived identifier for observations.
//!
//! `source_id` binds an area observation to its category sub-records without
//! a surrogate-key allocator: the same `(area_code, observed_at)` always
//! hashes to the same 32-character identifier, in this run or any other.

use chrono::NaiveDateTime;

use crate::civil;

/// Computes the source identifier for an observation.
///
/// The digest input is `{area_code}_{observed_at}` with the timestamp in its
/// normalized form; the output is a lowercase 32-character hex string.
#[must_use]
pub fn source_id(area_code: &str, observed_at: NaiveDateTime) -> String {
    let raw = format!("{area_code}_{}", civil::format_timestamp(observed_at));
    format!("{:x}", md5::compute(raw.as_bytes()))
}
