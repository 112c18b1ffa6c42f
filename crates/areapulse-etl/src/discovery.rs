//! Enumeration of candidate snapshot files for one run's time window.
//!
//! The window is fixed: the 5 one-minute buckets ending 5 minutes before the
//! trigger. A trigger at 09:35 covers 09:30 through 09:34. For each minute
//! the object store is listed under `{raw_prefix}/{YYYYMMDD}/{HHmm}_` and
//! every returned key must follow the producer's naming convention
//! `{HHmm}_{area_id}.json` exactly; a key that does not is a fatal input,
//! not something to guess around.

use chrono::{Duration, NaiveDateTime};

use areapulse_core::{Error, PipelinePaths, Result, StorageBackend};

use crate::records::SourceFileRef;

/// Number of one-minute buckets in the lookback window.
pub const LOOKBACK_MINUTES: i64 = 5;

/// Enumerates candidate snapshot files for the window ending
/// `LOOKBACK_MINUTES` before `trigger` (pipeline civil time).
///
/// Output order is minute bucket first, then key order within each bucket.
///
/// # Errors
///
/// Fatal on any listing failure or on a key whose file name does not match
/// the two-part `{HHmm}_{area_id}.json` convention.
pub async fn discover_window(
    storage: &dyn StorageBackend,
    paths: &PipelinePaths,
    trigger: NaiveDateTime,
) -> Result<Vec<SourceFileRef>> {
    let mut refs = Vec::new();

    for i in 0..LOOKBACK_MINUTES {
        let minute = trigger - Duration::minutes(LOOKBACK_MINUTES - i);
        let prefix = paths.raw_minute_prefix(minute);

        for meta in storage.list(&prefix).await? {
            let area_id = parse_area_id(&meta.path)?;
            refs.push(SourceFileRef {
                bucket_time: minute,
                area_id,
                file_name: format!("{}_{area_id}.json", minute.format("%H%M")),
            });
        }
    }

    tracing::info!(candidates = refs.len(), "discovered snapshot window");
    Ok(refs)
}

/// Extracts the area id from a snapshot key's trailing file name.
fn parse_area_id(key: &str) -> Result<i64> {
    let file_name = key.rsplit('/').next().unwrap_or(key);
    let stem = file_name.strip_suffix(".json").ok_or_else(|| {
        Error::InvalidInput(format!("snapshot key '{key}' does not end in .json"))
    })?;

    match stem.split('_').collect::<Vec<_>>().as_slice() {
        [_, area] => area.parse().map_err(|_| {
            Error::InvalidInput(format!("snapshot key '{key}' has a non-integer area id"))
        }),
        _ => Err(Error::InvalidInput(format!(
            "snapshot key '{key}' does not match the {{HHmm}}_{{area_id}}.json convention"
        ))),
    }
}
