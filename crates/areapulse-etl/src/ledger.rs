//! Durable ledger of already-processed observations.
//!
//! The ledger is a single JSON document mapping `area_id` (as a string key)
//! to the ordered history of `{observed_at, processed_at}` entries for that
//! area. It is loaded once at the start of a run, held in memory, extended
//! as files are extracted, and persisted once at the end. It grows
//! monotonically; nothing here deletes or compacts it.
//!
//! Persistence uses a conditional write fenced on the version token captured
//! at load time. Two overlapping runs would otherwise silently lose each
//! other's entries and emit duplicate warehouse rows; with the fence, the
//! second writer fails fatally instead.

use std::collections::{BTreeMap, HashSet};

use bytes::Bytes;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use areapulse_core::{Error, Result, StorageBackend, WritePrecondition, WriteResult};

use crate::civil;

/// One processed observation in an area's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Observation timestamp, normalized civil time.
    #[serde(with = "civil::timestamp_string")]
    pub observed_at: NaiveDateTime,
    /// When the pipeline extracted the observation.
    #[serde(with = "civil::timestamp_string")]
    pub processed_at: NaiveDateTime,
}

/// In-memory state of the processing ledger for one run.
///
/// `entries` is the durable grouped structure; `membership` is the flattened
/// `(area_id, observed_at)` set used for O(1) dedup checks during extraction.
#[derive(Debug, Default)]
pub struct ProcessedLedger {
    entries: BTreeMap<String, Vec<LedgerEntry>>,
    membership: HashSet<(i64, NaiveDateTime)>,
    version: Option<String>,
}

impl ProcessedLedger {
    /// Creates an empty ledger, the expected first-run state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the ledger document from `key`.
    ///
    /// A missing document yields an empty ledger; this is the normal first
    /// run, not an error. The object's version token is captured so that
    /// [`save`](Self::save) can fence against concurrent runs.
    ///
    /// # Errors
    ///
    /// Any storage failure other than not-found is fatal, as is a document
    /// that does not parse into the grouped structure.
    pub async fn load(storage: &dyn StorageBackend, key: &str) -> Result<Self> {
        let Some(meta) = storage.head(key).await? else {
            tracing::warn!(key, "no processing ledger found, starting fresh");
            return Ok(Self::new());
        };

        let body = storage.get(key).await?;
        let entries: BTreeMap<String, Vec<LedgerEntry>> = serde_json::from_slice(&body)
            .map_err(|e| Error::serialization(format!("ledger document '{key}': {e}")))?;

        let mut membership = HashSet::new();
        for (area_key, history) in &entries {
            let area_id: i64 = area_key.parse().map_err(|_| {
                Error::serialization(format!("ledger area key '{area_key}' is not an integer"))
            })?;
            for entry in history {
                membership.insert((area_id, entry.observed_at));
            }
        }

        tracing::info!(key, entries = membership.len(), "loaded processing ledger");
        Ok(Self {
            entries,
            membership,
            version: Some(meta.version),
        })
    }

    /// Returns whether `(area_id, observed_at)` was already processed,
    /// in a prior run or earlier in this one.
    #[must_use]
    pub fn contains(&self, area_id: i64, observed_at: NaiveDateTime) -> bool {
        self.membership.contains(&(area_id, observed_at))
    }

    /// Records a successfully extracted observation.
    ///
    /// Appends to the area's history and inserts into the membership set.
    /// Callers are expected to have checked [`contains`](Self::contains)
    /// first; this method does not deduplicate on its own.
    pub fn record(&mut self, area_id: i64, observed_at: NaiveDateTime, processed_at: NaiveDateTime) {
        self.entries.entry(area_id.to_string()).or_default().push(LedgerEntry {
            observed_at,
            processed_at,
        });
        self.membership.insert((area_id, observed_at));
    }

    /// Number of `(area_id, observed_at)` pairs in the ledger.
    #[must_use]
    pub fn len(&self) -> usize {
        self.membership.len()
    }

    /// Returns whether the ledger holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.membership.is_empty()
    }

    /// Persists the full grouped structure back to `key` as pretty-printed
    /// JSON, fenced on the version observed at load time.
    ///
    /// # Errors
    ///
    /// Fatal on serialization or storage failure, and on a failed
    /// precondition. The latter means another run saved the ledger since
    /// this one loaded it, and continuing would lose its entries.
    pub async fn save(&mut self, storage: &dyn StorageBackend, key: &str) -> Result<()> {
        let body = serde_json::to_vec_pretty(&self.entries)
            .map_err(|e| Error::serialization(format!("ledger document '{key}': {e}")))?;

        let precondition = match &self.version {
            Some(token) => WritePrecondition::MatchesVersion(token.clone()),
            None => WritePrecondition::DoesNotExist,
        };

        match storage.put(key, Bytes::from(body), precondition).await? {
            WriteResult::Success { version } => {
                tracing::info!(key, entries = self.len(), "persisted processing ledger");
                self.version = Some(version);
                Ok(())
            }
            WriteResult::PreconditionFailed { current_version } => {
                Err(Error::PreconditionFailed {
                    message: format!(
                        "ledger '{key}' was modified by a concurrent run (current version '{current_version}')"
                    ),
                })
            }
        }
    }
}
