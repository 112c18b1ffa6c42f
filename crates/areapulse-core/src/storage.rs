//! Storage backend abstraction for object storage (S3, GCS, memory).
//!
//! The pipeline treats object storage as its only durable medium: raw
//! snapshots are read from it, encoded tables are written to it, and the
//! processing ledger lives in it. The contract here is deliberately small:
//!
//! - Whole-object reads and writes (no ranged access)
//! - Conditional writes with preconditions, used to fence the ledger document
//!   against overlapping runs
//! - Prefix listing with object metadata
//!
//! The version token is an opaque `String` so that different backends can
//! supply their native notion of object version (S3 `ETag`, GCS generation).

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use object_store::path::Path as StorePath;
use object_store::{ObjectStore, PutMode, PutOptions, PutPayload, UpdateVersion};

use crate::error::{Error, Result};

/// Precondition for conditional writes (CAS operations).
#[derive(Debug, Clone)]
pub enum WritePrecondition {
    /// Write only if the object does not exist.
    DoesNotExist,
    /// Write only if the object's version matches the given token.
    MatchesVersion(String),
    /// Write unconditionally.
    None,
}

/// Result of a conditional write.
#[derive(Debug, Clone)]
pub enum WriteResult {
    /// Write succeeded, returns the new version token.
    Success {
        /// The new version token after the write.
        version: String,
    },
    /// Precondition failed, returns the current version token.
    PreconditionFailed {
        /// The version that caused the precondition to fail, if known.
        current_version: String,
    },
}

/// Metadata about a stored object.
#[derive(Debug, Clone)]
pub struct ObjectMeta {
    /// Object path (key).
    pub path: String,
    /// Object size in bytes.
    pub size: u64,
    /// Object version token for CAS operations.
    pub version: String,
    /// Last modification timestamp.
    pub last_modified: Option<DateTime<Utc>>,
}

/// Storage backend trait for object storage.
///
/// All backends (S3, GCS, memory) implement this trait. Listing results are
/// returned in key order; backends that do not guarantee ordering sort before
/// returning.
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Reads an entire object.
    ///
    /// Returns [`Error::NotFound`] if the object doesn't exist.
    async fn get(&self, path: &str) -> Result<Bytes>;

    /// Writes with an optional precondition.
    ///
    /// Returns [`WriteResult::PreconditionFailed`] if the precondition was not
    /// met. Precondition failure is a normal result, never an error.
    async fn put(
        &self,
        path: &str,
        data: Bytes,
        precondition: WritePrecondition,
    ) -> Result<WriteResult>;

    /// Deletes an object. Succeeds even if the object doesn't exist.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Lists objects whose key starts with `prefix`, in key order.
    ///
    /// The prefix is a plain string prefix, not a directory: `raw/0930_`
    /// matches `raw/0930_1.json` but not `raw/0931_1.json`.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>>;

    /// Gets object metadata without reading content.
    ///
    /// Returns `None` if the object doesn't exist.
    async fn head(&self, path: &str) -> Result<Option<ObjectMeta>>;
}

// ============================================================================
// In-memory backend
// ============================================================================

/// In-memory storage backend for testing.
///
/// Thread-safe via `RwLock`; keys are held in a `BTreeMap` so listings come
/// back in key order, mirroring S3 semantics. Versions are numeric, stored as
/// strings.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    objects: Arc<RwLock<BTreeMap<String, StoredObject>>>,
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    version: i64,
    last_modified: DateTime<Utc>,
}

impl MemoryBackend {
    /// Creates a new empty memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self, path: &str) -> Result<Bytes> {
        let objects = self.objects.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;

        objects
            .get(path)
            .map(|o| o.data.clone())
            .ok_or_else(|| Error::NotFound(format!("object not found: {path}")))
    }

    async fn put(
        &self,
        path: &str,
        data: Bytes,
        precondition: WritePrecondition,
    ) -> Result<WriteResult> {
        let mut objects = self.objects.write().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;

        let current = objects.get(path);

        match precondition {
            WritePrecondition::DoesNotExist => {
                if let Some(obj) = current {
                    return Ok(WriteResult::PreconditionFailed {
                        current_version: obj.version.to_string(),
                    });
                }
            }
            WritePrecondition::MatchesVersion(expected) => {
                let expected_num: i64 = expected.parse().unwrap_or(-1);
                match current {
                    Some(obj) if obj.version != expected_num => {
                        return Ok(WriteResult::PreconditionFailed {
                            current_version: obj.version.to_string(),
                        });
                    }
                    None => {
                        return Ok(WriteResult::PreconditionFailed {
                            current_version: "0".to_string(),
                        });
                    }
                    _ => {}
                }
            }
            WritePrecondition::None => {}
        }

        let new_version = current.map_or(1, |o| o.version + 1);
        objects.insert(
            path.to_string(),
            StoredObject {
                data,
                version: new_version,
                last_modified: Utc::now(),
            },
        );
        drop(objects);

        Ok(WriteResult::Success {
            version: new_version.to_string(),
        })
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.objects
            .write()
            .map_err(|_| Error::Internal {
                message: "lock poisoned".into(),
            })?
            .remove(path);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>> {
        let objects = self.objects.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;

        Ok(objects
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(path, obj)| ObjectMeta {
                path: path.clone(),
                size: obj.data.len() as u64,
                version: obj.version.to_string(),
                last_modified: Some(obj.last_modified),
            })
            .collect())
    }

    async fn head(&self, path: &str) -> Result<Option<ObjectMeta>> {
        let objects = self.objects.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;

        Ok(objects.get(path).map(|obj| ObjectMeta {
            path: path.to_string(),
            size: obj.data.len() as u64,
            version: obj.version.to_string(),
            last_modified: Some(obj.last_modified),
        }))
    }
}

// ============================================================================
// object_store backend
// ============================================================================

/// Storage backend over the `object_store` crate (S3 or GCS).
///
/// Construct with [`ObjectStoreBackend::from_bucket`], which accepts
/// `my-bucket`, `s3://my-bucket`, or `gs://my-bucket`. Credentials come from
/// the environment, as the transport layer is out of scope here.
pub struct ObjectStoreBackend {
    store: Arc<dyn ObjectStore>,
}

impl std::fmt::Debug for ObjectStoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreBackend").finish_non_exhaustive()
    }
}

impl ObjectStoreBackend {
    /// Creates a backend for the given bucket.
    ///
    /// A bare bucket name defaults to S3.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the bucket string is empty or the client
    /// cannot be constructed from the environment.
    pub fn from_bucket(bucket: &str) -> Result<Self> {
        let (scheme, name) = match bucket.split_once("://") {
            Some((scheme, name)) => (scheme, name),
            None => ("s3", bucket),
        };
        if name.is_empty() {
            return Err(Error::config("storage bucket name is empty"));
        }

        let store: Arc<dyn ObjectStore> = match scheme {
            "s3" => Arc::new(
                object_store::aws::AmazonS3Builder::from_env()
                    .with_bucket_name(name)
                    .build()
                    .map_err(|e| Error::config(format!("s3 client for '{name}': {e}")))?,
            ),
            "gs" => Arc::new(
                object_store::gcp::GoogleCloudStorageBuilder::from_env()
                    .with_bucket_name(name)
                    .build()
                    .map_err(|e| Error::config(format!("gcs client for '{name}': {e}")))?,
            ),
            other => {
                return Err(Error::config(format!(
                    "unsupported storage scheme '{other}' in '{bucket}'"
                )));
            }
        };

        Ok(Self { store })
    }

    /// Wraps an existing `object_store` instance.
    #[must_use]
    pub fn from_store(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    fn convert_error(path: &str, err: object_store::Error) -> Error {
        match err {
            object_store::Error::NotFound { .. } => {
                Error::NotFound(format!("object not found: {path}"))
            }
            other => Error::storage_with_source(format!("operation on '{path}' failed"), other),
        }
    }
}

fn version_token(e_tag: Option<String>, version: Option<String>) -> String {
    e_tag.or(version).unwrap_or_default()
}

#[async_trait]
impl StorageBackend for ObjectStoreBackend {
    async fn get(&self, path: &str) -> Result<Bytes> {
        let location = StorePath::from(path);
        let result = self
            .store
            .get(&location)
            .await
            .map_err(|e| Self::convert_error(path, e))?;
        result
            .bytes()
            .await
            .map_err(|e| Self::convert_error(path, e))
    }

    async fn put(
        &self,
        path: &str,
        data: Bytes,
        precondition: WritePrecondition,
    ) -> Result<WriteResult> {
        let location = StorePath::from(path);
        let mode = match precondition {
            WritePrecondition::DoesNotExist => PutMode::Create,
            WritePrecondition::MatchesVersion(token) => PutMode::Update(UpdateVersion {
                e_tag: Some(token),
                version: None,
            }),
            WritePrecondition::None => PutMode::Overwrite,
        };

        match self
            .store
            .put_opts(&location, PutPayload::from(data), PutOptions::from(mode))
            .await
        {
            Ok(result) => Ok(WriteResult::Success {
                version: version_token(result.e_tag, result.version),
            }),
            Err(
                object_store::Error::AlreadyExists { .. } | object_store::Error::Precondition { .. },
            ) => {
                // Report the winner's version when it can still be observed.
                let current_version = match self.store.head(&location).await {
                    Ok(meta) => version_token(meta.e_tag, meta.version),
                    Err(_) => String::new(),
                };
                Ok(WriteResult::PreconditionFailed { current_version })
            }
            Err(e) => Err(Self::convert_error(path, e)),
        }
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let location = StorePath::from(path);
        match self.store.delete(&location).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(Self::convert_error(path, e)),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>> {
        // `object_store` listings are directory-oriented; our contract is a
        // plain string prefix (minute prefixes end mid-filename, e.g.
        // `raw/20250708/0930_`). List the parent directory and filter.
        let dir = prefix.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
        let location = StorePath::from(dir);

        let metas: Vec<object_store::ObjectMeta> = self
            .store
            .list(Some(&location))
            .try_collect()
            .await
            .map_err(|e| Self::convert_error(prefix, e))?;

        let mut out: Vec<ObjectMeta> = metas
            .into_iter()
            .filter(|m| m.location.as_ref().starts_with(prefix))
            .map(|m| ObjectMeta {
                path: m.location.to_string(),
                size: m.size as u64,
                version: version_token(m.e_tag, m.version),
                last_modified: Some(m.last_modified),
            })
            .collect();
        out.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(out)
    }

    async fn head(&self, path: &str) -> Result<Option<ObjectMeta>> {
        let location = StorePath::from(path);
        match self.store.head(&location).await {
            Ok(meta) => Ok(Some(ObjectMeta {
                path: path.to_string(),
                size: meta.size as u64,
                version: version_token(meta.e_tag, meta.version),
                last_modified: Some(meta.last_modified),
            })),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(Self::convert_error(path, e)),
        }
    }
}
