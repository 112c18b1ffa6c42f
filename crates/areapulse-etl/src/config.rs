//! Pipeline configuration from the environment.
//!
//! Every value is required; a missing variable is a startup-time fatal
//! condition, surfaced as a configuration error before any storage access
//! happens. This is deliberate: a half-configured run that silently writes
//! to the wrong prefix is far worse than one that refuses to start.

use areapulse_core::{Error, PipelinePaths, Result};

/// Object storage bucket name (`my-bucket`, `s3://my-bucket`, `gs://my-bucket`).
pub const ENV_STORAGE_BUCKET: &str = "AREAPULSE_STORAGE_BUCKET";
/// Prefix of raw snapshot files.
pub const ENV_RAW_PREFIX: &str = "AREAPULSE_RAW_PREFIX";
/// Output prefix of the encoded area table.
pub const ENV_AREA_TABLE_PREFIX: &str = "AREAPULSE_AREA_TABLE_PREFIX";
/// Output prefix of the encoded category table.
pub const ENV_CATEGORY_TABLE_PREFIX: &str = "AREAPULSE_CATEGORY_TABLE_PREFIX";
/// Prefix of the processing ledger document.
pub const ENV_HISTORY_PREFIX: &str = "AREAPULSE_HISTORY_PREFIX";
/// IAM role the warehouse assumes for COPY.
pub const ENV_WAREHOUSE_IAM_ROLE: &str = "AREAPULSE_WAREHOUSE_IAM_ROLE";
/// Location of the downstream transformation project.
pub const ENV_TRANSFORM_PROJECT_DIR: &str = "AREAPULSE_TRANSFORM_PROJECT_DIR";

/// Validated pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Object storage bucket.
    pub storage_bucket: String,
    /// Prefix of raw snapshot files.
    pub raw_prefix: String,
    /// Output prefix of the encoded area table.
    pub area_table_prefix: String,
    /// Output prefix of the encoded category table.
    pub category_table_prefix: String,
    /// Prefix of the processing ledger document.
    pub history_prefix: String,
    /// IAM role the warehouse assumes for COPY.
    pub warehouse_iam_role: String,
    /// Location of the downstream transformation project. The pipeline does
    /// not run the transformation itself; the value is validated here and
    /// handed to the external scheduler.
    pub transform_project_dir: String,
}

impl PipelineConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first missing variable.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through an arbitrary lookup, for tests.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first missing or empty variable.
    pub fn from_lookup(mut lookup: impl FnMut(&str) -> Option<String>) -> Result<Self> {
        let mut require = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::config(format!("{key} is not set")))
        };

        Ok(Self {
            storage_bucket: require(ENV_STORAGE_BUCKET)?,
            raw_prefix: require(ENV_RAW_PREFIX)?,
            area_table_prefix: require(ENV_AREA_TABLE_PREFIX)?,
            category_table_prefix: require(ENV_CATEGORY_TABLE_PREFIX)?,
            history_prefix: require(ENV_HISTORY_PREFIX)?,
            warehouse_iam_role: require(ENV_WAREHOUSE_IAM_ROLE)?,
            transform_project_dir: require(ENV_TRANSFORM_PROJECT_DIR)?,
        })
    }

    /// Canonical path generator for this configuration.
    #[must_use]
    pub fn paths(&self) -> PipelinePaths {
        PipelinePaths::new(
            &self.raw_prefix,
            &self.area_table_prefix,
            &self.category_table_prefix,
            &self.history_prefix,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            (ENV_STORAGE_BUCKET, "commerce-data"),
            (ENV_RAW_PREFIX, "raw_json_data"),
            (ENV_AREA_TABLE_PREFIX, "pq/commercial"),
            (ENV_CATEGORY_TABLE_PREFIX, "pq/commercial_rsb"),
            (ENV_HISTORY_PREFIX, "history"),
            (ENV_WAREHOUSE_IAM_ROLE, "arn:aws:iam::123:role/load"),
            (ENV_TRANSFORM_PROJECT_DIR, "/opt/transform"),
        ])
    }

    #[test]
    fn full_environment_validates() {
        let env = full_env();
        let config = PipelineConfig::from_lookup(|k| env.get(k).map(|v| (*v).to_string()))
            .expect("config should validate");
        assert_eq!(config.storage_bucket, "commerce-data");
        assert_eq!(config.paths().ledger_key(), "history/commercial.json");
    }

    #[test]
    fn each_missing_variable_is_fatal() {
        for missing in [
            ENV_STORAGE_BUCKET,
            ENV_RAW_PREFIX,
            ENV_AREA_TABLE_PREFIX,
            ENV_CATEGORY_TABLE_PREFIX,
            ENV_HISTORY_PREFIX,
            ENV_WAREHOUSE_IAM_ROLE,
            ENV_TRANSFORM_PROJECT_DIR,
        ] {
            let env = full_env();
            let err = PipelineConfig::from_lookup(|k| {
                if k == missing {
                    None
                } else {
                    env.get(k).map(|v| (*v).to_string())
                }
            })
            .unwrap_err();
            assert!(
                matches!(err, Error::Config { .. }),
                "expected config error for {missing}"
            );
            assert!(err.to_string().contains(missing));
        }
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let mut env = full_env();
        env.insert(ENV_HISTORY_PREFIX, "");
        let err = PipelineConfig::from_lookup(|k| env.get(k).map(|v| (*v).to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
