//! Pipeline binary.
//!
//! One invocation is one run. The trigger instant defaults to now and can be
//! pinned for backfills with `--trigger`.

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};

use areapulse_core::ObjectStoreBackend;
use areapulse_core::observability::{LogFormat, init_logging};
use areapulse_etl::warehouse::StatementLogger;
use areapulse_etl::{Pipeline, PipelineConfig};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum LogFormatArg {
    Json,
    #[default]
    Pretty,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Json => LogFormat::Json,
            LogFormatArg::Pretty => LogFormat::Pretty,
        }
    }
}

/// Windowed extraction of commercial activity snapshots into warehouse tables.
#[derive(Debug, Parser)]
#[command(name = "areapulse", version, about)]
struct Args {
    /// Trigger instant (RFC 3339, e.g. 2025-07-08T00:35:00Z). Defaults to now.
    #[arg(long)]
    trigger: Option<String>,

    /// Log output format.
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormatArg,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.log_format.into());

    let trigger: DateTime<Utc> = match &args.trigger {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .with_context(|| format!("invalid --trigger instant '{raw}'"))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let config = PipelineConfig::from_env().context("loading configuration")?;
    let storage =
        ObjectStoreBackend::from_bucket(&config.storage_bucket).context("opening object store")?;

    let pipeline = Pipeline::new(Arc::new(storage), Arc::new(StatementLogger), config);
    let summary = pipeline.run(trigger).await.context("pipeline run failed")?;

    tracing::info!(
        area_rows = summary.area_rows,
        category_rows = summary.category_rows,
        extracted = summary.stats.extracted,
        missing = summary.stats.missing,
        unparseable = summary.stats.unparseable,
        duplicates = summary.stats.duplicates,
        new_ledger_entries = summary.new_ledger_entries,
        "pipeline finished"
    );
    Ok(())
}
