//! End-to-end runs over in-memory collaborators.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::json;

use areapulse_core::{MemoryBackend, StorageBackend, WritePrecondition};
use areapulse_etl::config::{self, PipelineConfig};
use areapulse_etl::warehouse::RecordingLoader;
use areapulse_etl::{Pipeline, RunSummary};

fn test_config() -> PipelineConfig {
    PipelineConfig::from_lookup(|key| {
        let value = match key {
            config::ENV_STORAGE_BUCKET => "commerce-data",
            config::ENV_RAW_PREFIX => "raw_json_data",
            config::ENV_AREA_TABLE_PREFIX => "pq/commercial",
            config::ENV_CATEGORY_TABLE_PREFIX => "pq/commercial_rsb",
            config::ENV_HISTORY_PREFIX => "history",
            config::ENV_WAREHOUSE_IAM_ROLE => "arn:aws:iam::123:role/load",
            config::ENV_TRANSFORM_PROJECT_DIR => "/opt/transform",
            _ => return None,
        };
        Some(value.to_string())
    })
    .expect("test config")
}

/// 09:35 Asia/Seoul, so the window covers 09:30 through 09:34.
fn trigger() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-07-08T00:35:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn snapshot(area_code: &str, observed: &str, categories: usize) -> serde_json::Value {
    let category = json!({
        "RSB_LRG_CTGR": "음식점",
        "RSB_MID_CTGR": "한식",
        "RSB_PAYMENT_LVL": "바쁨",
        "RSB_SH_PAYMENT_CNT": "120",
        "RSB_SH_PAYMENT_AMT_MIN": 10000,
        "RSB_SH_PAYMENT_AMT_MAX": 50000,
        "RSB_MCT_CNT": "35",
        "RSB_MCT_TIME": "202506"
    });
    json!({
        "AREA_CD": area_code,
        "AREA_NM": "강남역",
        "LIVE_CMRCL_STTS": {
            "CMRCL_TIME": observed,
            "AREA_CMRCL_LVL": "보통",
            "AREA_SH_PAYMENT_CNT": "340",
            "AREA_SH_PAYMENT_AMT_MIN": "1200",
            "AREA_SH_PAYMENT_AMT_MAX": "98000",
            "CMRCL_MALE_RATE": "47.3",
            "CMRCL_FEMALE_RATE": "52.7",
            "CMRCL_10_RATE": "3.2",
            "CMRCL_20_RATE": "28.9",
            "CMRCL_30_RATE": "31.4",
            "CMRCL_40_RATE": "19.1",
            "CMRCL_50_RATE": "11.7",
            "CMRCL_60_RATE": "5.7",
            "CMRCL_PERSONAL_RATE": "88.4",
            "CMRCL_CORPORATION_RATE": "11.6",
            "CMRCL_RSB": (0..categories).map(|_| category.clone()).collect::<Vec<_>>()
        }
    })
}

async fn seed(storage: &MemoryBackend, key: &str, body: &serde_json::Value) {
    storage
        .put(
            key,
            Bytes::from(serde_json::to_vec(body).unwrap()),
            WritePrecondition::None,
        )
        .await
        .unwrap();
}

fn read_rows(bytes: &Bytes) -> usize {
    let reader = ParquetRecordBatchReaderBuilder::try_new(bytes.clone())
        .expect("reader init")
        .build()
        .expect("reader build");
    reader.map(|b| b.expect("batch").num_rows()).sum()
}

struct Harness {
    storage: Arc<MemoryBackend>,
    warehouse: Arc<RecordingLoader>,
    pipeline: Pipeline,
}

fn harness() -> Harness {
    let storage = Arc::new(MemoryBackend::new());
    let warehouse = Arc::new(RecordingLoader::new());
    let pipeline = Pipeline::new(storage.clone(), warehouse.clone(), test_config());
    Harness {
        storage,
        warehouse,
        pipeline,
    }
}

async fn run(h: &Harness) -> RunSummary {
    h.pipeline.run(trigger()).await.expect("run")
}

#[tokio::test]
async fn full_run_uploads_tables_persists_ledger_and_requests_loads() {
    let h = harness();
    seed(
        &h.storage,
        "raw_json_data/20250708/0930_1.json",
        &snapshot("POI001", "20250708 0925", 2),
    )
    .await;
    seed(
        &h.storage,
        "raw_json_data/20250708/0931_2.json",
        &snapshot("POI002", "20250708 0926", 2),
    )
    .await;

    let summary = run(&h).await;
    assert_eq!(summary.area_rows, 2);
    assert_eq!(summary.category_rows, 4);
    assert_eq!(summary.stats.extracted, 2);
    assert_eq!(summary.new_ledger_entries, 2);

    let area_key = summary.area_table_path.as_deref().expect("area blob");
    let category_key = summary.category_table_path.as_deref().expect("category blob");
    assert!(area_key.starts_with("pq/commercial/"));
    assert!(area_key.ends_with(".parquet"));
    assert!(category_key.starts_with("pq/commercial_rsb/"));

    let area_blob = h.storage.get(area_key).await.expect("area blob stored");
    assert_eq!(read_rows(&area_blob), 2);
    let category_blob = h.storage.get(category_key).await.expect("category blob stored");
    assert_eq!(read_rows(&category_blob), 4);

    let ledger_body = h
        .storage
        .get("history/commercial.json")
        .await
        .expect("ledger persisted");
    let doc: serde_json::Value = serde_json::from_slice(&ledger_body).unwrap();
    assert_eq!(doc["1"][0]["observed_at"], json!("2025-07-08 09:25:00"));
    assert_eq!(doc["2"][0]["observed_at"], json!("2025-07-08 09:26:00"));

    let requests = h.warehouse.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].table, "source.source_commercial");
    assert_eq!(
        requests[0].source_url,
        format!("s3://commerce-data/{area_key}")
    );
    assert_eq!(requests[1].table, "source.source_commercial_rsb");
    assert_eq!(requests[1].iam_role, "arn:aws:iam::123:role/load");
}

#[tokio::test]
async fn rerun_of_same_window_emits_nothing_new() {
    let h = harness();
    seed(
        &h.storage,
        "raw_json_data/20250708/0930_1.json",
        &snapshot("POI001", "20250708 0925", 1),
    )
    .await;

    let first = run(&h).await;
    assert_eq!(first.area_rows, 1);

    let second = run(&h).await;
    assert_eq!(second.area_rows, 0);
    assert_eq!(second.category_rows, 0);
    assert_eq!(second.stats.duplicates, 1);
    assert_eq!(second.new_ledger_entries, 0);
    assert!(second.area_table_path.is_none());
    assert!(second.category_table_path.is_none());

    // Only the first run requested warehouse loads.
    assert_eq!(h.warehouse.requests().len(), 2);
}

#[tokio::test]
async fn absent_minutes_are_skipped_not_fatal() {
    let h = harness();
    // One real file; the other window minutes simply have no objects.
    seed(
        &h.storage,
        "raw_json_data/20250708/0933_7.json",
        &snapshot("POI007", "20250708 0928", 0),
    )
    .await;

    let summary = run(&h).await;
    assert_eq!(summary.area_rows, 1);
    assert_eq!(summary.category_rows, 0);
    assert!(summary.area_table_path.is_some());
    assert!(summary.category_table_path.is_none());
    assert_eq!(h.warehouse.requests().len(), 1);
}

#[tokio::test]
async fn empty_window_persists_ledger_and_requests_no_loads() {
    let h = harness();

    let summary = run(&h).await;
    assert_eq!(summary.area_rows, 0);
    assert_eq!(summary.new_ledger_entries, 0);
    assert!(summary.area_table_path.is_none());
    assert!(h.warehouse.requests().is_empty());

    // The ledger document exists even when the run produced nothing.
    let body = h
        .storage
        .get("history/commercial.json")
        .await
        .expect("ledger persisted");
    assert_eq!(serde_json::from_slice::<serde_json::Value>(&body).unwrap(), json!({}));
}
