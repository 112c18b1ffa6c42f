//! Parquet encoding of the extracted record sets.
//!
//! This module defines the canonical schemas for the two output tables. The
//! schemas are the contract for the warehouse COPY step: column names and
//! order here must match the positional column lists in [`crate::warehouse`]
//! exactly.
//!
//! All columns are nullable. Ratio columns are `Decimal128(5, 2)` but carry
//! one decimal digit of real precision: values are rounded to 1 decimal
//! place before scaling. Timestamps are second-precision without a zone
//! annotation; they are civil Asia/Seoul values by convention.

use std::io::Cursor;
use std::sync::Arc;

use arrow::array::{Decimal128Array, Int32Array, StringArray, TimestampSecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use chrono::NaiveDateTime;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use areapulse_core::{Error, Result};

use crate::records::{AreaObservation, CategoryObservation};

/// Declared precision of ratio columns.
pub const RATIO_PRECISION: u8 = 5;

/// Declared scale of ratio columns. Real precision is one decimal digit;
/// values are rounded before scaling.
pub const RATIO_SCALE: i8 = 2;

fn decimal_type() -> DataType {
    DataType::Decimal128(RATIO_PRECISION, RATIO_SCALE)
}

fn timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Second, None)
}

fn area_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("source_id", DataType::Utf8, true),
        Field::new("area_code", DataType::Utf8, true),
        Field::new("area_name", DataType::Utf8, true),
        Field::new("congestion_level", DataType::Utf8, true),
        Field::new("total_payment_count", DataType::Int32, true),
        Field::new("payment_amount_min", DataType::Int32, true),
        Field::new("payment_amount_max", DataType::Int32, true),
        Field::new("male_ratio", decimal_type(), true),
        Field::new("female_ratio", decimal_type(), true),
        Field::new("age_10s_ratio", decimal_type(), true),
        Field::new("age_20s_ratio", decimal_type(), true),
        Field::new("age_30s_ratio", decimal_type(), true),
        Field::new("age_40s_ratio", decimal_type(), true),
        Field::new("age_50s_ratio", decimal_type(), true),
        Field::new("age_60s_ratio", decimal_type(), true),
        Field::new("individual_consumer_ratio", decimal_type(), true),
        Field::new("corporate_consumer_ratio", decimal_type(), true),
        Field::new("observed_at", timestamp_type(), true),
        Field::new("created_at", timestamp_type(), true),
    ]))
}

fn category_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("source_id", DataType::Utf8, true),
        Field::new("category_large", DataType::Utf8, true),
        Field::new("category_medium", DataType::Utf8, true),
        Field::new("category_congestion_level", DataType::Utf8, true),
        Field::new("category_payment_count", DataType::Int32, true),
        Field::new("category_payment_min", DataType::Int32, true),
        Field::new("category_payment_max", DataType::Int32, true),
        Field::new("merchant_count", DataType::Int32, true),
        Field::new("merchant_basis_month", DataType::Utf8, true),
        Field::new("observed_at", timestamp_type(), true),
        Field::new("created_at", timestamp_type(), true),
    ]))
}

/// Returns the area table schema.
#[must_use]
pub fn area_table_schema() -> Schema {
    (*area_schema()).clone()
}

/// Returns the category table schema.
#[must_use]
pub fn category_table_schema() -> Schema {
    (*category_schema()).clone()
}

/// Rounds a ratio to 1 decimal place and scales it into the declared
/// two-digit storage scale. Non-finite values and values whose scaled
/// magnitude exceeds the declared precision become null cells; feeds have
/// shipped garbage ratios before, and one bad cell must not poison a blob.
fn decimal_cell(value: Option<f64>) -> Option<i128> {
    let v = value?;
    if !v.is_finite() {
        return None;
    }
    let tenths = (v * 10.0).round();
    // |tenths * 10| must stay below 10^RATIO_PRECISION.
    if tenths.abs() >= 1e4 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    Some(tenths as i128 * 10)
}

fn timestamp_cell(ts: NaiveDateTime) -> i64 {
    ts.and_utc().timestamp()
}

fn decimal_array(cells: Vec<Option<i128>>) -> Result<Decimal128Array> {
    Decimal128Array::from(cells)
        .with_precision_and_scale(RATIO_PRECISION, RATIO_SCALE)
        .map_err(|e| Error::serialization(format!("decimal column build failed: {e}")))
}

fn writer_properties() -> WriterProperties {
    WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .set_created_by("areapulse-etl".to_string())
        .build()
}

fn write_single_batch(schema: Arc<Schema>, batch: &RecordBatch) -> Result<Bytes> {
    let mut cursor = Cursor::new(Vec::<u8>::new());
    let mut writer = ArrowWriter::try_new(&mut cursor, schema, Some(writer_properties()))
        .map_err(|e| Error::serialization(format!("parquet writer init failed: {e}")))?;
    writer
        .write(batch)
        .map_err(|e| Error::serialization(format!("parquet write failed: {e}")))?;
    writer
        .close()
        .map_err(|e| Error::serialization(format!("parquet close failed: {e}")))?;
    Ok(Bytes::from(cursor.into_inner()))
}

/// Encodes area observations into a snappy-compressed Parquet blob.
///
/// # Errors
///
/// Returns an error if the record batch cannot be built or the Parquet
/// write fails.
pub fn write_area_observations(rows: &[AreaObservation]) -> Result<Bytes> {
    let schema = area_schema();

    let ratio_column = |pick: fn(&AreaObservation) -> Option<f64>| {
        decimal_array(rows.iter().map(|r| decimal_cell(pick(r))).collect())
    };

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(
                rows.iter().map(|r| Some(r.source_id.as_str())).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                rows.iter().map(|r| Some(r.area_code.as_str())).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                rows.iter().map(|r| Some(r.area_name.as_str())).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                rows.iter()
                    .map(|r| Some(r.congestion_level.as_str()))
                    .collect::<Vec<_>>(),
            )),
            Arc::new(Int32Array::from(
                rows.iter().map(|r| r.total_payment_count).collect::<Vec<_>>(),
            )),
            Arc::new(Int32Array::from(
                rows.iter().map(|r| r.payment_amount_min).collect::<Vec<_>>(),
            )),
            Arc::new(Int32Array::from(
                rows.iter().map(|r| r.payment_amount_max).collect::<Vec<_>>(),
            )),
            Arc::new(ratio_column(|r| r.male_ratio)?),
            Arc::new(ratio_column(|r| r.female_ratio)?),
            Arc::new(ratio_column(|r| r.age_10s_ratio)?),
            Arc::new(ratio_column(|r| r.age_20s_ratio)?),
            Arc::new(ratio_column(|r| r.age_30s_ratio)?),
            Arc::new(ratio_column(|r| r.age_40s_ratio)?),
            Arc::new(ratio_column(|r| r.age_50s_ratio)?),
            Arc::new(ratio_column(|r| r.age_60s_ratio)?),
            Arc::new(ratio_column(|r| r.individual_consumer_ratio)?),
            Arc::new(ratio_column(|r| r.corporate_consumer_ratio)?),
            Arc::new(TimestampSecondArray::from(
                rows.iter()
                    .map(|r| Some(timestamp_cell(r.observed_at)))
                    .collect::<Vec<_>>(),
            )),
            Arc::new(TimestampSecondArray::from(
                rows.iter()
                    .map(|r| Some(timestamp_cell(r.created_at)))
                    .collect::<Vec<_>>(),
            )),
        ],
    )
    .map_err(|e| Error::serialization(format!("record batch build failed: {e}")))?;

    write_single_batch(schema, &batch)
}

/// Encodes category observations into a snappy-compressed Parquet blob.
///
/// # Errors
///
/// Returns an error if the record batch cannot be built or the Parquet
/// write fails.
pub fn write_category_observations(rows: &[CategoryObservation]) -> Result<Bytes> {
    let schema = category_schema();

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(
                rows.iter().map(|r| Some(r.source_id.as_str())).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                rows.iter()
                    .map(|r| Some(r.category_large.as_str()))
                    .collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                rows.iter()
                    .map(|r| Some(r.category_medium.as_str()))
                    .collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                rows.iter()
                    .map(|r| Some(r.category_congestion_level.as_str()))
                    .collect::<Vec<_>>(),
            )),
            Arc::new(Int32Array::from(
                rows.iter().map(|r| r.category_payment_count).collect::<Vec<_>>(),
            )),
            Arc::new(Int32Array::from(
                rows.iter().map(|r| r.category_payment_min).collect::<Vec<_>>(),
            )),
            Arc::new(Int32Array::from(
                rows.iter().map(|r| r.category_payment_max).collect::<Vec<_>>(),
            )),
            Arc::new(Int32Array::from(
                rows.iter().map(|r| r.merchant_count).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                rows.iter()
                    .map(|r| Some(r.merchant_basis_month.as_str()))
                    .collect::<Vec<_>>(),
            )),
            Arc::new(TimestampSecondArray::from(
                rows.iter()
                    .map(|r| Some(timestamp_cell(r.observed_at)))
                    .collect::<Vec<_>>(),
            )),
            Arc::new(TimestampSecondArray::from(
                rows.iter()
                    .map(|r| Some(timestamp_cell(r.created_at)))
                    .collect::<Vec<_>>(),
            )),
        ],
    )
    .map_err(|e| Error::serialization(format!("record batch build failed: {e}")))?;

    write_single_batch(schema, &batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;
    use chrono::NaiveDate;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    fn ts(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 7, 8)
            .unwrap()
            .and_hms_opt(9, minute, 0)
            .unwrap()
    }

    fn area_row() -> AreaObservation {
        AreaObservation {
            source_id: "a".repeat(32),
            area_code: "POI001".into(),
            area_name: "강남역".into(),
            congestion_level: "보통".into(),
            total_payment_count: Some(340),
            payment_amount_min: Some(1200),
            payment_amount_max: None,
            male_ratio: Some(47.36),
            female_ratio: Some(52.64),
            age_10s_ratio: None,
            age_20s_ratio: Some(28.9),
            age_30s_ratio: Some(31.4),
            age_40s_ratio: Some(19.1),
            age_50s_ratio: Some(11.7),
            age_60s_ratio: Some(5.7),
            individual_consumer_ratio: Some(88.4),
            corporate_consumer_ratio: Some(f64::NAN),
            observed_at: ts(25),
            created_at: ts(35),
        }
    }

    fn read_single_batch(bytes: &Bytes) -> RecordBatch {
        let mut reader = ParquetRecordBatchReaderBuilder::try_new(bytes.clone())
            .expect("reader init")
            .build()
            .expect("reader build");
        reader.next().expect("one batch").expect("read batch")
    }

    #[test]
    fn schema_column_order_matches_warehouse_contract() {
        let names: Vec<_> = area_table_schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        assert_eq!(names[0], "source_id");
        assert_eq!(names[7], "male_ratio");
        assert_eq!(names[17], "observed_at");
        assert_eq!(names.len(), 19);

        let names: Vec<_> = category_table_schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        assert_eq!(names.len(), 11);
        assert_eq!(names[8], "merchant_basis_month");
    }

    #[test]
    fn ratios_round_to_one_decimal_at_two_digit_scale() {
        assert_eq!(decimal_cell(Some(47.36)), Some(4740)); // 47.4 at scale 2
        assert_eq!(decimal_cell(Some(5.0)), Some(500));
        assert_eq!(decimal_cell(None), None);
        assert_eq!(decimal_cell(Some(f64::NAN)), None);
        assert_eq!(decimal_cell(Some(f64::INFINITY)), None);
    }

    #[test]
    fn ratios_beyond_declared_precision_become_null_cells() {
        assert_eq!(decimal_cell(Some(1e300)), None);
        assert_eq!(decimal_cell(Some(-1e300)), None);
        assert_eq!(decimal_cell(Some(12345.6)), None);
        // Largest representable value at precision 5, scale 2, 1-decimal real
        // precision is 999.9; 999.99 rounds up past the bound.
        assert_eq!(decimal_cell(Some(999.9)), Some(99990));
        assert_eq!(decimal_cell(Some(-999.9)), Some(-99990));
        assert_eq!(decimal_cell(Some(999.99)), None);
    }

    #[test]
    fn huge_ratio_encodes_as_null_not_panic() {
        let mut row = area_row();
        row.male_ratio = Some(1e300);
        row.female_ratio = Some(12345.6);
        let bytes = write_area_observations(&[row]).expect("encode");
        let batch = read_single_batch(&bytes);

        assert!(batch.column(7).is_null(0));
        assert!(batch.column(8).is_null(0));
    }

    #[test]
    fn area_blob_roundtrips_schema_and_null_cells() {
        let bytes = write_area_observations(&[area_row()]).expect("encode");
        let batch = read_single_batch(&bytes);

        assert_eq!(batch.num_rows(), 1);
        assert_eq!(batch.schema().fields(), area_table_schema().fields());

        // payment_amount_max and the NaN ratio must be null cells.
        assert!(batch.column(6).is_null(0));
        assert!(batch.column(16).is_null(0));
        // Rounded ratio survives.
        let male = batch
            .column(7)
            .as_any()
            .downcast_ref::<Decimal128Array>()
            .expect("decimal column");
        assert_eq!(male.value(0), 4740);
    }

    #[test]
    fn category_blob_roundtrips() {
        let row = CategoryObservation {
            source_id: "b".repeat(32),
            category_large: "음식점".into(),
            category_medium: "한식".into(),
            category_congestion_level: "바쁨".into(),
            category_payment_count: Some(120),
            category_payment_min: None,
            category_payment_max: Some(50000),
            merchant_count: Some(35),
            merchant_basis_month: "202506".into(),
            observed_at: ts(25),
            created_at: ts(35),
        };
        let bytes = write_category_observations(&[row]).expect("encode");
        let batch = read_single_batch(&bytes);

        assert_eq!(batch.num_rows(), 1);
        assert_eq!(batch.schema().fields(), category_table_schema().fields());
        assert!(batch.column(5).is_null(0));
    }

    #[test]
    fn timestamps_are_second_precision_civil_values() {
        let bytes = write_area_observations(&[area_row()]).expect("encode");
        let batch = read_single_batch(&bytes);
        let observed = batch
            .column(17)
            .as_any()
            .downcast_ref::<TimestampSecondArray>()
            .expect("timestamp column");
        assert_eq!(observed.value(0), ts(25).and_utc().timestamp());
    }
}
