//! Conversion of feature records into an Arrow table.

use std::sync::Arc;

use arrow_array::RecordBatch;
use arrow_json::ReaderBuilder;
use arrow_json::reader::infer_json_schema_from_iterator;
use arrow_schema::{ArrowError, DataType, Field, Schema};
use geojson::JsonValue;
use vegaset_arrow::temporal::apply_column_hints;
use vegaset_core_common::ReadOptions;
use vegaset_formats_shared::FormatResult;

use crate::parser::FeatureRecord;

/// Builds one record batch with a column per property plus `id` and `geometry`.
///
/// The `geometry` column holds each feature's geometry as `GeoJSON` text.
///
/// # Errors
///
/// Returns an error if the properties cannot be typed consistently.
pub fn records_to_batch(
    records: Vec<FeatureRecord>,
    options: &ReadOptions,
) -> FormatResult<RecordBatch> {
    let rows: Vec<JsonValue> = records
        .into_iter()
        .map(|record| JsonValue::Object(record.into_row()))
        .collect();

    let schema = match &options.schema {
        Some(schema) => Arc::clone(schema),
        None => {
            let sample = options.schema_infer_max_rec.unwrap_or(rows.len());
            let inferred =
                infer_json_schema_from_iterator(rows.iter().take(sample).map(Ok::<_, ArrowError>))?;
            Arc::new(with_text_columns(&inferred))
        },
    };

    let mut decoder = ReaderBuilder::new(Arc::clone(&schema))
        .with_batch_size(rows.len().max(1))
        .build_decoder()?;
    decoder.serialize(&rows)?;
    let batch = decoder
        .flush()?
        .unwrap_or_else(|| RecordBatch::new_empty(schema));

    apply_column_hints(batch, &options.column_hints)
}

/// Forces `id` and `geometry` to nullable text, whatever inference found.
fn with_text_columns(schema: &Schema) -> Schema {
    let fields = schema
        .fields()
        .iter()
        .map(|field| match field.name().as_str() {
            "id" | "geometry" => Arc::new(Field::new(field.name(), DataType::Utf8, true)),
            _ => Arc::clone(field),
        })
        .collect::<Vec<_>>();
    Schema::new_with_metadata(fields, schema.metadata().clone())
}
