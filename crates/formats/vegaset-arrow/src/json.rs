//! Tabular JSON artifacts: a top-level array of flat records.

use std::sync::Arc;

use arrow_array::RecordBatch;
use arrow_json::ReaderBuilder;
use arrow_json::reader::infer_json_schema_from_iterator;
use arrow_schema::ArrowError;
use serde_json::Value;
use vegaset_core_common::ReadOptions;
use vegaset_formats_shared::{FormatReadError, FormatResult, SourcePosition};

use crate::temporal::apply_column_hints;

/// Reads a JSON array of objects into one record batch.
///
/// # Errors
///
/// Returns [`FormatReadError::Parse`] for malformed JSON and
/// [`FormatReadError::SchemaInference`] when the document is not an array of
/// objects, such as a `GeoJSON` or `TopoJSON` document.
pub fn read_json_records(bytes: &[u8], options: &ReadOptions) -> FormatResult<RecordBatch> {
    let document: Value = serde_json::from_slice(bytes).map_err(|err| FormatReadError::Parse {
        message: err.to_string(),
        position: Some(SourcePosition {
            line: Some(err.line() as u64),
            column: Some(err.column() as u64),
            ..SourcePosition::default()
        }),
        context: None,
    })?;
    let rows = records(document)?;

    let schema = match &options.schema {
        Some(schema) => Arc::clone(schema),
        None => {
            let sample = options.schema_infer_max_rec.unwrap_or(rows.len());
            let inferred =
                infer_json_schema_from_iterator(rows.iter().take(sample).map(Ok::<_, ArrowError>))?;
            Arc::new(inferred)
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

fn records(document: Value) -> FormatResult<Vec<Value>> {
    match document {
        Value::Array(rows) => match rows.iter().position(|row| !row.is_object()) {
            None => Ok(rows),
            Some(index) => Err(FormatReadError::SchemaInference {
                message: format!("Expected every element to be an object, element {index} is not"),
                context: None,
            }),
        },
        Value::Object(map) => {
            let kind = map
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("object")
                .to_string();
            Err(FormatReadError::schema(format!(
                "Expected an array of records, found a single '{kind}' document"
            )))
        },
        _ => Err(FormatReadError::schema("Expected an array of records")),
    }
}

#[cfg(test)]
mod tests {
    use arrow::array::AsArray;
    use arrow_schema::DataType;
    use vegaset_core_common::LogicalType;

    use super::*;

    const CARS: &[u8] = br#"[
        {"Name": "chevrolet chevelle malibu", "Miles_per_Gallon": 18, "Cylinders": 8, "Year": "1970-01-01", "Origin": "USA"},
        {"Name": "buick skylark 320", "Miles_per_Gallon": 15, "Cylinders": 8, "Year": "1970-01-01", "Origin": "USA"},
        {"Name": "citroen ds-21 pallas", "Miles_per_Gallon": null, "Cylinders": 4, "Year": "1970-01-01", "Origin": "Europe"}
    ]"#;

    #[test]
    fn test_reads_array_of_records() {
        let batch = read_json_records(CARS, &ReadOptions::default()).unwrap();

        assert_eq!(batch.num_rows(), 3);
        let schema = batch.schema();
        let mpg = schema.field_with_name("Miles_per_Gallon").unwrap();
        assert_eq!(mpg.data_type(), &DataType::Int64);
        let origin = batch
            .column_by_name("Origin")
            .unwrap()
            .as_string::<i32>();
        assert_eq!(origin.value(2), "Europe");
    }

    #[test]
    fn test_date_hint_applies_to_json() {
        let options = ReadOptions::default().with_column_hint("Year", LogicalType::Date);
        let batch = read_json_records(CARS, &options).unwrap();

        let schema = batch.schema();
        assert_eq!(
            schema.field_with_name("Year").unwrap().data_type(),
            &DataType::Date32
        );
    }

    #[test]
    fn test_geojson_document_is_not_tabular() {
        let err = read_json_records(
            br#"{"type": "FeatureCollection", "features": []}"#,
            &ReadOptions::default(),
        )
        .unwrap_err();

        assert!(matches!(err, FormatReadError::SchemaInference { .. }));
        assert!(err.to_string().contains("'FeatureCollection'"));
    }

    #[test]
    fn test_malformed_json_reports_position() {
        let err = read_json_records(b"[{\"a\": 1},\n{\"a\": }]", &ReadOptions::default()).unwrap_err();
        match err {
            FormatReadError::Parse { position, .. } => {
                assert_eq!(position.and_then(|p| p.line), Some(2));
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_array_yields_empty_batch() {
        let batch = read_json_records(b"[]", &ReadOptions::default()).unwrap();
        assert_eq!(batch.num_rows(), 0);
    }
}
