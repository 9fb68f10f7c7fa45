use std::fs;
use std::io::Cursor;
use std::sync::Arc;

use anyhow::Result;
use arrow::array::{Array, AsArray};
use arrow::datatypes::{DataType, Field, Float64Type, Schema};
use bytes::Bytes;
use tempfile::TempDir;
use vegaset_arrow::{CsvReader, CsvScanner, JsonReader, TsvReader};
use vegaset_core_common::{DataReader, DataScanner, LogicalType, ReadOptions, Source};

const SEATTLE_WEATHER: &str = "date,precipitation,temp_max,temp_min,wind,weather\n\
2012-01-01,0.0,12.8,5.0,4.7,drizzle\n\
2012-01-02,10.9,10.6,2.8,4.5,rain\n\
2012-01-03,0.8,11.7,7.2,2.3,rain\n";

#[test]
fn test_csv_reader_from_cached_file() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("seattle-weather.csv");
    fs::write(&path, SEATTLE_WEATHER)?;

    let options = ReadOptions::default().with_column_hint("date", LogicalType::Date);
    let batch = CsvReader.read(Source::Path(path), &options)?;

    assert_eq!(batch.num_rows(), 3);
    assert_eq!(batch.schema().field(0).data_type(), &DataType::Date32);
    let weather = batch.column(5).as_string::<i32>();
    assert_eq!(weather.value(1), "rain");
    Ok(())
}

#[test]
fn test_tsv_reader_from_stream() -> Result<()> {
    let source = Source::Stream {
        name: "unemployment.tsv".to_string(),
        reader: Box::new(Cursor::new(b"id\trate\n1001\t.097\n1003\t.091\n".to_vec())),
    };
    let batch = TsvReader.read(source, &ReadOptions::default())?;

    assert_eq!(batch.num_rows(), 2);
    assert_eq!(batch.schema().field(1).data_type(), &DataType::Float64);
    Ok(())
}

#[test]
fn test_json_reader_error_names_source() {
    let source = Source::Bytes {
        name: "miserables.json".to_string(),
        data: Bytes::from_static(br#"{"nodes": [], "links": []}"#),
    };
    let err = JsonReader.read(source, &ReadOptions::default()).unwrap_err();

    assert!(err.to_string().contains("miserables.json"), "{err}");
}

#[test]
fn test_csv_scanner_streams_with_explicit_schema() -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("date", DataType::Utf8, false),
        Field::new("precipitation", DataType::Float64, false),
        Field::new("temp_max", DataType::Float64, false),
        Field::new("temp_min", DataType::Float64, false),
        Field::new("wind", DataType::Float64, false),
        Field::new("weather", DataType::Utf8, false),
    ]));
    let source = Source::Bytes {
        name: "weather".to_string(),
        data: Bytes::from_static(SEATTLE_WEATHER.as_bytes()),
    };
    let options = ReadOptions::default().with_schema(schema).with_batch_size(1);

    let rows: usize = CsvScanner
        .scan(source, &options)?
        .map(|batch| batch.map(|b| b.num_rows()))
        .sum::<Result<usize, _>>()?;
    assert_eq!(rows, 3);
    Ok(())
}

#[test]
fn test_reader_names() {
    assert_eq!(CsvReader.name(), "read_csv");
    assert_eq!(TsvReader.name(), "read_tsv");
    assert_eq!(JsonReader.name(), "read_json");
    assert_eq!(CsvScanner.name(), "scan_csv");
}

/// A column that turns fractional after the first thousand rows still loads
#[test]
fn test_csv_type_change_after_many_rows() -> Result<()> {
    let mut csv = String::from("value\n");
    for i in 0..1000 {
        csv.push_str(&format!("{i}\n"));
    }
    csv.push_str("1.5\n");
    let source = Source::Bytes {
        name: "late-float.csv".to_string(),
        data: Bytes::from(csv),
    };

    let batch = CsvReader.read(source, &ReadOptions::default())?;

    assert_eq!(batch.num_rows(), 1001);
    assert_eq!(batch.schema().field(0).data_type(), &DataType::Float64);
    let values = batch.column(0).as_primitive::<Float64Type>();
    assert_eq!(values.value(1000), 1.5);
    Ok(())
}

/// A column that is null for the first thousand records still loads
#[test]
fn test_json_sparse_column_after_many_rows() -> Result<()> {
    let mut rows: Vec<String> = (0..1000)
        .map(|i| format!(r#"{{"a":{i},"b":null}}"#))
        .collect();
    rows.push(r#"{"a":1000,"b":"x"}"#.to_string());
    let source = Source::Bytes {
        name: "sparse.json".to_string(),
        data: Bytes::from(format!("[{}]", rows.join(","))),
    };

    let batch = JsonReader.read(source, &ReadOptions::default())?;

    assert_eq!(batch.num_rows(), 1001);
    let b = batch.column_by_name("b").unwrap().as_string::<i32>();
    assert!(b.is_null(0));
    assert_eq!(b.value(1000), "x");
    Ok(())
}

/// An explicit sample size still limits inference
#[test]
fn test_sampled_inference_is_opt_in() {
    let mut csv = String::from("value\n");
    for i in 0..10 {
        csv.push_str(&format!("{i}\n"));
    }
    csv.push_str("1.5\n");
    let source = Source::Bytes {
        name: "late-float.csv".to_string(),
        data: Bytes::from(csv),
    };

    let options = ReadOptions::default().with_schema_infer_max_rec(Some(10));
    assert!(CsvReader.read(source, &options).is_err());
}
