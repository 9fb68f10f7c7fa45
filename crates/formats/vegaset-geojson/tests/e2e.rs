use std::path::PathBuf;

use anyhow::Result;
use arrow_array::Array;
use arrow_array::cast::AsArray;
use bytes::Bytes;
use vegaset_core_common::{DataReader, ReadOptions, Source};
use vegaset_geojson::GeoJsonReader;

fn earthquakes() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/e2e_data/earthquakes.geojson")
}

/// Test reading a `GeoJSON` file with point geometries
#[test]
fn test_read_earthquakes_geojson() -> Result<()> {
    let batch = GeoJsonReader.read(Source::Path(earthquakes()), &ReadOptions::default())?;

    assert_eq!(batch.num_rows(), 4);

    // Verify we have both property and geometry columns
    let schema = batch.schema();
    assert!(schema.field_with_name("mag").is_ok());
    assert!(schema.field_with_name("place").is_ok());
    assert!(schema.field_with_name("geometry").is_ok());

    let ids = batch.column_by_name("id").unwrap().as_string::<i32>();
    assert_eq!(ids.value(0), "us1000aztz");
    Ok(())
}

/// Test that a feature without geometry yields a null geometry cell
#[test]
fn test_null_geometry() -> Result<()> {
    let batch = GeoJsonReader.read(Source::Path(earthquakes()), &ReadOptions::default())?;

    let geometry = batch.column_by_name("geometry").unwrap().as_string::<i32>();
    assert!(!geometry.is_null(0));
    assert!(geometry.is_null(3));
    Ok(())
}

/// Test that `TopoJSON` input is reported as an error, not an empty table
#[test]
fn test_topojson_is_rejected() {
    let source = Source::Bytes {
        name: "world-110m.json".to_string(),
        data: Bytes::from_static(br#"{"type":"Topology","objects":{"land":{}},"arcs":[]}"#),
    };
    let err = GeoJsonReader
        .read(source, &ReadOptions::default())
        .unwrap_err();
    assert!(err.to_string().contains("world-110m.json"), "{err}");
}
