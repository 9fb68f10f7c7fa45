//! Reader implementation that plugs the `GeoJSON` parser into capability bindings.

use anyhow::Result;
use arrow_array::RecordBatch;
use vegaset_core_common::{DataReader, ReadOptions, Source};

use crate::parser::parse_geojson_bytes;
use crate::table::records_to_batch;

/// Reader implementation for `GeoJSON` artifacts.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoJsonReader;

impl DataReader for GeoJsonReader {
    fn name(&self) -> &'static str {
        "read_geojson"
    }

    fn read(&self, source: Source, options: &ReadOptions) -> Result<RecordBatch> {
        let context = source.describe();
        let bytes = source.into_bytes()?;
        let records = parse_geojson_bytes(&bytes, context.as_str())?;
        Ok(records_to_batch(records, options).map_err(|e| e.with_additional_context(context))?)
    }
}
