//! Reader implementations that plug the Arrow parsers into capability bindings.
//!
//! Each type here is a zero-sized [`DataReader`] or [`DataScanner`] that a backend
//! registers under the constraints it supports.

use anyhow::Result;
use arrow_array::RecordBatch;
use vegaset_core_common::{BatchIter, DataReader, DataScanner, ReadOptions, Source};

use crate::delimited::{read_delimited, scan_delimited};
use crate::ipc::read_ipc;
use crate::json::read_json_records;

/// Reader implementation for comma-separated artifacts.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvReader;

impl DataReader for CsvReader {
    fn name(&self) -> &'static str {
        "read_csv"
    }

    fn read(&self, source: Source, options: &ReadOptions) -> Result<RecordBatch> {
        let context = source.describe();
        let bytes = source.into_bytes()?;
        Ok(read_delimited(bytes, b',', options).map_err(|e| e.with_additional_context(context))?)
    }
}

/// Reader implementation for tab-separated artifacts.
#[derive(Debug, Clone, Copy, Default)]
pub struct TsvReader;

impl DataReader for TsvReader {
    fn name(&self) -> &'static str {
        "read_tsv"
    }

    fn read(&self, source: Source, options: &ReadOptions) -> Result<RecordBatch> {
        let context = source.describe();
        let bytes = source.into_bytes()?;
        Ok(read_delimited(bytes, b'\t', options).map_err(|e| e.with_additional_context(context))?)
    }
}

/// Reader implementation for JSON arrays of records.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReader;

impl DataReader for JsonReader {
    fn name(&self) -> &'static str {
        "read_json"
    }

    fn read(&self, source: Source, options: &ReadOptions) -> Result<RecordBatch> {
        let context = source.describe();
        let bytes = source.into_bytes()?;
        Ok(read_json_records(&bytes, options).map_err(|e| e.with_additional_context(context))?)
    }
}

/// Reader implementation for Arrow IPC artifacts.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrowIpcReader;

impl DataReader for ArrowIpcReader {
    fn name(&self) -> &'static str {
        "read_ipc"
    }

    fn read(&self, source: Source, _options: &ReadOptions) -> Result<RecordBatch> {
        let context = source.describe();
        let bytes = source.into_bytes()?;
        Ok(read_ipc(bytes).map_err(|e| e.with_additional_context(context))?)
    }
}

/// Reader implementation for Parquet artifacts.
#[cfg(feature = "parquet")]
#[derive(Debug, Clone, Copy, Default)]
pub struct ParquetReader;

#[cfg(feature = "parquet")]
impl DataReader for ParquetReader {
    fn name(&self) -> &'static str {
        "read_parquet"
    }

    fn read(&self, source: Source, options: &ReadOptions) -> Result<RecordBatch> {
        let context = source.describe();
        let bytes = source.into_bytes()?;
        Ok(crate::parquet_reader::read_parquet(bytes, options)
            .map_err(|e| e.with_additional_context(context))?)
    }
}

/// Streaming scanner for comma-separated artifacts with a known schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvScanner;

impl DataScanner for CsvScanner {
    fn name(&self) -> &'static str {
        "scan_csv"
    }

    fn scan(&self, source: Source, options: &ReadOptions) -> Result<BatchIter> {
        let context = source.describe();
        let reader = source.into_reader()?;
        Ok(scan_delimited(reader, b',', options).map_err(|e| e.with_additional_context(context))?)
    }
}
