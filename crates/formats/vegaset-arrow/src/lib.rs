//! Arrow readers for the delimited, JSON, IPC and Parquet artifacts of the dataset catalog.
//!
//! Parsing is delegated to the Arrow crates (`arrow-csv`, `arrow-json`, `arrow::ipc`,
//! and `parquet` behind the `parquet` feature). This crate only adapts their
//! options and errors, and applies schema hints to inferred text columns.
//!
//! The [`factory`] module exposes each parser as a `DataReader` for use in
//! capability bindings.

pub mod delimited;
pub mod factory;
pub mod ipc;
pub mod json;
#[cfg(feature = "parquet")]
pub mod parquet_reader;
pub mod temporal;

pub use factory::{ArrowIpcReader, CsvReader, CsvScanner, JsonReader, TsvReader};
#[cfg(feature = "parquet")]
pub use factory::ParquetReader;
