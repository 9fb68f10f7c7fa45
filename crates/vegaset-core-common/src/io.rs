//! I/O traits for reading dataset artifacts into Arrow record batches.
//!
//! This module defines the core traits that format implementations must provide.
//! A [`DataReader`] eagerly materializes an artifact as one [`RecordBatch`]; a
//! [`DataScanner`] streams batches and is used for the catalog itself.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::PathBuf;

use anyhow::Result;
use arrow::array::RecordBatch;
use arrow::error::ArrowError;
use arrow_schema::SchemaRef;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A lazily consumed sequence of record batches.
pub type BatchIter = Box<dyn Iterator<Item = std::result::Result<RecordBatch, ArrowError>>>;

/// Where the bytes of an artifact come from.
pub enum Source {
    /// A file in the local cache directory.
    Path(PathBuf),
    /// Bytes already in memory, such as an embedded asset.
    Bytes {
        /// Label used in error messages
        name: String,
        data: Bytes,
    },
    /// A forward-only stream, such as an HTTP response body.
    Stream {
        /// Label used in error messages
        name: String,
        reader: Box<dyn Read + Send>,
    },
}

impl Source {
    /// Describes the source for logs and error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Source::Path(path) => path.display().to_string(),
            Source::Bytes { name, .. } | Source::Stream { name, .. } => name.clone(),
        }
    }

    /// Reads the whole source into memory.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file or stream cannot be read.
    pub fn into_bytes(self) -> std::io::Result<Bytes> {
        match self {
            Source::Path(path) => std::fs::read(path).map(Bytes::from),
            Source::Bytes { data, .. } => Ok(data),
            Source::Stream { mut reader, .. } => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf)?;
                Ok(Bytes::from(buf))
            },
        }
    }

    /// Converts the source into a reader without buffering it first.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a file source cannot be opened.
    pub fn into_reader(self) -> std::io::Result<Box<dyn Read + Send>> {
        match self {
            Source::Path(path) => Ok(Box::new(File::open(path)?)),
            Source::Bytes { data, .. } => Ok(Box::new(Cursor::new(data))),
            Source::Stream { reader, .. } => Ok(reader),
        }
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Source::Bytes { name, data } => f
                .debug_struct("Bytes")
                .field("name", name)
                .field("len", &data.len())
                .finish(),
            Source::Stream { name, .. } => {
                f.debug_struct("Stream").field("name", name).finish_non_exhaustive()
            },
        }
    }
}

/// Logical column type published in a dataset schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    Date,
    Time,
    Datetime,
    Year,
    #[serde(other)]
    Other,
}

impl LogicalType {
    /// Returns `true` for types a reader may parse into an Arrow temporal type.
    #[must_use]
    pub fn is_temporal(self) -> bool {
        matches!(self, LogicalType::Date | LogicalType::Datetime)
    }
}

/// Options that control how readers parse an artifact.
///
/// # Examples
///
/// ```
/// use vegaset_core_common::{LogicalType, ReadOptions};
///
/// let options = ReadOptions::default()
///     .with_batch_size(1024)
///     .with_column_hint("date", LogicalType::Date);
///
/// assert_eq!(options.batch_size, 1024);
/// assert_eq!(options.column_hints.get("date"), Some(&LogicalType::Date));
/// ```
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Number of rows decoded per batch
    pub batch_size: usize,
    /// Rows sampled for schema inference; `None`, the default, reads every row
    pub schema_infer_max_rec: Option<usize>,
    /// Explicit schema, skipping inference
    pub schema: Option<SchemaRef>,
    /// Per-column logical types used to refine inferred text columns
    pub column_hints: BTreeMap<String, LogicalType>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            batch_size: 8192,
            schema_infer_max_rec: None,
            schema: None,
            column_hints: BTreeMap::new(),
        }
    }
}

impl ReadOptions {
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    #[must_use]
    pub fn with_schema_infer_max_rec(mut self, max_records: Option<usize>) -> Self {
        self.schema_infer_max_rec = max_records;
        self
    }

    #[must_use]
    pub fn with_schema(mut self, schema: SchemaRef) -> Self {
        self.schema = Some(schema);
        self
    }

    #[must_use]
    pub fn with_column_hint(mut self, column: impl Into<String>, logical: LogicalType) -> Self {
        self.column_hints.insert(column.into(), logical);
        self
    }

    /// Adds hints for columns the caller has not already hinted.
    #[must_use]
    pub fn merge_hints<I>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = (String, LogicalType)>,
    {
        for (column, logical) in hints {
            self.column_hints.entry(column).or_insert(logical);
        }
        self
    }
}

/// Trait for eagerly reading an artifact into a single record batch.
pub trait DataReader: Send + Sync {
    /// Short name of the parse function, shown in diagnostics.
    fn name(&self) -> &'static str;

    /// Reads `source` into one record batch.
    ///
    /// # Arguments
    ///
    /// * `source` - The artifact bytes (cached file, memory, or network stream)
    /// * `options` - Parsing options, including schema hints
    fn read(&self, source: Source, options: &ReadOptions) -> Result<RecordBatch>;
}

/// Trait for streaming an artifact as a sequence of record batches.
pub trait DataScanner: Send + Sync {
    /// Short name of the scan function, shown in diagnostics.
    fn name(&self) -> &'static str;

    /// Opens `source` and returns an iterator over its batches.
    fn scan(&self, source: Source, options: &ReadOptions) -> Result<BatchIter>;
}
