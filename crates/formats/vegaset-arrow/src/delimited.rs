//! Comma- and tab-separated artifacts.

use std::io::{Cursor, Read};
use std::sync::Arc;

use arrow::compute::concat_batches;
use arrow_array::RecordBatch;
use arrow_csv::reader::{Format, ReaderBuilder};
use arrow_schema::SchemaRef;
use bytes::Bytes;
use vegaset_core_common::{BatchIter, ReadOptions};
use vegaset_formats_shared::{FormatReadError, FormatResult};

use crate::temporal::apply_column_hints;

/// Reads a delimited artifact with a header row into one record batch.
///
/// The schema comes from `options.schema` when set, otherwise it is inferred from
/// `options.schema_infer_max_rec` records, or from every record when that is
/// `None`. Column hints are applied after decoding.
///
/// # Errors
///
/// Returns a [`FormatReadError`] if inference or decoding fails.
pub fn read_delimited(
    bytes: Bytes,
    delimiter: u8,
    options: &ReadOptions,
) -> FormatResult<RecordBatch> {
    let schema = match &options.schema {
        Some(schema) => Arc::clone(schema),
        None => infer_schema(&bytes, delimiter, options)?,
    };

    let reader = ReaderBuilder::new(Arc::clone(&schema))
        .with_header(true)
        .with_delimiter(delimiter)
        .with_batch_size(options.batch_size)
        .build(Cursor::new(bytes))?;
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    let batch = concat_batches(&schema, &batches)?;

    apply_column_hints(batch, &options.column_hints)
}

/// Streams a delimited artifact with a header row.
///
/// Streaming never buffers the whole input, so the schema cannot be inferred and
/// must be supplied in `options.schema`.
///
/// # Errors
///
/// Returns [`FormatReadError::SchemaInference`] when no schema is supplied.
pub fn scan_delimited(
    reader: Box<dyn Read + Send>,
    delimiter: u8,
    options: &ReadOptions,
) -> FormatResult<BatchIter> {
    let schema = options
        .schema
        .clone()
        .ok_or_else(|| FormatReadError::schema("Streaming scans require an explicit schema"))?;

    let reader = ReaderBuilder::new(schema)
        .with_header(true)
        .with_delimiter(delimiter)
        .with_batch_size(options.batch_size)
        .build(reader)?;
    Ok(Box::new(reader))
}

fn infer_schema(bytes: &[u8], delimiter: u8, options: &ReadOptions) -> FormatResult<SchemaRef> {
    let format = Format::default()
        .with_header(true)
        .with_delimiter(delimiter);
    let (schema, _) = format.infer_schema(Cursor::new(bytes), options.schema_infer_max_rec)?;
    if schema.fields().is_empty() {
        return Err(FormatReadError::schema("No header row found"));
    }
    Ok(Arc::new(schema))
}
