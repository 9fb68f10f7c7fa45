//! Parquet artifacts.

use arrow::compute::concat_batches;
use arrow_array::RecordBatch;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use vegaset_core_common::ReadOptions;
use vegaset_formats_shared::{FormatReadError, FormatResult};

/// Reads a Parquet artifact into one record batch.
///
/// # Errors
///
/// Returns [`FormatReadError::Parse`] if the footer or a row group cannot be decoded.
pub fn read_parquet(bytes: Bytes, options: &ReadOptions) -> FormatResult<RecordBatch> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(bytes)
        .map_err(|e| parse_error(format!("parquet reader init failed: {e}")))?
        .with_batch_size(options.batch_size);
    let schema = builder.schema().clone();
    let reader = builder
        .build()
        .map_err(|e| parse_error(format!("parquet reader build failed: {e}")))?;

    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    Ok(concat_batches(&schema, &batches)?)
}

fn parse_error(message: String) -> FormatReadError {
    FormatReadError::Parse {
        message,
        position: None,
        context: None,
    }
}
