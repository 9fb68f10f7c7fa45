//! Arrow IPC artifacts, in either the file or the streaming format.

use std::io::Cursor;

use arrow::compute::concat_batches;
use arrow::ipc::reader::{FileReader, StreamReader};
use arrow_array::RecordBatch;
use bytes::Bytes;
use log::debug;
use vegaset_formats_shared::FormatResult;

/// Reads an Arrow IPC artifact into one record batch.
///
/// The file format (with footer) is tried first; on failure the bytes are read
/// as an IPC stream.
///
/// # Errors
///
/// Returns the file-format error when neither layout can be decoded.
pub fn read_ipc(bytes: Bytes) -> FormatResult<RecordBatch> {
    match FileReader::try_new(Cursor::new(bytes.clone()), None) {
        Ok(reader) => {
            let schema = reader.schema();
            let batches = reader.collect::<Result<Vec<_>, _>>()?;
            Ok(concat_batches(&schema, &batches)?)
        },
        Err(file_err) => {
            debug!("Not an Arrow IPC file ({file_err}), trying the stream format");
            let reader = StreamReader::try_new(Cursor::new(bytes), None).map_err(|_| file_err)?;
            let schema = reader.schema();
            let batches = reader.collect::<Result<Vec<_>, _>>()?;
            Ok(concat_batches(&schema, &batches)?)
        },
    }
}
