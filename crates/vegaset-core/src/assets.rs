//! Assets embedded in the binary: the catalog and its two side tables.

use std::io::Read;

use bytes::Bytes;
use flate2::read::GzDecoder;

use crate::error::{IoError, Result};

/// One embedded file, kept compressed until first use.
#[derive(Debug, Clone)]
pub struct Asset {
    name: String,
    data: Bytes,
}

pub const METADATA: &str = "metadata.csv.gz";
pub const URLS: &str = "url.csv.gz";
pub const SCHEMAS: &str = "schemas.json.gz";

impl Asset {
    /// Wraps in-memory bytes; a `.gz` name marks them as gzip compressed.
    #[must_use]
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    #[must_use]
    pub fn metadata() -> Self {
        Self::new(
            METADATA,
            Bytes::from_static(include_bytes!("../assets/metadata.csv.gz")),
        )
    }

    #[must_use]
    pub fn urls() -> Self {
        Self::new(URLS, Bytes::from_static(include_bytes!("../assets/url.csv.gz")))
    }

    #[must_use]
    pub fn schemas() -> Self {
        Self::new(
            SCHEMAS,
            Bytes::from_static(include_bytes!("../assets/schemas.json.gz")),
        )
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the decompressed contents.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Asset`] if the gzip stream is corrupt.
    pub fn decode(&self) -> Result<Bytes> {
        if !self.name.ends_with(".gz") {
            return Ok(self.data.clone());
        }
        let mut decoder = GzDecoder::new(self.data.as_ref());
        let mut buf = Vec::new();
        decoder.read_to_end(&mut buf).map_err(|err| IoError::Asset {
            name: self.name.clone(),
            message: err.to_string(),
        })?;
        Ok(Bytes::from(buf))
    }
}
