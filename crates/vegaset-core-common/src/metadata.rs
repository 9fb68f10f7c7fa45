//! Catalog rows and the file extensions they describe.
//!
//! Each [`MetadataRow`] describes one physical artifact of a dataset at one catalog
//! version. Rows are read-only at runtime: they are decoded from the embedded catalog
//! and never written back.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use arrow::array::{Array, AsArray, RecordBatch};
use arrow::datatypes::Int64Type;
use arrow::error::ArrowError;
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use thiserror::Error;

use crate::constraints::{Attr, ConstraintSet};

/// File extension of a catalog artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Suffix {
    Csv,
    Json,
    Tsv,
    Arrow,
    Parquet,
    Png,
}

impl Suffix {
    /// Every known extension.
    pub const ALL: [Suffix; 6] = [
        Suffix::Csv,
        Suffix::Json,
        Suffix::Tsv,
        Suffix::Arrow,
        Suffix::Parquet,
        Suffix::Png,
    ];

    /// Extensions that carry tabular data.
    pub const TABULAR: [Suffix; 5] = [
        Suffix::Csv,
        Suffix::Json,
        Suffix::Tsv,
        Suffix::Arrow,
        Suffix::Parquet,
    ];

    /// Returns the extension including its leading dot.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Suffix::Csv => ".csv",
            Suffix::Json => ".json",
            Suffix::Tsv => ".tsv",
            Suffix::Arrow => ".arrow",
            Suffix::Parquet => ".parquet",
            Suffix::Png => ".png",
        }
    }

    /// Splits `file_name` into its stem and a known extension.
    ///
    /// # Examples
    ///
    /// ```
    /// use vegaset_core_common::Suffix;
    ///
    /// assert_eq!(Suffix::split_file_name("cars.json"), Some(("cars", Suffix::Json)));
    /// assert_eq!(Suffix::split_file_name("flights-2k"), None);
    /// assert_eq!(Suffix::split_file_name("notes.txt"), None);
    /// ```
    #[must_use]
    pub fn split_file_name(file_name: &str) -> Option<(&str, Suffix)> {
        Suffix::ALL.into_iter().find_map(|suffix| {
            file_name
                .strip_suffix(suffix.as_str())
                .filter(|stem| !stem.is_empty())
                .map(|stem| (stem, suffix))
        })
    }
}

impl fmt::Display for Suffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the known extensions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Expected 'suffix' to be one of ({}),\nbut got: {value:?}", known_suffixes())]
pub struct UnknownSuffix {
    /// The rejected input
    pub value: String,
}

/// Comma-separated list of known extensions, for error messages.
#[must_use]
pub fn known_suffixes() -> String {
    Suffix::ALL
        .iter()
        .map(|s| format!("{:?}", s.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

impl FromStr for Suffix {
    type Err = UnknownSuffix;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Suffix::ALL
            .into_iter()
            .find(|suffix| suffix.as_str() == s)
            .ok_or_else(|| UnknownSuffix {
                value: s.to_string(),
            })
    }
}

/// One dataset artifact at one catalog version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetadataRow {
    /// Dataset name without extension (e.g. `"cars"`)
    pub dataset_name: String,
    pub suffix: Suffix,
    /// `dataset_name` followed by `suffix`
    pub file_name: String,
    /// Size of the remote artifact
    pub bytes: u64,
    pub is_image: bool,
    pub is_tabular: bool,
    /// `GeoJSON` content
    pub is_geo: bool,
    /// `TopoJSON` content
    pub is_topo: bool,
    /// Either `GeoJSON` or `TopoJSON`
    pub is_spatial: bool,
    pub is_json: bool,
    /// A column schema is published for this dataset
    pub has_schema: bool,
    /// Content hash; together with `suffix` it names the artifact across versions
    pub sha: String,
    pub url: String,
    /// Catalog version that lists this artifact
    pub tag: String,
}

static CATALOG_SCHEMA: LazyLock<SchemaRef> = LazyLock::new(|| {
    let fields = Attr::ALL
        .into_iter()
        .map(|attr| {
            let data_type = match attr {
                Attr::Bytes => DataType::Int64,
                Attr::IsImage
                | Attr::IsTabular
                | Attr::IsGeo
                | Attr::IsTopo
                | Attr::IsSpatial
                | Attr::IsJson
                | Attr::HasSchema => DataType::Boolean,
                Attr::DatasetName
                | Attr::Suffix
                | Attr::FileName
                | Attr::Sha
                | Attr::Url
                | Attr::Tag => DataType::Utf8,
            };
            Field::new(attr.column_name(), data_type, false)
        })
        .collect::<Vec<_>>();
    Arc::new(Schema::new(fields))
});

impl MetadataRow {
    /// Arrow schema of the catalog table, one column per [`Attr`].
    #[must_use]
    pub fn schema() -> SchemaRef {
        Arc::clone(&CATALOG_SCHEMA)
    }

    /// Name of the artifact inside a cache directory: `<sha><suffix>`.
    #[must_use]
    pub fn cache_file_name(&self) -> String {
        format!("{}{}", self.sha, self.suffix)
    }

    /// `is_json && !is_tabular`: JSON documents with no row structure.
    #[must_use]
    pub fn is_nontabular_json(&self) -> bool {
        self.is_json && !self.is_tabular
    }

    /// Every attribute of the row as a constraint set.
    #[must_use]
    pub fn attrs(&self) -> ConstraintSet {
        let size = i64::try_from(self.bytes).unwrap_or(i64::MAX);
        ConstraintSet::new([(Attr::DatasetName, self.dataset_name.as_str())])
            .with(Attr::Suffix, self.suffix)
            .with(Attr::FileName, self.file_name.as_str())
            .with(Attr::Bytes, size)
            .with(Attr::IsImage, self.is_image)
            .with(Attr::IsTabular, self.is_tabular)
            .with(Attr::IsGeo, self.is_geo)
            .with(Attr::IsTopo, self.is_topo)
            .with(Attr::IsSpatial, self.is_spatial)
            .with(Attr::IsJson, self.is_json)
            .with(Attr::HasSchema, self.has_schema)
            .with(Attr::Sha, self.sha.as_str())
            .with(Attr::Url, self.url.as_str())
            .with(Attr::Tag, self.tag.as_str())
    }

    /// Decodes row `index` of a catalog batch.
    ///
    /// # Errors
    ///
    /// Returns an [`ArrowError`] if a column is missing, has an unexpected type,
    /// contains a null, or the suffix is unknown.
    pub fn from_batch(batch: &RecordBatch, index: usize) -> Result<Self, ArrowError> {
        if index >= batch.num_rows() {
            return Err(ArrowError::InvalidArgumentError(format!(
                "Row {index} is out of bounds for a batch of {} rows",
                batch.num_rows()
            )));
        }
        let suffix = string_at(batch, Attr::Suffix, index)?;
        let suffix = suffix
            .parse::<Suffix>()
            .map_err(|err| ArrowError::ParseError(err.to_string()))?;
        let bytes = int_at(batch, Attr::Bytes, index)?;

        Ok(Self {
            dataset_name: string_at(batch, Attr::DatasetName, index)?,
            suffix,
            file_name: string_at(batch, Attr::FileName, index)?,
            bytes: u64::try_from(bytes)
                .map_err(|_| ArrowError::ParseError(format!("Negative byte size: {bytes}")))?,
            is_image: bool_at(batch, Attr::IsImage, index)?,
            is_tabular: bool_at(batch, Attr::IsTabular, index)?,
            is_geo: bool_at(batch, Attr::IsGeo, index)?,
            is_topo: bool_at(batch, Attr::IsTopo, index)?,
            is_spatial: bool_at(batch, Attr::IsSpatial, index)?,
            is_json: bool_at(batch, Attr::IsJson, index)?,
            has_schema: bool_at(batch, Attr::HasSchema, index)?,
            sha: string_at(batch, Attr::Sha, index)?,
            url: string_at(batch, Attr::Url, index)?,
            tag: string_at(batch, Attr::Tag, index)?,
        })
    }

    /// Decodes every row of a catalog batch.
    ///
    /// # Errors
    ///
    /// See [`MetadataRow::from_batch`].
    pub fn all_from_batch(batch: &RecordBatch) -> Result<Vec<Self>, ArrowError> {
        (0..batch.num_rows())
            .map(|index| Self::from_batch(batch, index))
            .collect()
    }
}

fn column_error(attr: Attr, expected: &str) -> ArrowError {
    ArrowError::SchemaError(format!(
        "Catalog column '{attr}' is missing or is not {expected}"
    ))
}

fn null_error(attr: Attr, index: usize) -> ArrowError {
    ArrowError::InvalidArgumentError(format!("Catalog column '{attr}' is null at row {index}"))
}

fn string_at(batch: &RecordBatch, attr: Attr, index: usize) -> Result<String, ArrowError> {
    let column = batch
        .column_by_name(attr.column_name())
        .and_then(|c| c.as_string_opt::<i32>())
        .ok_or_else(|| column_error(attr, "Utf8"))?;
    if column.is_null(index) {
        return Err(null_error(attr, index));
    }
    Ok(column.value(index).to_string())
}

fn bool_at(batch: &RecordBatch, attr: Attr, index: usize) -> Result<bool, ArrowError> {
    let column = batch
        .column_by_name(attr.column_name())
        .and_then(|c| c.as_boolean_opt())
        .ok_or_else(|| column_error(attr, "Boolean"))?;
    if column.is_null(index) {
        return Err(null_error(attr, index));
    }
    Ok(column.value(index))
}

fn int_at(batch: &RecordBatch, attr: Attr, index: usize) -> Result<i64, ArrowError> {
    let column = batch
        .column_by_name(attr.column_name())
        .and_then(|c| c.as_primitive_opt::<Int64Type>())
        .ok_or_else(|| column_error(attr, "Int64"))?;
    if column.is_null(index) {
        return Err(null_error(attr, index));
    }
    Ok(column.value(index))
}
