//! Process-wide lookup tables that answer common questions without the catalog.
//!
//! - [`UrlCache`] maps a bare dataset name to the url of its default artifact.
//! - [`SchemaCache`] maps a dataset name to its published column types.
//!
//! Both are decoded from embedded assets on first lookup and then shared by every
//! loader in the process through [`url_cache`] and [`schema_cache`].

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use log::debug;
use serde::Deserialize;
use vegaset_core_common::{LogicalType, MetadataRow};

use crate::assets::Asset;
use crate::catalog::get_or_try_init;
use crate::error::{IoError, Result};

/// Column name to logical type, for one dataset.
pub type ColumnTypes = BTreeMap<String, LogicalType>;

#[derive(Debug, Deserialize)]
struct UrlRecord {
    dataset_name: String,
    url: String,
}

/// Dataset name to url of its default artifact in the latest catalog version.
#[derive(Debug)]
pub struct UrlCache {
    asset: Asset,
    urls: OnceLock<HashMap<String, String>>,
}

impl UrlCache {
    #[must_use]
    pub fn new(asset: Asset) -> Self {
        Self {
            asset,
            urls: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn embedded() -> Self {
        Self::new(Asset::urls())
    }

    /// Looks up the url of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Asset`] if the table cannot be decoded.
    pub fn get(&self, name: &str) -> Result<Option<&str>> {
        let urls = get_or_try_init(&self.urls, || self.load())?;
        Ok(urls.get(name).map(String::as_str))
    }

    fn load(&self) -> Result<HashMap<String, String>> {
        let data = self.asset.decode()?;
        let mut reader = csv::Reader::from_reader(data.as_ref());
        let asset_error = |message: String| IoError::Asset {
            name: self.asset.name().to_string(),
            message,
        };

        let headers = reader
            .headers()
            .map_err(|err| asset_error(err.to_string()))?;
        if headers.iter().collect::<Vec<_>>() != ["dataset_name", "url"] {
            return Err(asset_error(format!(
                "Expected columns 'dataset_name,url', found {headers:?}"
            ))
            .into());
        }

        let mut urls = HashMap::new();
        for record in reader.deserialize::<UrlRecord>() {
            let record = record.map_err(|err| asset_error(err.to_string()))?;
            urls.insert(record.dataset_name, record.url);
        }
        debug!("Loaded {} urls from {}", urls.len(), self.asset.name());
        Ok(urls)
    }
}

/// Published column types of tabular datasets.
#[derive(Debug)]
pub struct SchemaCache {
    asset: Asset,
    schemas: OnceLock<HashMap<String, ColumnTypes>>,
}

impl SchemaCache {
    #[must_use]
    pub fn new(asset: Asset) -> Self {
        Self {
            asset,
            schemas: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn embedded() -> Self {
        Self::new(Asset::schemas())
    }

    /// Column types of `name`, if published.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Asset`] if the table cannot be decoded.
    pub fn schema(&self, name: &str) -> Result<Option<&ColumnTypes>> {
        let schemas = get_or_try_init(&self.schemas, || self.load())?;
        Ok(schemas.get(name))
    }

    /// Columns of `name` whose logical type is one of `types`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Asset`] if the table cannot be decoded.
    pub fn by_logical_type(&self, name: &str, types: &[LogicalType]) -> Result<Vec<String>> {
        Ok(self
            .schema(name)?
            .into_iter()
            .flatten()
            .filter(|(_, logical)| types.contains(logical))
            .map(|(column, _)| column.clone())
            .collect())
    }

    /// Temporal column hints for a row, empty unless the row is tabular and
    /// declares a schema.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Asset`] if the table cannot be decoded.
    pub fn column_hints(&self, row: &MetadataRow) -> Result<ColumnTypes> {
        if !(row.is_tabular && row.has_schema) {
            return Ok(ColumnTypes::new());
        }
        Ok(self
            .schema(&row.dataset_name)?
            .into_iter()
            .flatten()
            .filter(|(_, logical)| logical.is_temporal())
            .map(|(column, logical)| (column.clone(), *logical))
            .collect())
    }

    fn load(&self) -> Result<HashMap<String, ColumnTypes>> {
        let data = self.asset.decode()?;
        let schemas: HashMap<String, ColumnTypes> =
            serde_json::from_slice(&data).map_err(|err| IoError::Asset {
                name: self.asset.name().to_string(),
                message: err.to_string(),
            })?;
        debug!("Loaded {} schemas from {}", schemas.len(), self.asset.name());
        Ok(schemas)
    }
}

static URL_CACHE: OnceLock<UrlCache> = OnceLock::new();
static SCHEMA_CACHE: OnceLock<SchemaCache> = OnceLock::new();

/// The process-wide url table.
pub fn url_cache() -> &'static UrlCache {
    URL_CACHE.get_or_init(UrlCache::embedded)
}

/// The process-wide schema table.
pub fn schema_cache() -> &'static SchemaCache {
    SCHEMA_CACHE.get_or_init(SchemaCache::embedded)
}
