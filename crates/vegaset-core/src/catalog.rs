//! The versioned catalog of dataset artifacts.
//!
//! The catalog is an embedded, gzip-compressed CSV with one row per artifact and
//! catalog version. Rows are ordered latest tag first, then by dataset name, then
//! by ascending size, so the first match of any filter is the most specific
//! artifact of the newest version.
//!
//! The table is decoded lazily, once, through the streaming scanner of the active
//! backend.

use std::sync::OnceLock;

use arrow::array::RecordBatch;
use arrow::compute::filter_record_batch;
use log::debug;
use vegaset_core_common::constraints::is_meta;
use vegaset_core_common::{
    Attr, ConstraintSet, DataScanner, MetadataRow, ReadOptions, Source, Suffix,
};

use crate::assets::Asset;
use crate::error::{CapabilityError, IoErrorExt, QueryError, Result};

/// Returns the value of `cell`, initializing it with `init` on first use.
///
/// If two threads race, both run `init` and the first value stored wins.
pub(crate) fn get_or_try_init<T>(
    cell: &OnceLock<T>,
    init: impl FnOnce() -> Result<T>,
) -> Result<&T> {
    if let Some(value) = cell.get() {
        return Ok(value);
    }
    let value = init()?;
    Ok(cell.get_or_init(|| value))
}

/// Lazily decoded catalog backed by an embedded asset.
#[derive(Debug)]
pub struct MetadataCatalog {
    asset: Asset,
    embedded: bool,
    table: OnceLock<CatalogTable>,
}

impl Default for MetadataCatalog {
    fn default() -> Self {
        Self::embedded()
    }
}

impl MetadataCatalog {
    /// The catalog compiled into this crate.
    #[must_use]
    pub fn embedded() -> Self {
        Self {
            embedded: true,
            ..Self::from_asset(Asset::metadata())
        }
    }

    /// A catalog over custom bytes, such as a small fixture in tests.
    ///
    /// `name` decides the encoding: `metadata.csv.gz` is decompressed first,
    /// `metadata.csv` is read as is.
    #[must_use]
    pub fn from_bytes(name: impl Into<String>, data: impl Into<bytes::Bytes>) -> Self {
        Self::from_asset(Asset::new(name, data))
    }

    fn from_asset(asset: Asset) -> Self {
        Self {
            asset,
            embedded: false,
            table: OnceLock::new(),
        }
    }

    /// `true` for the catalog compiled into this crate, which the side caches describe.
    #[must_use]
    pub fn is_embedded(&self) -> bool {
        self.embedded
    }

    /// Attributes a scan registry resolves against to find the catalog scanner.
    #[must_use]
    pub fn scan_attrs(&self) -> ConstraintSet {
        let name = self.asset.name();
        let suffix = Suffix::split_file_name(name.strip_suffix(".gz").unwrap_or(name))
            .map_or(Suffix::Csv, |(_, suffix)| suffix);
        is_meta([(Attr::Suffix, suffix)])
    }

    /// Returns the decoded table, scanning the asset on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the asset cannot be decompressed or scanned.
    pub fn table(&self, scanner: &dyn DataScanner) -> Result<&CatalogTable> {
        get_or_try_init(&self.table, || self.load(scanner))
    }

    fn load(&self, scanner: &dyn DataScanner) -> Result<CatalogTable> {
        let name = self.asset.name().to_string();
        debug!("Scanning catalog '{name}' with {}", scanner.name());

        let source = Source::Bytes {
            name: name.clone(),
            data: self.asset.decode()?,
        };
        let options = ReadOptions::default().with_schema(MetadataRow::schema());
        let batches = scanner
            .scan(source, &options)
            .with_read_context(scanner.name(), name.as_str())?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(anyhow::Error::from)
            .with_read_context(scanner.name(), name.as_str())?;

        let table = CatalogTable::new(batches).with_read_context(scanner.name(), name)?;
        debug!(
            "Catalog holds {} rows, latest tag {:?}",
            table.num_rows(),
            table.latest_tag()
        );
        Ok(table)
    }
}

/// The decoded catalog: Arrow batches in canonical row order.
#[derive(Debug, Clone)]
pub struct CatalogTable {
    batches: Vec<RecordBatch>,
    latest_tag: Option<String>,
}

impl CatalogTable {
    /// Wraps decoded batches; the latest tag is the tag of the first row.
    ///
    /// # Errors
    ///
    /// Returns an error if the first row cannot be decoded.
    pub fn new(batches: Vec<RecordBatch>) -> anyhow::Result<Self> {
        let batches: Vec<_> = batches
            .into_iter()
            .filter(|batch| batch.num_rows() > 0)
            .collect();
        let latest_tag = match batches.first() {
            Some(batch) => Some(MetadataRow::from_batch(batch, 0)?.tag),
            None => None,
        };
        Ok(Self {
            batches,
            latest_tag,
        })
    }

    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    #[must_use]
    pub fn latest_tag(&self) -> Option<&str> {
        self.latest_tag.as_deref()
    }

    /// The first row matching every constraint.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Empty`] naming the filter when nothing matches.
    pub fn first(&self, constraints: &ConstraintSet) -> Result<MetadataRow> {
        let predicate = constraints.compile().map_err(CapabilityError::from)?;
        for batch in &self.batches {
            let mask = predicate.evaluate(batch).map_err(anyhow::Error::from)?;
            let filtered = filter_record_batch(batch, &mask).map_err(anyhow::Error::from)?;
            if filtered.num_rows() > 0 {
                return Ok(MetadataRow::from_batch(&filtered, 0).map_err(anyhow::Error::from)?);
            }
        }
        Err(QueryError::Empty {
            filter: constraints.to_string(),
        }
        .into())
    }

    /// Every row matching the constraints, in catalog order.
    ///
    /// An empty set matches every row.
    ///
    /// # Errors
    ///
    /// Returns an error if a batch cannot be filtered or decoded.
    pub fn rows(&self, constraints: &ConstraintSet) -> Result<Vec<MetadataRow>> {
        if constraints.is_empty() {
            return self.all_rows();
        }
        let predicate = constraints.compile().map_err(CapabilityError::from)?;
        let mut rows = Vec::new();
        for batch in &self.batches {
            let mask = predicate.evaluate(batch).map_err(anyhow::Error::from)?;
            let filtered = filter_record_batch(batch, &mask).map_err(anyhow::Error::from)?;
            rows.extend(MetadataRow::all_from_batch(&filtered).map_err(anyhow::Error::from)?);
        }
        Ok(rows)
    }

    /// Every row of every catalog version.
    ///
    /// # Errors
    ///
    /// Returns an error if a batch cannot be decoded.
    pub fn all_rows(&self) -> Result<Vec<MetadataRow>> {
        let mut rows = Vec::with_capacity(self.num_rows());
        for batch in &self.batches {
            rows.extend(MetadataRow::all_from_batch(batch).map_err(anyhow::Error::from)?);
        }
        Ok(rows)
    }

    /// Rows of the latest catalog version only.
    ///
    /// # Errors
    ///
    /// Returns an error if a batch cannot be filtered or decoded.
    pub fn latest_rows(&self) -> Result<Vec<MetadataRow>> {
        match &self.latest_tag {
            Some(tag) => self.rows(&is_meta([(Attr::Tag, tag.as_str())])),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use vegaset_arrow::CsvScanner;

    use super::*;

    const FIXTURE: &str = "\
dataset_name,suffix,file_name,bytes,is_image,is_tabular,is_geo,is_topo,is_spatial,is_json,has_schema,sha,url,tag
cars,.json,cars.json,100492,false,true,false,false,false,true,true,3bb67023,https://example.org/v2/cars.json,v2.0.0
stocks,.csv,stocks.csv,12245,false,true,false,false,false,false,true,7f4951f5,https://example.org/v2/stocks.csv,v2.0.0
cars,.json,cars.json,100492,false,true,false,false,false,true,true,d07c19a7,https://example.org/v1/cars.json,v1.0.0
";

    fn catalog() -> MetadataCatalog {
        MetadataCatalog::from_bytes("metadata.csv", FIXTURE.as_bytes().to_vec())
    }

    #[test]
    fn test_embedded_catalog_scans() {
        let catalog = MetadataCatalog::embedded();
        let table = catalog.table(&CsvScanner).unwrap();

        assert!(table.num_rows() > 0);
        assert_eq!(table.latest_tag(), Some("v3.2.0"));
    }

    #[test]
    fn test_first_prefers_latest_tag() {
        let catalog = catalog();
        let table = catalog.table(&CsvScanner).unwrap();

        let row = table
            .first(&is_meta([(Attr::DatasetName, "cars")]))
            .unwrap();
        assert_eq!(row.tag, "v2.0.0");
        assert_eq!(row.sha, "3bb67023");
    }

    #[test]
    fn test_first_with_tag() {
        let catalog = catalog();
        let table = catalog.table(&CsvScanner).unwrap();

        let row = table
            .first(&is_meta([(Attr::DatasetName, "cars"), (Attr::Tag, "v1.0.0")]))
            .unwrap();
        assert_eq!(row.sha, "d07c19a7");
    }

    #[test]
    fn test_no_match_is_query_empty() {
        let catalog = catalog();
        let table = catalog.table(&CsvScanner).unwrap();

        let err = table
            .first(&is_meta([(Attr::DatasetName, "flights")]))
            .unwrap_err();
        assert!(err.to_string().starts_with("Found no results for:"), "{err}");
    }

    #[test]
    fn test_latest_rows() {
        let catalog = catalog();
        let table = catalog.table(&CsvScanner).unwrap();

        let latest = table.latest_rows().unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(table.all_rows().unwrap().len(), 3);
    }

    #[test]
    fn test_scan_attrs_follow_asset_name() {
        assert_eq!(
            MetadataCatalog::embedded().scan_attrs().get(Attr::Suffix),
            Some(&Suffix::Csv.into())
        );
    }
}
