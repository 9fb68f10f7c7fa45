//! Resolution of dataset requests to catalog rows and parse functions.
//!
//! A [`Reader`] pairs one backend's capability registries with a catalog. It
//! answers three questions for a request:
//!
//! 1. which artifact is meant ([`Reader::query`]),
//! 2. which parse function reads it ([`Reader::resolve`]),
//! 3. where it can be fetched from ([`Reader::url`]).

use std::sync::Arc;

use log::debug;
use vegaset_core_common::constraints::is_meta;
use vegaset_core_common::metadata::known_suffixes;
use vegaset_core_common::{
    Attr, CapabilityRegistry, ConstraintSet, DataReader, DataScanner, MetadataRow, Resolution,
    Suffix,
};

use crate::backends::BackendId;
use crate::catalog::{CatalogTable, MetadataCatalog};
use crate::error::{CapabilityError, QueryError, Result};

/// A parsed `(name, suffix, tag)` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetQuery {
    pub name: String,
    pub suffix: Option<Suffix>,
    pub tag: Option<String>,
}

impl DatasetQuery {
    /// Parses a request.
    ///
    /// A `name` ending in a known extension, such as `"cars.json"`, is split into
    /// name and suffix, and the `suffix` and `tag` arguments are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidArgument`] if `suffix` is not a known extension.
    ///
    /// # Examples
    ///
    /// ```
    /// use vegaset_core::DatasetQuery;
    /// use vegaset_core_common::Suffix;
    ///
    /// let query = DatasetQuery::parse("cars.json", None, Some("v2.11.0")).unwrap();
    /// assert_eq!(query.name, "cars");
    /// assert_eq!(query.suffix, Some(Suffix::Json));
    /// assert_eq!(query.tag, None);
    /// ```
    pub fn parse(name: &str, suffix: Option<&str>, tag: Option<&str>) -> Result<Self> {
        if let Some((stem, suffix)) = Suffix::split_file_name(name) {
            return Ok(Self {
                name: stem.to_string(),
                suffix: Some(suffix),
                tag: None,
            });
        }

        let suffix = suffix
            .map(str::parse::<Suffix>)
            .transpose()
            .map_err(|err| QueryError::InvalidArgument {
                argument: "suffix".to_string(),
                value: err.value,
                expected: format!("({})", known_suffixes()),
            })?;
        Ok(Self {
            name: name.to_string(),
            suffix,
            tag: tag.map(str::to_string),
        })
    }

    /// `true` for a plain name without suffix or tag.
    #[must_use]
    pub fn is_bare(&self) -> bool {
        self.suffix.is_none() && self.tag.is_none()
    }

    /// The catalog filter for this request.
    #[must_use]
    pub fn constraints(&self) -> ConstraintSet {
        let mut constraints = is_meta([(Attr::DatasetName, self.name.as_str())]);
        if let Some(suffix) = self.suffix {
            constraints = constraints.with(Attr::Suffix, suffix);
        }
        if let Some(tag) = &self.tag {
            constraints = constraints.with(Attr::Tag, tag.as_str());
        }
        constraints
    }
}

/// A catalog row together with the parse function that reads it.
#[derive(Clone)]
pub struct Resolved {
    pub row: MetadataRow,
    pub reader: Arc<dyn DataReader>,
}

impl std::fmt::Debug for Resolved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolved")
            .field("row", &self.row)
            .field("reader", &self.reader.name())
            .finish()
    }
}

/// How the active backend treats one catalog row.
#[derive(Debug, Clone)]
pub struct Profile {
    pub row: MetadataRow,
    /// `"applies"`, `"refused"`, or `"no-capability"`
    pub outcome: &'static str,
    /// Name of the parse function, when one applies
    pub reader: Option<&'static str>,
}

/// Capability registries of one backend over a catalog.
pub struct Reader {
    backend: BackendId,
    read: CapabilityRegistry<dyn DataReader>,
    scan: CapabilityRegistry<dyn DataScanner>,
    catalog: MetadataCatalog,
}

impl std::fmt::Debug for Reader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reader")
            .field("backend", &self.backend)
            .field("read", &self.read)
            .field("scan", &self.scan)
            .finish_non_exhaustive()
    }
}

impl Reader {
    /// Assembles a reader from explicit registries.
    ///
    /// Most callers want [`Reader::from_backend`] or [`Reader::infer`].
    #[must_use]
    pub fn new(
        backend: BackendId,
        read: CapabilityRegistry<dyn DataReader>,
        scan: CapabilityRegistry<dyn DataScanner>,
        catalog: MetadataCatalog,
    ) -> Self {
        Self {
            backend,
            read,
            scan,
            catalog,
        }
    }

    /// Replaces the catalog, keeping both registries.
    #[must_use]
    pub fn with_catalog(mut self, catalog: MetadataCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    #[must_use]
    pub fn backend(&self) -> BackendId {
        self.backend
    }

    #[must_use]
    pub fn catalog(&self) -> &MetadataCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn read_registry(&self) -> &CapabilityRegistry<dyn DataReader> {
        &self.read
    }

    /// The decoded catalog, scanned on first use with this backend's scanner.
    ///
    /// # Errors
    ///
    /// Returns an error if no scanner applies to the catalog asset or the scan fails.
    pub fn catalog_table(&self) -> Result<&CatalogTable> {
        let scanner = self.scan_fn(&self.catalog.scan_attrs())?;
        self.catalog.table(scanner.as_ref())
    }

    /// The first catalog row matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Empty`] when no row matches.
    pub fn query(&self, query: &DatasetQuery) -> Result<MetadataRow> {
        self.catalog_table()?.first(&query.constraints())
    }

    /// The row matching `query` and the parse function that reads it.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Empty`] when no row matches, or a
    /// [`CapabilityError`] when this backend cannot read the row.
    pub fn resolve(&self, query: &DatasetQuery) -> Result<Resolved> {
        let row = self.query(query)?;
        let reader = self.read_fn(&row)?;
        debug!(
            "Resolved {} ({}) to {} on {}",
            row.file_name,
            row.tag,
            reader.name(),
            self.backend
        );
        Ok(Resolved { row, reader })
    }

    /// The parse function for `row`.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::Refused`] when a binding recognizes the row but
    /// excludes it, or [`CapabilityError::NoCapability`] when no binding is relevant.
    pub fn read_fn(&self, row: &MetadataRow) -> Result<Arc<dyn DataReader>> {
        match self.read.resolve(&row.attrs()) {
            Resolution::Applies(reader) => Ok(Arc::clone(reader)),
            Resolution::Refused(binding) => Err(self.refusal(row, binding.exclude()).into()),
            Resolution::NoCapability if row.is_image => {
                Err(self.refusal(row, &ConstraintSet::empty()).into())
            },
            Resolution::NoCapability => Err(CapabilityError::NoCapability {
                backend: self.backend.to_string(),
                row: identify(row).to_string(),
            }
            .into()),
        }
    }

    /// The streaming scanner for artifacts with `attrs`.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::NoCapability`] if no scan binding applies.
    pub fn scan_fn(&self, attrs: &ConstraintSet) -> Result<Arc<dyn DataScanner>> {
        match self.scan.resolve(attrs) {
            Resolution::Applies(scanner) => Ok(Arc::clone(scanner)),
            Resolution::Refused(_) | Resolution::NoCapability => {
                Err(CapabilityError::NoCapability {
                    backend: self.backend.to_string(),
                    row: attrs.to_string(),
                }
                .into())
            },
        }
    }

    /// The remote url of the artifact matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnresolvableViaUrl`] for Parquet artifacts, which
    /// must be downloaded in full before they can be read.
    pub fn url(&self, query: &DatasetQuery) -> Result<String> {
        let row = self.query(query)?;
        if row.suffix == Suffix::Parquet {
            return Err(QueryError::UnresolvableViaUrl {
                dataset: row.dataset_name,
                file_name: row.file_name,
            }
            .into());
        }
        Ok(row.url)
    }

    /// Tag of the newest catalog version.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be scanned or is empty.
    pub fn latest_tag(&self) -> Result<String> {
        let table = self.catalog_table()?;
        table.latest_tag().map(str::to_string).ok_or_else(|| {
            QueryError::Empty {
                filter: "is_meta()".to_string(),
            }
            .into()
        })
    }

    /// How this backend treats every row of the newest catalog version.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be scanned.
    pub fn profile(&self) -> Result<Vec<Profile>> {
        let rows = self.catalog_table()?.latest_rows()?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let (outcome, reader) = match self.read.resolve(&row.attrs()) {
                    Resolution::Applies(reader) => ("applies", Some(reader.name())),
                    Resolution::NoCapability if row.is_image => ("refused", None),
                    other => (other.label(), None),
                };
                Profile {
                    row,
                    outcome,
                    reader,
                }
            })
            .collect())
    }

    fn refusal(&self, row: &MetadataRow, exclude: &ConstraintSet) -> CapabilityError {
        let reason = if row.is_image {
            "Image data is non-tabular.".to_string()
        } else if row.is_topo {
            "TopoJSON data has no tabular representation.".to_string()
        } else if row.is_geo && self.backend != BackendId::ArrowGeoJson {
            "GeoJSON data needs a spatial reader.".to_string()
        } else if row.is_nontabular_json() {
            "JSON data without a row structure is non-tabular.".to_string()
        } else {
            format!("Excluded by {exclude}.")
        };

        let alternative = if row.is_geo && self.backend != BackendId::ArrowGeoJson {
            format!(
                "Use the '{}' backend (cargo feature 'geojson'), or request only its url:\n    vegaset url {}",
                BackendId::ArrowGeoJson,
                row.file_name
            )
        } else {
            format!(
                "Request only its url instead:\n    vegaset url {}",
                row.file_name
            )
        };

        CapabilityError::Refused {
            file_name: row.file_name.clone(),
            backend: self.backend.to_string(),
            reason,
            alternative,
        }
    }
}

/// The fields that identify a row to a reader of an error message.
fn identify(row: &MetadataRow) -> ConstraintSet {
    is_meta([
        (Attr::DatasetName, row.dataset_name.as_str()),
        (Attr::FileName, row.file_name.as_str()),
        (Attr::Tag, row.tag.as_str()),
    ])
    .with(Attr::Suffix, row.suffix)
}
