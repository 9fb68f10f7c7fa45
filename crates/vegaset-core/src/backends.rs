//! Backend selection and the capability registries each backend provides.
//!
//! A backend is a named set of parse functions plus the cargo features it needs.
//! Selection is two-phase: every candidate is probed with a side-effect-free
//! [`DependencyProbe`], and only the first one that passes is built.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use log::debug;
use vegaset_arrow::{ArrowIpcReader, CsvReader, CsvScanner, JsonReader, TsvReader};
use vegaset_core_common::constraints::{
    is_arrow, is_csv, is_json, is_not_tabular, is_tsv,
};
use vegaset_core_common::{
    CapabilityBinding, CapabilityRegistry, ConstraintSet, DataReader, DataScanner,
};

use crate::catalog::MetadataCatalog;
use crate::error::{BackendError, CapabilityError, Result};
use crate::resolver::Reader;

/// Identifier of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendId {
    /// Arrow readers plus `GeoJSON` (and Parquet when compiled)
    ArrowGeoJson,
    /// Arrow readers plus Parquet
    ArrowParquet,
    /// Arrow readers for csv, tsv, json and Arrow IPC
    Arrow,
}

impl BackendId {
    /// Every backend, in default priority order.
    pub const ALL: [BackendId; 3] = [
        BackendId::ArrowGeoJson,
        BackendId::ArrowParquet,
        BackendId::Arrow,
    ];

    /// Order in which [`Reader::infer`] tries backends.
    pub const DEFAULT_PRIORITY: [BackendId; 3] = Self::ALL;

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            BackendId::ArrowGeoJson => "arrow[geojson]",
            BackendId::ArrowParquet => "arrow[parquet]",
            BackendId::Arrow => "arrow",
        }
    }

    /// Packages the backend needs, each a cargo feature of `vegaset-core`
    /// except the always-present `arrow`.
    #[must_use]
    pub const fn requirements(self) -> &'static [&'static str] {
        match self {
            BackendId::ArrowGeoJson => &["arrow", "geojson"],
            BackendId::ArrowParquet => &["arrow", "parquet"],
            BackendId::Arrow => &["arrow"],
        }
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendId {
    type Err = BackendError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        BackendId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| BackendError::UnknownBackend {
                name: s.to_string(),
                available: join(BackendId::ALL.iter().map(|id| id.as_str())),
            })
    }
}

/// Side-effect-free check for whether a named package is present.
pub trait DependencyProbe {
    fn is_available(&self, dependency: &str) -> bool;
}

/// Probe answering from the cargo features this crate was compiled with.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompiledFeatures;

impl DependencyProbe for CompiledFeatures {
    fn is_available(&self, dependency: &str) -> bool {
        match dependency {
            "arrow" => true,
            "parquet" => cfg!(feature = "parquet"),
            "geojson" => cfg!(feature = "geojson"),
            _ => false,
        }
    }
}

/// Result of probing one backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Available,
    /// The first requirement that is not present
    Missing(&'static str),
}

impl Probe {
    #[must_use]
    pub fn is_available(self) -> bool {
        self == Probe::Available
    }
}

/// Checks every requirement of `backend`, stopping at the first missing one.
pub fn probe(backend: BackendId, deps: &dyn DependencyProbe) -> Probe {
    let missing = backend
        .requirements()
        .iter()
        .copied()
        .find(|dependency| !deps.is_available(dependency));
    debug!("Probed backend '{backend}': missing {missing:?}");
    missing.map_or(Probe::Available, Probe::Missing)
}

/// Returns the first available backend of `priority`.
///
/// Backends after the first available one are never probed.
///
/// # Errors
///
/// Returns [`BackendError::NoSupportedBackend`] listing the whole priority list
/// when none is available.
pub fn select_backend(priority: &[BackendId], deps: &dyn DependencyProbe) -> Result<BackendId> {
    priority
        .iter()
        .copied()
        .find(|backend| probe(*backend, deps).is_available())
        .ok_or_else(|| {
            BackendError::NoSupportedBackend {
                tried: join(priority.iter().map(|id| id.as_str())),
            }
            .into()
        })
}

/// Availability of one backend, for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendStatus {
    pub id: BackendId,
    pub requirements: &'static [&'static str],
    pub probe: Probe,
}

/// Every backend with its requirements and availability, in priority order.
#[must_use]
pub fn backend_report(deps: &dyn DependencyProbe) -> Vec<BackendStatus> {
    BackendId::ALL
        .into_iter()
        .map(|id| BackendStatus {
            id,
            requirements: id.requirements(),
            probe: probe(id, deps),
        })
        .collect()
}

fn join<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(", ")
}

fn bind<F: ?Sized>(
    reader: Arc<F>,
    include: ConstraintSet,
    exclude: Option<ConstraintSet>,
) -> Result<CapabilityBinding<F>> {
    Ok(CapabilityBinding::new(reader, include, exclude).map_err(CapabilityError::from)?)
}

type ReadBindings = Vec<CapabilityBinding<dyn DataReader>>;

fn arrow_bindings() -> Result<ReadBindings> {
    Ok(vec![
        bind(Arc::new(CsvReader) as Arc<dyn DataReader>, is_csv(), None)?,
        bind(
            Arc::new(JsonReader) as Arc<dyn DataReader>,
            is_json(),
            Some(is_not_tabular()),
        )?,
        bind(Arc::new(TsvReader) as Arc<dyn DataReader>, is_tsv(), None)?,
        bind(Arc::new(ArrowIpcReader) as Arc<dyn DataReader>, is_arrow(), None)?,
    ])
}

#[cfg(feature = "parquet")]
fn parquet_bindings() -> Result<ReadBindings> {
    use vegaset_arrow::ParquetReader;
    use vegaset_core_common::constraints::is_parquet;

    Ok(vec![bind(
        Arc::new(ParquetReader) as Arc<dyn DataReader>,
        is_parquet(),
        None,
    )?])
}

#[cfg(not(feature = "parquet"))]
fn parquet_bindings() -> Result<ReadBindings> {
    Ok(Vec::new())
}

#[cfg(feature = "geojson")]
fn geojson_bindings() -> Result<ReadBindings> {
    use vegaset_core_common::constraints::{is_spatial, is_topo};
    use vegaset_core_common::{Attr, Suffix};
    use vegaset_geojson::GeoJsonReader;

    Ok(vec![bind(
        Arc::new(GeoJsonReader) as Arc<dyn DataReader>,
        is_spatial().with(Attr::Suffix, Suffix::Json),
        Some(is_topo()),
    )?])
}

#[cfg(not(feature = "geojson"))]
fn geojson_bindings() -> Result<ReadBindings> {
    Ok(Vec::new())
}

/// The eager registry of `backend`, in resolution order.
///
/// # Errors
///
/// Returns [`CapabilityError::InvalidBinding`] if a binding is malformed.
pub fn read_registry(backend: BackendId) -> Result<CapabilityRegistry<dyn DataReader>> {
    let bindings = match backend {
        BackendId::Arrow => arrow_bindings()?,
        BackendId::ArrowParquet => {
            let mut bindings = arrow_bindings()?;
            bindings.extend(parquet_bindings()?);
            bindings
        },
        BackendId::ArrowGeoJson => {
            let mut bindings = geojson_bindings()?;
            bindings.extend(arrow_bindings()?);
            bindings.extend(parquet_bindings()?);
            bindings
        },
    };
    Ok(CapabilityRegistry::new(bindings))
}

/// The streaming registry used to read the catalog.
///
/// # Errors
///
/// Returns [`CapabilityError::InvalidBinding`] if the binding is malformed.
pub fn scan_registry() -> Result<CapabilityRegistry<dyn DataScanner>> {
    Ok(CapabilityRegistry::new(vec![bind(
        Arc::new(CsvScanner) as Arc<dyn DataScanner>,
        is_csv(),
        None,
    )?]))
}

impl Reader {
    /// Builds the reader of `backend` over the embedded catalog.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::MissingDependency`] if a requirement is not compiled in.
    pub fn from_backend(backend: BackendId) -> Result<Self> {
        Self::from_backend_with(backend, &CompiledFeatures)
    }

    /// Like [`Reader::from_backend`], checking requirements with `deps`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::MissingDependency`] if `deps` lacks a requirement.
    pub fn from_backend_with(backend: BackendId, deps: &dyn DependencyProbe) -> Result<Self> {
        if let Probe::Missing(missing) = probe(backend, deps) {
            return Err(BackendError::MissingDependency {
                backend: backend.to_string(),
                requirements: join_quoted(backend.requirements()),
                missing: missing.to_string(),
            }
            .into());
        }
        debug!("Building backend '{backend}'");
        Ok(Self::new(
            backend,
            read_registry(backend)?,
            scan_registry()?,
            MetadataCatalog::embedded(),
        ))
    }

    /// Builds the first available backend of [`BackendId::DEFAULT_PRIORITY`].
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NoSupportedBackend`] if none is available.
    pub fn infer() -> Result<Self> {
        let backend = select_backend(&BackendId::DEFAULT_PRIORITY, &CompiledFeatures)?;
        Self::from_backend(backend)
    }
}

fn join_quoted(names: &[&str]) -> String {
    names
        .iter()
        .map(|name| format!("'{name}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashSet;

    use super::*;

    /// Probe with an explicit set of installed packages that records every check.
    struct Installed {
        present: HashSet<&'static str>,
        checked: RefCell<Vec<String>>,
    }

    impl Installed {
        fn new(present: &[&'static str]) -> Self {
            Self {
                present: present.iter().copied().collect(),
                checked: RefCell::new(Vec::new()),
            }
        }
    }

    impl DependencyProbe for Installed {
        fn is_available(&self, dependency: &str) -> bool {
            self.checked.borrow_mut().push(dependency.to_string());
            self.present.contains(dependency)
        }
    }

    #[test]
    fn test_backend_names_round_trip() {
        for id in BackendId::ALL {
            assert_eq!(id.as_str().parse::<BackendId>().unwrap(), id);
        }
        let err = "polars".parse::<BackendId>().unwrap_err();
        assert!(err.to_string().contains("arrow[geojson], arrow[parquet], arrow"));
    }

    #[test]
    fn test_probe_reports_first_missing() {
        let deps = Installed::new(&["arrow"]);
        assert_eq!(probe(BackendId::ArrowParquet, &deps), Probe::Missing("parquet"));
        assert_eq!(probe(BackendId::Arrow, &deps), Probe::Available);
    }

    #[test]
    fn test_select_stops_at_first_available() {
        let deps = Installed::new(&["arrow", "parquet"]);
        let selected = select_backend(&BackendId::DEFAULT_PRIORITY, &deps).unwrap();

        assert_eq!(selected, BackendId::ArrowParquet);
        // arrow[geojson] fails on geojson, arrow[parquet] passes, arrow is never probed
        assert_eq!(
            *deps.checked.borrow(),
            vec!["arrow", "geojson", "arrow", "parquet"]
        );
    }

    #[test]
    fn test_no_supported_backend_lists_priority() {
        let deps = Installed::new(&[]);
        let err = select_backend(&BackendId::DEFAULT_PRIORITY, &deps).unwrap_err();

        assert_eq!(
            err.to_string(),
            "Found no supported backend, tried:\n    arrow[geojson], arrow[parquet], arrow"
        );
    }

    #[test]
    fn test_missing_dependency_names_command() {
        let deps = Installed::new(&["arrow"]);
        let err = Reader::from_backend_with(BackendId::ArrowGeoJson, &deps).unwrap_err();

        let message = err.to_string();
        assert!(message.contains("'arrow', 'geojson'"), "{message}");
        assert!(message.contains("cargo add vegaset-core --features geojson"), "{message}");
    }

    #[test]
    fn test_arrow_registry_order() {
        let registry = read_registry(BackendId::Arrow).unwrap();
        let names: Vec<_> = registry.iter().map(|b| b.reader().name()).collect();
        assert_eq!(names, vec!["read_csv", "read_json", "read_tsv", "read_ipc"]);
    }

    #[cfg(all(feature = "geojson", feature = "parquet"))]
    #[test]
    fn test_geojson_registry_puts_spatial_first() {
        let registry = read_registry(BackendId::ArrowGeoJson).unwrap();
        let names: Vec<_> = registry.iter().map(|b| b.reader().name()).collect();
        assert_eq!(
            names,
            vec![
                "read_geojson",
                "read_csv",
                "read_json",
                "read_tsv",
                "read_ipc",
                "read_parquet"
            ]
        );
    }

    #[test]
    fn test_report_covers_every_backend() {
        let report = backend_report(&CompiledFeatures);
        assert_eq!(report.len(), 3);
        assert_eq!(report[2].id, BackendId::Arrow);
        assert!(report[2].probe.is_available());
    }
}
