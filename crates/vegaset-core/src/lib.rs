//! `vegaset-core` resolves dataset requests against a versioned catalog, picks a
//! backend that can parse the chosen artifact, and caches downloads on disk.
//!
//! This crate includes:
//! - **Catalog**: the embedded, versioned list of dataset artifacts.
//! - **Resolver**: request parsing and capability resolution per backend.
//! - **Backends**: dependency probing and registry construction.
//! - **Cache**: content-addressed storage under `VEGASET_DATASETS_DIR`.
//!
//! The [`load`] and [`resolve_url`] functions use a process-wide [`Loader`].

pub mod assets;
pub mod backends;
pub mod cache;
pub mod catalog;
pub mod error;
pub mod loader;
pub mod resolver;
pub mod side_cache;
pub mod transport;

pub use backends::{
    BackendId, BackendStatus, CompiledFeatures, DependencyProbe, Probe, backend_report, probe,
    select_backend,
};
pub use cache::{CACHE_ENV_VAR, CacheLocation, DatasetCache, DownloadSummary};
pub use catalog::{CatalogTable, MetadataCatalog};
pub use error::{
    BackendError, CacheError, CapabilityError, IoError, QueryError, Result, VegasetError,
};
pub use loader::{Loader, default_loader, load, resolve_url};
pub use resolver::{DatasetQuery, Profile, Reader, Resolved};
pub use transport::{HttpOpener, Opener, TransportError};
pub use vegaset_core_common::{LogicalType, ReadOptions};
