//! Public entry points: loading datasets, resolving urls and managing the cache.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use arrow::array::RecordBatch;
use log::{debug, info};
use vegaset_core_common::ReadOptions;

use crate::backends::BackendId;
use crate::cache::{DatasetCache, DownloadSummary};
use crate::catalog::get_or_try_init;
use crate::error::{IoErrorExt, Result};
use crate::resolver::{DatasetQuery, Reader, Resolved};
use crate::side_cache::{schema_cache, url_cache};

/// A backend's [`Reader`] together with a [`DatasetCache`].
#[derive(Debug)]
pub struct Loader {
    reader: Reader,
    cache: DatasetCache,
}

impl Loader {
    /// Loader for `backend`, caching in `VEGASET_DATASETS_DIR` when set.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::MissingDependency`](crate::BackendError) if the
    /// backend is not compiled in.
    pub fn from_backend(backend: BackendId) -> Result<Self> {
        Ok(Self::with_parts(
            Reader::from_backend(backend)?,
            DatasetCache::from_env(),
        ))
    }

    /// Loader for the first available backend.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NoSupportedBackend`](crate::BackendError) if no
    /// backend is compiled in.
    pub fn infer() -> Result<Self> {
        Ok(Self::with_parts(Reader::infer()?, DatasetCache::from_env()))
    }

    #[must_use]
    pub fn with_parts(reader: Reader, cache: DatasetCache) -> Self {
        Self { reader, cache }
    }

    #[must_use]
    pub fn reader(&self) -> &Reader {
        &self.reader
    }

    #[must_use]
    pub fn cache(&self) -> &DatasetCache {
        &self.cache
    }

    /// Loads a dataset into one record batch.
    ///
    /// Published temporal column types are added to `options` as hints, unless
    /// `options` already hints the same column.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is invalid, matches nothing, cannot be read
    /// by the backend, or fails to download or parse.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use vegaset_core::{Loader, ReadOptions};
    ///
    /// let loader = Loader::infer()?;
    /// let stocks = loader.load("stocks", None, None, ReadOptions::default())?;
    /// assert_eq!(stocks.num_columns(), 3);
    /// # Ok::<(), vegaset_core::VegasetError>(())
    /// ```
    pub fn load(
        &self,
        name: &str,
        suffix: Option<&str>,
        tag: Option<&str>,
        options: ReadOptions,
    ) -> Result<RecordBatch> {
        let query = DatasetQuery::parse(name, suffix, tag)?;
        let Resolved { row, reader } = self.reader.resolve(&query)?;
        let options = options.merge_hints(schema_cache().column_hints(&row)?);

        let source = self.cache.fetch(&row)?;
        let source_name = source.describe();
        info!("Loading {} ({}) with {}", row.file_name, row.tag, reader.name());
        reader
            .read(source, &options)
            .with_read_context(reader.name(), source_name)
    }

    /// The remote url of a dataset.
    ///
    /// Bare names are answered from the url side table when the embedded catalog
    /// is in use; everything else goes through the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnresolvableViaUrl`](crate::QueryError) for Parquet
    /// artifacts, or an error if the request matches nothing.
    pub fn url(&self, name: &str, suffix: Option<&str>, tag: Option<&str>) -> Result<String> {
        let query = DatasetQuery::parse(name, suffix, tag)?;
        if query.is_bare()
            && self.reader.catalog().is_embedded()
            && let Some(url) = url_cache().get(&query.name)?
        {
            debug!("Url of '{}' answered from the url table", query.name);
            return Ok(url.to_string());
        }
        self.reader.url(&query)
    }

    /// The cache directory, created if needed.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NotConfigured`](crate::CacheError) when caching is disabled.
    pub fn cache_path(&self) -> Result<PathBuf> {
        self.cache.path()
    }

    /// Enables caching in `dir`, or disables it with `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if a relative path cannot be made absolute.
    pub fn set_cache_path(&self, dir: Option<&Path>) -> Result<()> {
        self.cache.set_path(dir)
    }

    /// Deletes every cached artifact the catalog knows. Returns the count removed.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NotConfigured`](crate::CacheError) when caching is disabled.
    pub fn clear_cache(&self) -> Result<usize> {
        self.cache.path()?;
        self.cache.clear(self.reader.catalog_table()?)
    }

    /// Deletes cached artifacts of older catalog versions. Returns the count removed.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NotConfigured`](crate::CacheError) when caching is disabled.
    pub fn prune_cache(&self) -> Result<usize> {
        self.cache.path()?;
        self.cache.prune(self.reader.catalog_table()?)
    }

    /// Downloads every artifact of the newest catalog version that is not cached.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NotConfigured`](crate::CacheError) when caching is
    /// disabled, or the first download error.
    pub fn download_all(&self) -> Result<DownloadSummary> {
        self.cache.path()?;
        self.cache.download_all(self.reader.catalog_table()?)
    }
}

static DEFAULT_LOADER: OnceLock<Loader> = OnceLock::new();

/// The process-wide loader used by [`load`] and [`resolve_url`].
///
/// It is built with [`Loader::infer`] on first use.
///
/// # Errors
///
/// Returns [`BackendError::NoSupportedBackend`](crate::BackendError) if no
/// backend is compiled in.
pub fn default_loader() -> Result<&'static Loader> {
    get_or_try_init(&DEFAULT_LOADER, Loader::infer)
}

/// Loads a dataset with the default loader and default options.
///
/// # Errors
///
/// See [`Loader::load`].
pub fn load(name: &str, suffix: Option<&str>, tag: Option<&str>) -> Result<RecordBatch> {
    default_loader()?.load(name, suffix, tag, ReadOptions::default())
}

/// Resolves the url of a dataset with the default loader.
///
/// # Errors
///
/// See [`Loader::url`].
pub fn resolve_url(name: &str, suffix: Option<&str>, tag: Option<&str>) -> Result<String> {
    default_loader()?.url(name, suffix, tag)
}
