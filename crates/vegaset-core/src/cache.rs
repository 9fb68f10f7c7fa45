//! On-disk cache of downloaded dataset artifacts.
//!
//! Artifacts are content addressed: each lives at `<cache_dir>/<sha><suffix>`, is
//! written once through a temporary file in the same directory followed by an
//! atomic rename, and is never modified afterwards. Two processes racing on the
//! same artifact may both download it, but neither can observe a partial file.
//!
//! Caching is off unless a directory is configured, either through the
//! [`CACHE_ENV_VAR`] environment variable or [`DatasetCache::set_path`].

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, info};
use tempfile::NamedTempFile;
use vegaset_core_common::{MetadataRow, Source};

use crate::catalog::CatalogTable;
use crate::error::{CacheError, IoError, IoErrorExt, Result};
use crate::transport::{HttpOpener, Opener};

/// Environment variable holding the cache directory.
pub const CACHE_ENV_VAR: &str = "VEGASET_DATASETS_DIR";

/// Where artifacts are cached, if anywhere.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CacheLocation {
    /// Caching is disabled; every load streams from the network.
    #[default]
    Unset,
    /// Artifacts are cached in this directory.
    Dir(PathBuf),
}

impl CacheLocation {
    /// Reads [`CACHE_ENV_VAR`] from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var_os(key))
    }

    /// Resolves the location with a custom variable lookup.
    ///
    /// A missing or empty value means [`CacheLocation::Unset`].
    pub fn from_lookup(lookup: impl FnOnce(&str) -> Option<OsString>) -> Self {
        match lookup(CACHE_ENV_VAR) {
            Some(value) if !value.is_empty() => Self::Dir(PathBuf::from(value)),
            _ => Self::Unset,
        }
    }

    #[must_use]
    pub fn dir(&self) -> Option<&Path> {
        match self {
            Self::Unset => None,
            Self::Dir(dir) => Some(dir),
        }
    }
}

/// Outcome of [`DatasetCache::download_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    /// Files written by this run, in catalog order
    pub downloaded: Vec<PathBuf>,
    /// Latest-tag artifacts that were already on disk
    pub already_cached: usize,
}

/// Cache manager shared by every load of a [`Loader`](crate::Loader).
pub struct DatasetCache {
    location: RwLock<CacheLocation>,
    opener: Arc<dyn Opener>,
}

impl std::fmt::Debug for DatasetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetCache")
            .field("location", &self.location())
            .finish_non_exhaustive()
    }
}

impl Default for DatasetCache {
    fn default() -> Self {
        Self::from_env()
    }
}

impl DatasetCache {
    #[must_use]
    pub fn new(location: CacheLocation, opener: Arc<dyn Opener>) -> Self {
        Self {
            location: RwLock::new(location),
            opener,
        }
    }

    /// Cache configured from [`CACHE_ENV_VAR`], downloading over HTTP.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(CacheLocation::from_env(), Arc::new(HttpOpener::default()))
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.location().dir().is_some()
    }

    #[must_use]
    pub fn location(&self) -> CacheLocation {
        self.location
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the cache directory, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NotConfigured`] when caching is disabled, or an I/O
    /// error if the directory cannot be created.
    pub fn path(&self) -> Result<PathBuf> {
        match self.location() {
            CacheLocation::Unset => Err(CacheError::NotConfigured {
                env_var: CACHE_ENV_VAR,
            }
            .into()),
            CacheLocation::Dir(dir) => {
                fs::create_dir_all(&dir).with_cache_context(&dir)?;
                Ok(dir)
            },
        }
    }

    /// Enables caching in `dir`, or disables it with `None`.
    ///
    /// Relative paths are resolved against the current directory. The directory
    /// itself is created on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if a relative path cannot be made absolute.
    pub fn set_path(&self, dir: Option<&Path>) -> Result<()> {
        let location = match dir {
            None => CacheLocation::Unset,
            Some(dir) => CacheLocation::Dir(std::path::absolute(dir).with_cache_context(dir)?),
        };
        debug!("Cache location set to {location:?}");
        *self
            .location
            .write()
            .unwrap_or_else(PoisonError::into_inner) = location;
        Ok(())
    }

    /// Files currently in the cache directory, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NotConfigured`] when caching is disabled.
    pub fn entries(&self) -> Result<Vec<PathBuf>> {
        let dir = self.path()?;
        let mut entries = Vec::new();
        for entry in fs::read_dir(&dir).with_cache_context(&dir)? {
            let path = entry.with_cache_context(&dir)?.path();
            if path.is_file() {
                entries.push(path);
            }
        }
        entries.sort();
        Ok(entries)
    }

    /// `true` when the cache directory holds no files.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NotConfigured`] when caching is disabled.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.entries()?.is_empty())
    }

    /// Returns a source for the artifact of `row`.
    ///
    /// With caching disabled this opens a fresh network stream; otherwise the
    /// artifact is downloaded if needed and served from disk.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Download`] if the transport fails.
    pub fn fetch(&self, row: &MetadataRow) -> Result<Source> {
        if self.is_active() {
            return Ok(Source::Path(self.maybe_download(row)?));
        }
        debug!("Cache disabled, streaming {}", row.url);
        let reader = self.open(&row.url)?;
        Ok(Source::Stream {
            name: row.url.clone(),
            reader,
        })
    }

    /// Returns the cached path of `row`, downloading it first if it is missing.
    ///
    /// A zero-byte file counts as missing.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NotConfigured`] when caching is disabled,
    /// [`IoError::Download`] if the transport fails, or [`IoError::Cache`] if the
    /// file cannot be written.
    pub fn maybe_download(&self, row: &MetadataRow) -> Result<PathBuf> {
        let dir = self.path()?;
        let target = dir.join(row.cache_file_name());
        if is_populated(&target) {
            debug!("Cache hit for {} at {}", row.file_name, target.display());
            return Ok(target);
        }

        info!("Downloading {} to {}", row.url, target.display());
        let mut reader = self.open(&row.url)?;
        let mut temp = NamedTempFile::new_in(&dir).with_cache_context(&dir)?;
        io::copy(&mut reader, &mut temp).map_err(|source| IoError::Download {
            url: row.url.clone(),
            source: Box::new(source),
        })?;
        temp.persist(&target)
            .map_err(|err| err.error)
            .with_cache_context(&target)?;
        Ok(target)
    }

    /// Downloads every latest-tag artifact not already on disk.
    ///
    /// An artifact is on disk when a non-empty `<sha><suffix>` file exists; a
    /// file with the same hash but another suffix does not count.
    ///
    /// Artifacts are fetched in catalog order. The first failure aborts the run;
    /// files written before it stay in place.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NotConfigured`] when caching is disabled, or the
    /// first download error.
    pub fn download_all(&self, catalog: &CatalogTable) -> Result<DownloadSummary> {
        let on_disk = self.cached_file_names()?;
        let mut seen = HashSet::new();
        let mut summary = DownloadSummary::default();

        for row in catalog.latest_rows()? {
            let file_name = row.cache_file_name();
            if !seen.insert(file_name.clone()) {
                continue;
            }
            if on_disk.contains(&file_name) {
                summary.already_cached += 1;
                continue;
            }
            summary.downloaded.push(self.maybe_download(&row)?);
        }

        info!(
            "Downloaded {} artifacts, {} already cached",
            summary.downloaded.len(),
            summary.already_cached
        );
        Ok(summary)
    }

    /// Deletes every cached artifact the catalog knows, across all versions.
    ///
    /// Files the catalog does not name are left alone. Returns the number of
    /// files removed.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NotConfigured`] when caching is disabled.
    pub fn clear(&self, catalog: &CatalogTable) -> Result<usize> {
        let known = file_names(catalog.all_rows()?);
        let removed = self.remove_matching(|name| known.contains(name))?;
        info!("Cleared {removed} cached artifacts");
        Ok(removed)
    }

    /// Deletes cached artifacts that belong only to older catalog versions.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NotConfigured`] when caching is disabled.
    pub fn prune(&self, catalog: &CatalogTable) -> Result<usize> {
        let latest = file_names(catalog.latest_rows()?);
        let known = file_names(catalog.all_rows()?);
        let removed =
            self.remove_matching(|name| known.contains(name) && !latest.contains(name))?;
        info!("Pruned {removed} stale artifacts");
        Ok(removed)
    }

    fn open(&self, url: &str) -> Result<Box<dyn io::Read + Send>> {
        self.opener.open(url).map_err(|source| {
            IoError::Download {
                url: url.to_string(),
                source,
            }
            .into()
        })
    }

    fn cached_file_names(&self) -> Result<HashSet<String>> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|path| is_populated(path))
            .filter_map(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .map(str::to_string)
            })
            .collect())
    }

    fn remove_matching(&self, matches: impl Fn(&str) -> bool) -> Result<usize> {
        let mut removed = 0;
        for path in self.entries()? {
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if matches(name) {
                debug!("Removing {}", path.display());
                fs::remove_file(&path).with_cache_context(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn is_populated(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|meta| meta.is_file() && meta.len() > 0)
}

fn file_names(rows: Vec<MetadataRow>) -> HashSet<String> {
    rows.iter().map(MetadataRow::cache_file_name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportError;

    struct Offline;

    impl Opener for Offline {
        fn open(&self, url: &str) -> std::result::Result<Box<dyn io::Read + Send>, TransportError> {
            Err(format!("offline: {url}").into())
        }
    }

    #[test]
    fn test_location_from_lookup() {
        let unset = CacheLocation::from_lookup(|_| None);
        assert_eq!(unset, CacheLocation::Unset);

        let empty = CacheLocation::from_lookup(|_| Some(OsString::new()));
        assert_eq!(empty, CacheLocation::Unset);

        let dir = CacheLocation::from_lookup(|key| {
            assert_eq!(key, CACHE_ENV_VAR);
            Some(OsString::from("/tmp/vegaset"))
        });
        assert_eq!(dir.dir(), Some(Path::new("/tmp/vegaset")));
    }

    #[test]
    fn test_path_when_unset_is_not_configured() {
        let cache = DatasetCache::new(CacheLocation::Unset, Arc::new(Offline));
        let err = cache.path().unwrap_err();
        assert!(err.to_string().contains(CACHE_ENV_VAR));
        assert!(!cache.is_active());
    }

    #[test]
    fn test_set_path_toggles() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DatasetCache::new(CacheLocation::Unset, Arc::new(Offline));

        cache.set_path(Some(dir.path())).unwrap();
        assert!(cache.is_active());
        assert_eq!(cache.path().unwrap(), dir.path());

        cache.set_path(None).unwrap();
        assert!(!cache.is_active());
    }

    #[test]
    fn test_relative_path_is_made_absolute() {
        let cache = DatasetCache::new(CacheLocation::Unset, Arc::new(Offline));
        cache.set_path(Some(Path::new("relative-cache"))).unwrap();

        let location = cache.location();
        assert!(location.dir().unwrap().is_absolute());
    }

    #[test]
    fn test_path_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let cache = DatasetCache::new(CacheLocation::Dir(nested.clone()), Arc::new(Offline));

        assert_eq!(cache.path().unwrap(), nested);
        assert!(nested.is_dir());
        assert!(cache.is_empty().unwrap());
    }

    #[test]
    fn test_transport_error_is_carried() {
        let cache = DatasetCache::new(CacheLocation::Unset, Arc::new(Offline));
        let row = MetadataRow {
            dataset_name: "cars".to_string(),
            suffix: vegaset_core_common::Suffix::Json,
            file_name: "cars.json".to_string(),
            bytes: 10,
            is_image: false,
            is_tabular: true,
            is_geo: false,
            is_topo: false,
            is_spatial: false,
            is_json: true,
            has_schema: false,
            sha: "abc".to_string(),
            url: "https://example.org/cars.json".to_string(),
            tag: "v1".to_string(),
        };

        let err = cache.fetch(&row).unwrap_err();
        match err {
            crate::VegasetError::Io(IoError::Download { url, source }) => {
                assert_eq!(url, row.url);
                assert_eq!(source.to_string(), "offline: https://example.org/cars.json");
            },
            other => panic!("unexpected error: {other}"),
        }
    }
}
