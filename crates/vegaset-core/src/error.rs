//! Custom error types for dataset resolution and caching.
//!
//! This module provides structured error handling using `thiserror`. Each failure
//! the engine can report has its own domain enum, and [`VegasetError`] wraps them
//! so callers can match on the category they care about.

use std::path::PathBuf;

use thiserror::Error;
use vegaset_core_common::ConstraintError;

/// Main error type for `vegaset` operations.
///
/// This is the root error type that encompasses all domain-specific errors.
/// It uses `#[error(transparent)]` to delegate display formatting to the
/// underlying error variants.
#[derive(Debug, Error)]
pub enum VegasetError {
    /// Catalog lookups that cannot be answered
    #[error(transparent)]
    Query(#[from] QueryError),

    /// A backend has no parse function for the resolved artifact
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// Backend selection failures
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Cache control while caching is disabled
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// I/O errors (parsing, downloads, cache files, embedded assets)
    #[error(transparent)]
    Io(#[from] IoError),

    /// Generic errors from dependencies
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors raised while turning a request into a catalog row.
#[derive(Debug, Error)]
pub enum QueryError {
    /// No catalog row matches the request
    #[error("Found no results for:\n    {filter}")]
    Empty {
        /// The filter that was applied, rendered as a constraint set
        filter: String,
    },

    /// An argument is outside its accepted values
    #[error("Expected '{argument}' to be one of {expected},\nbut got: {value:?}")]
    InvalidArgument {
        /// Name of the argument (e.g. `"suffix"`)
        argument: String,
        /// The rejected value
        value: String,
        /// Accepted values, already formatted
        expected: String,
    },

    /// The artifact cannot be streamed from its url alone
    #[error(
        "'{file_name}' can only be read after a full download and has no usable url.\n\
         Load it instead, or request another format of '{dataset}'."
    )]
    UnresolvableViaUrl {
        /// Dataset name
        dataset: String,
        /// Artifact file name
        file_name: String,
    },
}

/// Errors produced by the capability registry of the active backend.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// The format is recognized but explicitly unsupported
    #[error(
        "Backend '{backend}' refused to load '{file_name}'.\n{reason}\n{alternative}"
    )]
    Refused {
        /// Artifact file name
        file_name: String,
        /// Active backend
        backend: String,
        /// Why the row was refused
        reason: String,
        /// Another backend, a cargo feature, or the url-only path
        alternative: String,
    },

    /// No binding of the backend is relevant to the row
    #[error("Backend '{backend}' has no parse function for:\n    {row}")]
    NoCapability {
        /// Active backend
        backend: String,
        /// Identifying fields of the row
        row: String,
    },

    /// A binding was declared with overlapping constraints
    #[error("Invalid capability binding: {0}")]
    InvalidBinding(#[from] ConstraintError),
}

/// Backend selection errors.
#[derive(Debug, Error)]
pub enum BackendError {
    /// A required cargo feature is not compiled in
    #[error(
        "Backend '{backend}' requires the {requirements} packages, but '{missing}' could not be found.\n\
         Enable it with:\n    cargo add vegaset-core --features {missing}"
    )]
    MissingDependency {
        /// Requested backend
        backend: String,
        /// Every requirement of the backend, quoted and comma separated
        requirements: String,
        /// The first missing requirement
        missing: String,
    },

    /// None of the candidate backends is available
    #[error("Found no supported backend, tried:\n    {tried}")]
    NoSupportedBackend {
        /// The full priority list, in order
        tried: String,
    },

    /// The backend name is not known
    #[error("Unknown backend '{name}'. Available backends: {available}")]
    UnknownBackend {
        /// The requested name
        name: String,
        /// Comma-separated list of known backends
        available: String,
    },
}

/// Cache control errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache location is unset
    #[error("Cache is not configured. Set the '{env_var}' environment variable or call `set_cache_path`.")]
    NotConfigured {
        /// Environment variable that enables the cache
        env_var: &'static str,
    },
}

/// I/O related errors.
#[derive(Debug, Error)]
pub enum IoError {
    /// A parse function failed on the artifact
    #[error("Failed to read '{source_name}' with {reader}: {source}")]
    Read {
        /// Name of the parse function
        reader: String,
        /// Cache path, url or asset name
        source_name: String,
        /// The underlying error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The transport failed to deliver an artifact
    #[error("Failed to download '{url}': {source}")]
    Download {
        /// Remote url
        url: String,
        /// The transport error, unmodified
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A cache file or directory operation failed
    #[error("Cache operation failed for '{path}': {source}")]
    Cache {
        /// The file or directory involved
        path: PathBuf,
        /// The underlying error
        #[source]
        source: std::io::Error,
    },

    /// An embedded asset could not be decoded
    #[error("Failed to decode embedded asset '{name}': {message}")]
    Asset {
        /// Asset file name
        name: String,
        /// Description of the problem
        message: String,
    },
}

/// Type alias for Results using `VegasetError`.
pub type Result<T> = std::result::Result<T, VegasetError>;

impl VegasetError {
    /// Get a user-friendly error message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Query(e) => e.user_message(),
            Self::Capability(e) => e.user_message(),
            Self::Backend(e) => e.to_string(),
            Self::Cache(e) => e.to_string(),
            Self::Io(e) => e.user_message(),
            Self::Other(e) => format!("Error: {e}"),
        }
    }

    /// Get recovery suggestions if available.
    ///
    /// Returns helpful suggestions on how to fix or work around the error.
    #[must_use]
    pub fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::Query(e) => e.recovery_suggestion(),
            Self::Capability(e) => e.recovery_suggestion(),
            Self::Backend(e) => e.recovery_suggestion(),
            Self::Cache(e) => e.recovery_suggestion(),
            Self::Io(e) => e.recovery_suggestion(),
            Self::Other(_) => None,
        }
    }

    /// Check if this error is potentially recoverable.
    ///
    /// Recoverable errors might be fixed by retrying with different
    /// parameters or after the user takes some action.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Query(QueryError::InvalidArgument { .. })
                | Self::Cache(_)
                | Self::Io(IoError::Download { .. })
        )
    }
}

impl QueryError {
    fn user_message(&self) -> String {
        match self {
            Self::Empty { filter } => format!("No dataset matches {filter}"),
            Self::InvalidArgument { .. } | Self::UnresolvableViaUrl { .. } => self.to_string(),
        }
    }

    fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::Empty { .. } => {
                Some("Run 'vegaset datasets' to list the available datasets.".to_string())
            },
            Self::InvalidArgument { .. } => None,
            Self::UnresolvableViaUrl { dataset, .. } => {
                Some(format!("Run 'vegaset load {dataset}' to download and read it."))
            },
        }
    }
}

impl CapabilityError {
    fn user_message(&self) -> String {
        match self {
            Self::Refused {
                file_name, reason, ..
            } => format!("Cannot load '{file_name}': {reason}"),
            Self::NoCapability { .. } | Self::InvalidBinding(_) => self.to_string(),
        }
    }

    fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::Refused { alternative, .. } => Some(alternative.clone()),
            Self::NoCapability { .. } => {
                Some("Run 'vegaset backends' to see which backends are available.".to_string())
            },
            Self::InvalidBinding(_) => None,
        }
    }
}

impl BackendError {
    fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::MissingDependency { missing, .. } => Some(format!(
                "Rebuild with the '{missing}' feature of vegaset-core enabled."
            )),
            Self::NoSupportedBackend { .. } => {
                Some("Enable at least one backend feature of vegaset-core.".to_string())
            },
            Self::UnknownBackend { .. } => {
                Some("Run 'vegaset backends' to see all known backends.".to_string())
            },
        }
    }
}

impl CacheError {
    fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::NotConfigured { env_var } => Some(format!(
                "Pass --cache-dir, or export {env_var}=<directory> before running."
            )),
        }
    }
}

impl IoError {
    fn user_message(&self) -> String {
        match self {
            Self::Read {
                reader,
                source_name,
                ..
            } => format!("Failed to read '{source_name}' with {reader}"),
            Self::Download { url, .. } => format!("Failed to download {url}"),
            Self::Cache { path, .. } => format!("Cache operation failed: {}", path.display()),
            Self::Asset { .. } => self.to_string(),
        }
    }

    fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::Download { .. } => {
                Some("Check your network connection and try again.".to_string())
            },
            Self::Cache { .. } => {
                Some("Check that the cache directory exists and is writable.".to_string())
            },
            Self::Read { .. } | Self::Asset { .. } => None,
        }
    }
}

/// Extension trait for adding I/O context to errors.
pub trait IoErrorExt<T> {
    /// Add parse context to an error.
    ///
    /// # Errors
    ///
    /// Returns an [`IoError::Read`] if the underlying operation fails.
    fn with_read_context(self, reader: &str, source_name: impl Into<String>) -> Result<T>;

    /// Add cache path context to an error.
    ///
    /// # Errors
    ///
    /// Returns an [`IoError::Cache`] if the underlying operation fails.
    fn with_cache_context(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoErrorExt<T> for anyhow::Result<T> {
    fn with_read_context(self, reader: &str, source_name: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            VegasetError::Io(IoError::Read {
                reader: reader.to_string(),
                source_name: source_name.into(),
                source: e.into(),
            })
        })
    }

    fn with_cache_context(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| {
            VegasetError::Io(IoError::Cache {
                path: path.into(),
                source: std::io::Error::other(e),
            })
        })
    }
}

impl<T> IoErrorExt<T> for std::io::Result<T> {
    fn with_read_context(self, reader: &str, source_name: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            VegasetError::Io(IoError::Read {
                reader: reader.to_string(),
                source_name: source_name.into(),
                source: Box::new(e),
            })
        })
    }

    fn with_cache_context(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| {
            VegasetError::Io(IoError::Cache {
                path: path.into(),
                source,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_dependency_names_install_command() {
        let err = VegasetError::from(BackendError::MissingDependency {
            backend: "arrow[parquet]".to_string(),
            requirements: "'arrow', 'parquet'".to_string(),
            missing: "parquet".to_string(),
        });

        let message = err.to_string();
        assert!(message.contains("cargo add vegaset-core --features parquet"));
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_query_empty_names_filter() {
        let err = QueryError::Empty {
            filter: "is_meta(dataset_name=\"nope\")".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Found no results for:\n    is_meta(dataset_name=\"nope\")"
        );
    }

    #[test]
    fn test_cache_context_keeps_io_source() {
        let result: std::io::Result<()> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let err = result.with_cache_context("/tmp/cache").unwrap_err();

        match err {
            VegasetError::Io(IoError::Cache { source, .. }) => {
                assert_eq!(source.kind(), std::io::ErrorKind::PermissionDenied);
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_recoverable_errors() {
        let cache = VegasetError::from(CacheError::NotConfigured {
            env_var: "VEGASET_DATASETS_DIR",
        });
        assert!(cache.is_recoverable());

        let other = VegasetError::from(anyhow::anyhow!("boom"));
        assert!(!other.is_recoverable());
        assert_eq!(other.user_message(), "Error: boom");
    }
}
