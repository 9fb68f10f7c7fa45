//! The network seam: opening a remote artifact as a byte stream.

use std::error::Error as StdError;
use std::io::Read;
use std::time::Duration;

use log::debug;
use url::Url;

/// Error type returned by [`Opener`] implementations.
pub type TransportError = Box<dyn StdError + Send + Sync>;

/// Opens a url as a forward-only byte stream.
///
/// The cache manager only ever talks to the network through this trait, so tests
/// can count transfers with an in-memory implementation.
pub trait Opener: Send + Sync {
    /// Opens `url` for reading.
    ///
    /// # Errors
    ///
    /// Returns the transport error unmodified; callers wrap it with the url.
    fn open(&self, url: &str) -> Result<Box<dyn Read + Send>, TransportError>;
}

/// [`Opener`] over a blocking `reqwest` client.
///
/// Connecting is bounded, but a transfer is not: a slow download of a large
/// artifact runs to completion, and a stalled one blocks. Use
/// [`HttpOpener::with_timeout`] to cap whole requests.
#[derive(Debug, Clone)]
pub struct HttpOpener {
    client: reqwest::blocking::Client,
    timeout: Option<Duration>,
}

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

fn client(timeout: Option<Duration>) -> reqwest::blocking::Client {
    reqwest::blocking::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::blocking::Client::new())
}

impl Default for HttpOpener {
    fn default() -> Self {
        Self {
            client: client(None),
            timeout: None,
        }
    }
}

impl HttpOpener {
    /// Wraps a preconfigured client. Its own timeouts apply.
    #[must_use]
    pub fn new(client: reqwest::blocking::Client) -> Self {
        Self {
            client,
            timeout: None,
        }
    }

    /// Opener whose requests fail once `timeout` has elapsed, body included.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: client(Some(timeout)),
            timeout: Some(timeout),
        }
    }

    /// Overall request timeout, if one was requested.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

fn validate_url(url: &str) -> Result<Url, TransportError> {
    let parsed = Url::parse(url)?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(format!("unsupported url scheme '{other}'").into()),
    }
}

impl Opener for HttpOpener {
    fn open(&self, url: &str) -> Result<Box<dyn Read + Send>, TransportError> {
        let url = validate_url(url)?;
        debug!("GET {url}");
        let response = self.client.get(url).send()?.error_for_status()?;
        Ok(Box::new(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_http_urls() {
        let err = validate_url("file:///etc/passwd").unwrap_err();
        assert!(err.to_string().contains("'file'"));
    }

    #[test]
    fn test_downloads_have_no_overall_timeout() {
        assert_eq!(HttpOpener::default().timeout(), None);

        let capped = HttpOpener::with_timeout(Duration::from_secs(600));
        assert_eq!(capped.timeout(), Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_rejects_malformed_urls() {
        assert!(HttpOpener::default().open("not a url").is_err());
    }

    #[test]
    fn test_accepts_cdn_urls() {
        let url =
            validate_url("https://cdn.jsdelivr.net/npm/vega-datasets@v3.2.0/data/cars.json")
                .unwrap();
        assert_eq!(url.host_str(), Some("cdn.jsdelivr.net"));
    }
}
