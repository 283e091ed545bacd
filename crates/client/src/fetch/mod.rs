//! Document retrieval for the document cache.
//!
//! ### Contract
//! - One call, one outcome: a parsed document tree or a [`FetchFailure`].
//! - Failure kinds: `aborted`, `network-error`, `timed-out`.
//!
//! ### Transport
//! - `http`/`https` through reqwest (rustls, compression, bounded redirects).
//! - `file` through tokio's filesystem API.
//! - Bounded wait: 2s for local files, 8s for the network (configurable).
//! - Max body bytes: 5MB (configurable); larger bodies abort the fetch.

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, header};
use scraper::Html;
use transclude_core::{AppConfig, Error};
use url::Url;

use crate::location;

/// Kind of fetch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Aborted,
    NetworkError,
    TimedOut,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureKind::Aborted => "aborted",
            FailureKind::NetworkError => "network-error",
            FailureKind::TimedOut => "timed-out",
        })
    }
}

/// A failed document retrieval.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {detail}")]
pub struct FetchFailure {
    pub kind: FailureKind,
    pub detail: String,
}

impl FetchFailure {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self { kind, detail: detail.into() }
    }
}

/// Asynchronous retrieval of a document tree from a canonical location.
///
/// Documents are not `Send`, so neither are fetch futures: everything runs on one thread.
#[async_trait(?Send)]
pub trait DocumentFetcher {
    async fn fetch(&self, location: &Url) -> Result<Html, FetchFailure>;
}

/// Configuration for the HTTP/file fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "transclude/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Bounded wait for network locations (default: 8s)
    pub network_timeout: Duration,

    /// Bounded wait for `file` locations (default: 2s)
    pub file_timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "transclude/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            network_timeout: Duration::from_millis(8000),
            file_timeout: Duration::from_millis(2000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            network_timeout: config.network_timeout(),
            file_timeout: config.file_timeout(),
            max_redirects: config.max_redirects,
        }
    }
}

impl FetchConfig {
    /// The bounded wait that applies to a location.
    pub fn timeout_for(&self, location: &Url) -> Duration {
        if location::is_local(location) { self.file_timeout } else { self.network_timeout }
    }
}

/// Fetcher for `http`, `https` and `file` locations.
pub struct HttpFetcher {
    http: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.network_timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::FetchFailed(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    async fn fetch_bytes(&self, location: &Url) -> Result<Vec<u8>, FetchFailure> {
        match location.scheme() {
            "file" => self.read_file(location).await,
            "http" | "https" => self.request(location).await,
            scheme => Err(FetchFailure::new(FailureKind::NetworkError, format!("unsupported scheme: {scheme}"))),
        }
    }

    async fn read_file(&self, location: &Url) -> Result<Vec<u8>, FetchFailure> {
        let path = location
            .to_file_path()
            .map_err(|_| FetchFailure::new(FailureKind::NetworkError, "not a local file path"))?;

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| FetchFailure::new(FailureKind::NetworkError, e.to_string()))?;
        if metadata.len() as usize > self.config.max_bytes {
            return Err(FetchFailure::new(
                FailureKind::Aborted,
                format!("{} bytes exceeds {}", metadata.len(), self.config.max_bytes),
            ));
        }

        tokio::fs::read(&path)
            .await
            .map_err(|e| FetchFailure::new(FailureKind::NetworkError, e.to_string()))
    }

    async fn request(&self, location: &Url) -> Result<Vec<u8>, FetchFailure> {
        let response = self
            .http
            .get(location.as_str())
            .header(header::ACCEPT, "application/xhtml+xml,text/html;q=0.9,application/xml;q=0.8,*/*;q=0.5")
            .send()
            .await
            .map_err(request_failure)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::new(FailureKind::NetworkError, format!("status {}", status.as_u16())));
        }

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(FetchFailure::new(
                FailureKind::Aborted,
                format!("{} bytes exceeds {}", len, self.config.max_bytes),
            ));
        }

        let bytes = response.bytes().await.map_err(request_failure)?;

        if bytes.len() > self.config.max_bytes {
            return Err(FetchFailure::new(
                FailureKind::Aborted,
                format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes),
            ));
        }

        Ok(bytes.to_vec())
    }
}

fn request_failure(err: reqwest::Error) -> FetchFailure {
    if err.is_timeout() {
        FetchFailure::new(FailureKind::TimedOut, err.to_string())
    } else {
        FetchFailure::new(FailureKind::NetworkError, err.to_string())
    }
}

#[async_trait(?Send)]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, location: &Url) -> Result<Html, FetchFailure> {
        let start = Instant::now();
        let timeout = self.config.timeout_for(location);

        let bytes = tokio::time::timeout(timeout, self.fetch_bytes(location))
            .await
            .map_err(|_| FetchFailure::new(FailureKind::TimedOut, format!("no response within {}ms", timeout.as_millis())))??;

        let document = Html::parse_document(&String::from_utf8_lossy(&bytes));

        tracing::debug!(
            "fetched {} in {}ms ({} bytes)",
            location,
            start.elapsed().as_millis(),
            bytes.len()
        );

        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "transclude/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.network_timeout, Duration::from_millis(8000));
        assert_eq!(config.file_timeout, Duration::from_millis(2000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { user_agent: "custom/1.0".into(), file_timeout_ms: 500, ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.user_agent, "custom/1.0");
        assert_eq!(config.file_timeout, Duration::from_millis(500));
        assert_eq!(config.network_timeout, Duration::from_millis(8000));
    }

    #[test]
    fn test_timeout_for_location() {
        let config = FetchConfig::default();
        let file = Url::parse("file:///tmp/a.html").unwrap();
        let web = Url::parse("https://example.com/a.html").unwrap();
        assert_eq!(config.timeout_for(&file), Duration::from_millis(2000));
        assert_eq!(config.timeout_for(&web), Duration::from_millis(8000));
    }

    #[test]
    fn test_failure_kind_display() {
        assert_eq!(FailureKind::Aborted.to_string(), "aborted");
        assert_eq!(FailureKind::NetworkError.to_string(), "network-error");
        assert_eq!(FailureKind::TimedOut.to_string(), "timed-out");

        let failure = FetchFailure::new(FailureKind::TimedOut, "no response within 2000ms");
        assert_eq!(failure.to_string(), "timed-out: no response within 2000ms");
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let fetcher = HttpFetcher::new(FetchConfig::default());
        assert!(fetcher.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_local_file() {
        let mut file = tempfile::Builder::new().suffix(".html").tempfile().unwrap();
        write!(file, "<html><body><p id=\"sec1\">Hello</p></body></html>").unwrap();
        let location = Url::from_file_path(file.path()).unwrap();

        let fetcher = HttpFetcher::new(FetchConfig::default()).unwrap();
        let document = fetcher.fetch(&location).await.unwrap();

        assert!(document.html().contains("<p id=\"sec1\">Hello</p>"));
    }

    #[tokio::test]
    async fn test_fetch_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let location = Url::from_file_path(dir.path().join("missing.html")).unwrap();

        let fetcher = HttpFetcher::new(FetchConfig::default()).unwrap();
        let failure = fetcher.fetch(&location).await.unwrap_err();

        assert_eq!(failure.kind, FailureKind::NetworkError);
    }

    #[tokio::test]
    async fn test_fetch_file_too_large() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<html><body>{}</body></html>", "x".repeat(64)).unwrap();
        let location = Url::from_file_path(file.path()).unwrap();

        let config = FetchConfig { max_bytes: 16, ..Default::default() };
        let fetcher = HttpFetcher::new(config).unwrap();
        let failure = fetcher.fetch(&location).await.unwrap_err();

        assert_eq!(failure.kind, FailureKind::Aborted);
    }

    #[tokio::test]
    async fn test_fetch_unsupported_scheme() {
        let location = Url::parse("ftp://example.com/doc.html").unwrap();

        let fetcher = HttpFetcher::new(FetchConfig::default()).unwrap();
        let failure = fetcher.fetch(&location).await.unwrap_err();

        assert_eq!(failure.kind, FailureKind::NetworkError);
        assert!(failure.detail.contains("ftp"));
    }

    #[tokio::test]
    async fn test_fetch_unanswered_request_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let location = Url::parse(&format!("http://{}/d.html", listener.local_addr().unwrap())).unwrap();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let config = FetchConfig { network_timeout: Duration::from_millis(100), ..Default::default() };
        let fetcher = HttpFetcher::new(config).unwrap();
        let failure = fetcher.fetch(&location).await.unwrap_err();

        assert_eq!(failure.kind, FailureKind::TimedOut);
        server.abort();
    }

    #[tokio::test]
    async fn test_fetch_error_status() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let location = Url::parse(&format!("http://{}/missing.html", listener.local_addr().unwrap())).unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await.unwrap();
            socket
                .write_all(b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\n\r\n")
                .await
                .unwrap();
        });

        let fetcher = HttpFetcher::new(FetchConfig::default()).unwrap();
        let failure = fetcher.fetch(&location).await.unwrap_err();

        assert_eq!(failure.kind, FailureKind::NetworkError);
        assert!(failure.detail.contains("status 404"));
        server.await.unwrap();
    }
}
