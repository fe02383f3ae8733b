//! Repository transports
//!
//! A transport moves raw bytes to and from a repository location. The
//! resolver never speaks a protocol itself; it asks a [`TransportFactory`]
//! for a transport keyed by the URL scheme of the repository root.

use crate::error::{RepoError, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Credentials handed to the transport factory
///
/// Credential management itself lives outside this crate; this is only the
/// value the configuration layer carries through to the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Authentication {
    /// Optional bearer token for HTTP repositories
    pub token: Option<String>,
}

impl Authentication {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }
}

/// Fetches and publishes raw resources at repository URLs
pub trait Transport: Send + Sync {
    /// Fetch the resource at `url`; `Ok(None)` means it does not exist
    fn fetch(&self, url: &Url) -> Result<Option<Vec<u8>>>;

    /// Write the resource at `url`, replacing any existing content
    fn put(&self, url: &Url, bytes: &[u8]) -> Result<()>;
}

/// Creates transports keyed by URL scheme
pub trait TransportFactory: Send + Sync {
    fn create_transport(
        &self,
        scheme: &str,
        repository: &str,
        authentication: &Authentication,
    ) -> Result<Arc<dyn Transport>>;
}

/// Stock factory: `file` and `http`/`https` schemes
#[derive(Debug, Default)]
pub struct DefaultTransportFactory;

impl TransportFactory for DefaultTransportFactory {
    fn create_transport(
        &self,
        scheme: &str,
        repository: &str,
        authentication: &Authentication,
    ) -> Result<Arc<dyn Transport>> {
        match scheme {
            "file" => Ok(Arc::new(FileTransport)),
            "http" | "https" => Ok(Arc::new(HttpTransport::new(
                authentication.token.clone(),
            )?)),
            other => Err(RepoError::InvalidLocation {
                token: format!("{}://", other),
                message: format!(
                    "no transport available for scheme '{}' in repository '{}'",
                    other, repository
                ),
            }),
        }
    }
}

/// Local filesystem transport for `file://` repositories
#[derive(Debug, Default)]
pub struct FileTransport;

impl FileTransport {
    fn to_path(url: &Url) -> Result<std::path::PathBuf> {
        url.to_file_path().map_err(|_| RepoError::InvalidLocation {
            token: url.to_string(),
            message: "not a local file URL".to_string(),
        })
    }
}

impl Transport for FileTransport {
    fn fetch(&self, url: &Url) -> Result<Option<Vec<u8>>> {
        let path = Self::to_path(url)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, url: &Url, bytes: &[u8]) -> Result<()> {
        let path = Self::to_path(url)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        Ok(())
    }
}

/// HTTP(S) transport
pub struct HttpTransport {
    client: Client,
    token: Option<String>,
}

impl HttpTransport {
    pub fn new(token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RepoError::Http(e.to_string()))?;
        Ok(Self { client, token })
    }

    fn authorize(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> reqwest::blocking::RequestBuilder {
        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, url: &Url) -> Result<Option<Vec<u8>>> {
        let request = self.authorize(self.client.get(url.clone()));
        let response = request.send()?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(RepoError::Http(format!(
                "HTTP {} fetching {}",
                response.status(),
                url
            )));
        }
        Ok(Some(response.bytes()?.to_vec()))
    }

    fn put(&self, url: &Url, bytes: &[u8]) -> Result<()> {
        let request = self.authorize(self.client.put(url.clone())).body(bytes.to_vec());
        let response = request.send()?;

        if !response.status().is_success() {
            return Err(RepoError::Http(format!(
                "HTTP {} publishing to {}",
                response.status(),
                url
            )));
        }
        Ok(())
    }
}
