//! Location tokens and lazy URL resolution
//!
//! Repository URLs are accepted as opaque tokens at configuration time and
//! only turned into absolute URLs when read. Resolution depends on external
//! context (the project base directory), so it runs on every read and is
//! never cached.

use crate::error::{RepoError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

/// An unresolved location token, accepted without validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// An already-absolute URL
    Url(Url),
    /// A filesystem path, resolved against the project base directory
    Path(PathBuf),
    /// An arbitrary string, parsed as a URL or treated as a relative path
    Raw(String),
}

impl From<Url> for Location {
    fn from(url: Url) -> Self {
        Location::Url(url)
    }
}

impl From<PathBuf> for Location {
    fn from(path: PathBuf) -> Self {
        Location::Path(path)
    }
}

impl From<&Path> for Location {
    fn from(path: &Path) -> Self {
        Location::Path(path.to_path_buf())
    }
}

impl From<&str> for Location {
    fn from(s: &str) -> Self {
        Location::Raw(s.to_string())
    }
}

impl From<String> for Location {
    fn from(s: String) -> Self {
        Location::Raw(s)
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Url(url) => write!(f, "{}", url),
            Location::Path(path) => write!(f, "{}", path.display()),
            Location::Raw(s) => write!(f, "{}", s),
        }
    }
}

/// Resolves location tokens to absolute URLs
///
/// Implementations must be pure and in-memory: no network or filesystem
/// access happens during resolution.
pub trait LocationResolver: Send + Sync {
    /// Resolve a token to an absolute URL
    ///
    /// Fails with [`RepoError::InvalidLocation`] when the token cannot be
    /// turned into an absolute URL.
    fn resolve(&self, token: &Location) -> Result<Url>;
}

/// Default resolver: absolute URLs pass through, paths and path-like raw
/// tokens resolve against a base directory into `file://` URLs
#[derive(Debug)]
pub struct BaseDirResolver {
    base_dir: PathBuf,
}

impl BaseDirResolver {
    pub fn new(base_dir: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            base_dir: base_dir.into(),
        })
    }

    fn file_url(&self, path: &Path, token: &Location) -> Result<Url> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        };
        Url::from_file_path(&absolute).map_err(|_| RepoError::InvalidLocation {
            token: token.to_string(),
            message: format!("cannot express '{}' as a file URL", absolute.display()),
        })
    }
}

impl LocationResolver for BaseDirResolver {
    fn resolve(&self, token: &Location) -> Result<Url> {
        match token {
            Location::Url(url) => Ok(url.clone()),
            Location::Path(path) => self.file_url(path, token),
            Location::Raw(s) => match Url::parse(s) {
                Ok(url) => Ok(url),
                // A bare name or relative path is not a parse failure,
                // resolve it against the base directory instead.
                Err(url::ParseError::RelativeUrlWithoutBase) => {
                    self.file_url(Path::new(s), token)
                }
                Err(e) => Err(RepoError::InvalidLocation {
                    token: s.clone(),
                    message: e.to_string(),
                }),
            },
        }
    }
}
