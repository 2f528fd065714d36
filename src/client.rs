//! Object storage destinations for the uploader.
//!
//! - `GcsClient`: blocking Google Cloud Storage JSON API client (`ureq`, media upload).
//! - `DirectoryStore`: writes objects below a local directory, for dry runs.
//!
//! Authentication
//! - Bearer token supplied by the caller (environment or token file). Nothing is embedded here.

use http::header::{AUTHORIZATION, CONTENT_TYPE};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug)]
pub enum StoreError {
    MissingAuth,
    InvalidName(String),
    Transport(String),
    Http { status: u16, message: String },
    Io(std::io::Error),
}

impl core::fmt::Display for StoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StoreError::MissingAuth => write!(f, "missing bearer token (set FLEET_UPLOAD_TOKEN or FLEET_UPLOAD_TOKEN_FILE)"),
            StoreError::InvalidName(n) => write!(f, "invalid object name: {}", n),
            StoreError::Transport(s) => write!(f, "transport error: {}", s),
            StoreError::Http { status, message } => write!(f, "http {}: {}", status, message),
            StoreError::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        StoreError::Io(value)
    }
}

/// Write bytes to a named location in a bucket.
pub trait ObjectStore {
    fn put_object(&self, name: &str, bytes: &[u8], content_type: &str) -> Result<(), StoreError>;

    /// Human-readable URI of an object name, for logs and the final report.
    fn uri(&self, name: &str) -> String;
}

pub struct GcsClient {
    agent: ureq::Agent,
    endpoint: String,
    bucket: String,
    token: String,
}

impl GcsClient {
    pub fn new(endpoint: impl Into<String>, bucket: impl Into<String>, token: Option<String>) -> Result<Self, StoreError> {
        let token = token.filter(|t| !t.trim().is_empty()).ok_or(StoreError::MissingAuth)?;
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build()
            .into();
        Ok(GcsClient {
            agent,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            token,
        })
    }

    fn upload_url(&self) -> String {
        format!("{}/b/{}/o", self.endpoint, self.bucket)
    }
}

impl ObjectStore for GcsClient {
    fn put_object(&self, name: &str, bytes: &[u8], content_type: &str) -> Result<(), StoreError> {
        let url = self.upload_url();
        let resp = self
            .agent
            .post(url.as_str())
            .query("uploadType", "media")
            .query("name", name)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(CONTENT_TYPE, content_type)
            .send(bytes);

        match resp {
            Ok(r) if r.status().is_success() => Ok(()),
            Ok(mut r) => {
                let status = r.status().as_u16();
                let message = r.body_mut().read_to_string().unwrap_or_default();
                Err(StoreError::Http { status, message })
            }
            Err(e) => Err(StoreError::Transport(e.to_string())),
        }
    }

    fn uri(&self, name: &str) -> String {
        format!("gs://{}/{}", self.bucket, name)
    }
}

/// Mirrors object names as relative paths below `root`.
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectoryStore { root: root.into() }
    }

    fn object_path(&self, name: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, std::path::Component::Normal(_)));
        if name.is_empty() || escapes {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl ObjectStore for DirectoryStore {
    fn put_object(&self, name: &str, bytes: &[u8], _content_type: &str) -> Result<(), StoreError> {
        let path = self.object_path(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)?;
        Ok(())
    }

    fn uri(&self, name: &str) -> String {
        format!("file://{}", self.root.join(name).display())
    }
}
