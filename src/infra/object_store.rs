use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use crate::app::ports::ObjectStore;
use crate::config::StorageConfig;
use crate::error::FetchError;

/// Reads objects from a local directory; the bucket name is ignored.
pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ObjectStore for LocalDirStore {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>, FetchError> {
        let path = self.root.join(key);
        debug!(path = %path.display(), "reading local object");
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FetchError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(e) => Err(FetchError::Io(e)),
        }
    }
}

/// Fetches objects over HTTP from an S3-style endpoint.
///
/// Bucket and region are only checked when a fetch is attempted. When an
/// access key is configured it is sent as a bearer token; request signing is
/// left to a fronting proxy.
pub struct HttpObjectStore {
    config: StorageConfig,
    client: reqwest::Client,
}

impl HttpObjectStore {
    pub fn new(config: StorageConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { config, client })
    }

    /// `<endpoint>/<bucket>/<key>` when an endpoint is configured, otherwise
    /// the virtual-hosted S3 URL for the configured region.
    pub fn object_url(&self, bucket: &str, key: &str) -> Result<String, FetchError> {
        if bucket.trim().is_empty() {
            return Err(FetchError::MissingConfig("S3_BUCKET_NAME is not set".to_string()));
        }
        if let Some(endpoint) = self.config.endpoint.as_deref().filter(|e| !e.trim().is_empty()) {
            return Ok(format!("{}/{}/{}", endpoint.trim_end_matches('/'), bucket, key));
        }
        let region = self
            .config
            .region
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| FetchError::MissingConfig("AWS_DEFAULT_REGION is not set".to_string()))?;
        Ok(format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key))
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>, FetchError> {
        let url = self.object_url(bucket, key)?;
        debug!(%url, "fetching object");
        let mut request = self.client.get(&url);
        if let Some(access_key) = self.config.access_key_id.as_deref() {
            request = request.bearer_auth(access_key);
        }
        let resp = request.send().await?;
        match resp.status() {
            s if s.is_success() => Ok(resp.bytes().await?.to_vec()),
            StatusCode::NOT_FOUND => Err(FetchError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            s => Err(FetchError::Status {
                status: s.as_u16(),
                key: key.to_string(),
            }),
        }
    }
}
