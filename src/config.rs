use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{
    BENIGN_FILE, DEFAULT_PROCESSED_DIR, DEFAULT_RAW_DIR, MALWARE_FILE, PHISHING_FILE, SPAM_FILE,
};
use crate::error::{PrepError, Result};
use crate::pipeline::processing::reader::RowPolicy;
use crate::types::Feed;

pub const DEFAULT_CONFIG_PATH: &str = "feedprep.toml";

/// One registered feed and the object key it is fetched from
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedSpec {
    pub feed: Feed,
    pub file_name: String,
}

impl FeedSpec {
    pub fn new(feed: Feed, file_name: impl Into<String>) -> Self {
        Self {
            feed,
            file_name: file_name.into(),
        }
    }

    /// Rows of every feed except benign follow the configured policy.
    pub fn row_policy(&self, configured: RowPolicy) -> RowPolicy {
        match self.feed {
            Feed::Benign => RowPolicy::PadOrTruncate,
            _ => configured,
        }
    }
}

pub fn default_feeds() -> Vec<FeedSpec> {
    vec![
        FeedSpec::new(Feed::Malware, MALWARE_FILE),
        FeedSpec::new(Feed::Phishing, PHISHING_FILE),
        FeedSpec::new(Feed::Spam, SPAM_FILE),
        FeedSpec::new(Feed::Benign, BENIGN_FILE),
    ]
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: None,
            endpoint: None,
            access_key_id: None,
            timeout_seconds: 60,
        }
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("StorageConfig")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &redact(&self.access_key_id))
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub feeds: Vec<FeedSpec>,
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
    /// Keep a copy of every fetched file under `raw_dir`
    pub cache_raw: bool,
    pub row_policy: RowPolicy,
    pub spam_expected_columns: Option<usize>,
    pub storage: StorageConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            feeds: default_feeds(),
            raw_dir: PathBuf::from(DEFAULT_RAW_DIR),
            processed_dir: PathBuf::from(DEFAULT_PROCESSED_DIR),
            cache_raw: false,
            row_policy: RowPolicy::Strict,
            spam_expected_columns: None,
            storage: StorageConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Reads the TOML file when one is given (or `feedprep.toml` exists),
    /// then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PrepError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(content)?;
        if config.feeds.is_empty() {
            return Err(PrepError::Config("no feeds registered".to_string()));
        }
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Environment overrides; empty values are ignored.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(bucket) = get("S3_BUCKET_NAME") {
            self.storage.bucket = bucket;
        }
        if let Some(key) = get("AWS_ACCESS_KEY_ID") {
            self.storage.access_key_id = Some(key);
        }
        if let Some(region) = get("AWS_DEFAULT_REGION") {
            self.storage.region = Some(region);
        }
        if let Some(endpoint) = get("FEEDPREP_OBJECT_ENDPOINT") {
            self.storage.endpoint = Some(endpoint);
        }
        if let Some(dir) = get("FEEDPREP_RAW_DIR") {
            self.raw_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("FEEDPREP_PROCESSED_DIR") {
            self.processed_dir = PathBuf::from(dir);
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.processed_dir)?;
        if self.cache_raw {
            fs::create_dir_all(&self.raw_dir)?;
        }
        Ok(())
    }

    /// Restricts the registry to the named feeds, keeping registry order.
    pub fn select_feeds(&mut self, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        let wanted = names
            .iter()
            .map(|n| n.parse::<Feed>())
            .collect::<Result<Vec<_>>>()?;
        self.feeds.retain(|spec| wanted.contains(&spec.feed));
        Ok(())
    }
}
