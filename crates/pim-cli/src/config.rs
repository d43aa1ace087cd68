//! Configuration management for the PIM importer
//!
//! Settings are layered, lowest precedence first: built-in defaults, a TOML
//! file (`pim.toml` or `--config`), `PIM_*` environment variables, then
//! command-line flags applied by the caller.

use crate::error::{ImportError, Result};
use crate::import::SessionSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Import Configuration Constants
// ============================================================================

/// Default API base URL when none is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Default bucket the upload-credential service writes into.
pub const DEFAULT_UPLOAD_BUCKET: &str = "product-portal-uploads";

/// Time between two job-status queries.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;

/// Longest accepted time between two job-status queries (one day).
pub const MAX_POLL_INTERVAL_MS: u64 = 86_400_000;

/// Job-status queries issued before the job is considered timed out
/// (24 x 5s = 2 minutes).
pub const DEFAULT_MAX_POLLS: u32 = 24;

/// Wait after a successful upload before the object is assumed visible.
pub const DEFAULT_PROPAGATION_DELAY_MS: u64 = 2_000;

/// Per-request timeout for every HTTP call.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "pim.toml";

/// Marker left in endpoint URLs that were never filled in.
const PLACEHOLDER_MARKER: &str = "YOUR_API_ID";

/// URLs of the remote services the importer talks to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEndpoints {
    /// Upload-credential service (`POST {fileName, contentType}`)
    pub presigned_url: String,

    /// Job-initiation service (`POST {s3Bucket, s3Key}`)
    pub process_file_url: String,

    /// Job-status collection; the job id is appended as a path segment
    pub job_status_base: String,

    /// Approval service (`POST {products, s3Key}`)
    pub approve_url: String,
}

impl ApiEndpoints {
    /// Derive every endpoint from a single API base URL.
    pub fn from_base(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            presigned_url: format!("{}/uploads/presigned-url", base),
            process_file_url: format!("{}/uploads/process-file", base),
            job_status_base: format!("{}/processing-jobs", base),
            approve_url: format!("{}/approve", base),
        }
    }

    fn entries(&self) -> [(&'static str, &str); 4] {
        [
            ("presigned_url", &self.presigned_url),
            ("process_file_url", &self.process_file_url),
            ("job_status_base", &self.job_status_base),
            ("approve_url", &self.approve_url),
        ]
    }
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self::from_base(DEFAULT_API_BASE_URL)
    }
}

/// Importer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Bucket name passed to the job-initiation service
    pub upload_bucket: String,

    pub poll_interval_ms: u64,

    pub max_polls: u32,

    pub propagation_delay_ms: u64,

    pub request_timeout_secs: u64,

    /// Service endpoints, the `[api]` table
    pub api: ApiEndpoints,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            api: ApiEndpoints::default(),
            upload_bucket: DEFAULT_UPLOAD_BUCKET.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_polls: DEFAULT_MAX_POLLS,
            propagation_delay_ms: DEFAULT_PROPAGATION_DELAY_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ImportConfig {
    /// Load configuration from an optional TOML file and the environment.
    ///
    /// An explicit `path` must exist. Without one, `pim.toml` in the working
    /// directory is used if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        config.merge_env()
    }

    /// Parse a TOML config file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ImportError::config(format!("cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ImportError::config(format!("invalid TOML: {}", e)))
    }

    /// Override fields with whatever `PIM_*` variables are set.
    ///
    /// `PIM_API_BASE_URL` replaces all endpoints; the per-endpoint variables
    /// are applied after it.
    pub fn merge_env(mut self) -> Result<Self> {
        if let Ok(base) = std::env::var("PIM_API_BASE_URL") {
            self.api = ApiEndpoints::from_base(&base);
        }

        if let Ok(url) = std::env::var("PIM_PRESIGNED_URL") {
            self.api.presigned_url = url;
        }

        if let Ok(url) = std::env::var("PIM_PROCESS_FILE_URL") {
            self.api.process_file_url = url;
        }

        if let Ok(url) = std::env::var("PIM_JOB_STATUS_URL") {
            self.api.job_status_base = url;
        }

        if let Ok(url) = std::env::var("PIM_APPROVE_URL") {
            self.api.approve_url = url;
        }

        if let Ok(bucket) = std::env::var("PIM_UPLOAD_BUCKET") {
            self.upload_bucket = bucket;
        }

        if let Some(ms) = env_number("PIM_POLL_INTERVAL_MS")? {
            self.poll_interval_ms = ms;
        }

        if let Some(count) = env_number("PIM_MAX_POLLS")? {
            self.max_polls = count;
        }

        if let Some(ms) = env_number("PIM_PROPAGATION_DELAY_MS")? {
            self.propagation_delay_ms = ms;
        }

        if let Some(secs) = env_number("PIM_REQUEST_TIMEOUT_SECS")? {
            self.request_timeout_secs = secs;
        }

        Ok(self)
    }

    /// Check that the configuration can drive an import.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(ImportError::config("poll_interval_ms must be greater than zero"));
        }

        if self.poll_interval_ms > MAX_POLL_INTERVAL_MS {
            return Err(ImportError::config(format!(
                "poll_interval_ms must be at most {} (one day)",
                MAX_POLL_INTERVAL_MS
            )));
        }

        if self.max_polls == 0 {
            return Err(ImportError::config("max_polls must be greater than zero"));
        }

        if self.request_timeout_secs == 0 {
            return Err(ImportError::config("request_timeout_secs must be greater than zero"));
        }

        if self.upload_bucket.trim().is_empty() {
            return Err(ImportError::config("upload_bucket is empty"));
        }

        for (name, url) in self.api.entries() {
            if url.trim().is_empty() {
                return Err(ImportError::config(format!("endpoint '{}' is empty", name)));
            }
            if url.contains(PLACEHOLDER_MARKER) {
                return Err(ImportError::config(format!(
                    "endpoint '{}' still contains the {} placeholder",
                    name, PLACEHOLDER_MARKER
                )));
            }
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ImportError::config(format!(
                    "endpoint '{}' must be an http(s) URL, got '{}'",
                    name, url
                )));
            }
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn propagation_delay(&self) -> Duration {
        Duration::from_millis(self.propagation_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Longest time the importer waits for a job before giving up.
    pub fn poll_budget(&self) -> Duration {
        self.poll_interval().saturating_mul(self.max_polls)
    }

    /// Timing and bucket settings for an [`ImportSession`](crate::import::ImportSession).
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            upload_bucket: self.upload_bucket.clone(),
            poll_interval: self.poll_interval(),
            max_polls: self.max_polls,
            propagation_delay: self.propagation_delay(),
        }
    }
}

fn env_number<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ImportError::config(format!("{} must be a non-negative integer, got '{}'", name, raw))),
        Err(_) => Ok(None),
    }
}
