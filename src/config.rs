//! Configuration types for zine-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Distribution site and credential configuration
///
/// Groups everything needed to establish an authenticated session.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Base URL of the distribution site
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the login endpoint, relative to the base URL
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Path of the authenticated archive landing page
    #[serde(default = "default_archive_path")]
    pub archive_path: String,

    /// Account username
    pub username: String,

    /// Account password
    pub password: String,

    /// Per-request timeout applied to every HTTP call in a run (default: 60s)
    ///
    /// This is the only bound on an individual stuck download; there is no
    /// batch-level timeout or cancellation.
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            login_path: default_login_path(),
            archive_path: default_archive_path(),
            username: String::new(),
            password: String::new(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Download behavior configuration (destination tree, concurrency, skipping)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Download directory (default: "./downloads")
    ///
    /// Files land at `<download_dir>/<group-id>/<decoded-filename>`.
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Maximum concurrent downloads (default: 4)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    /// Skip files whose destination path already exists (default: true)
    ///
    /// The existence probe is advisory, not transactional: a file appearing
    /// between the check and the write is overwritten.
    #[serde(default = "default_true")]
    pub skip_existing: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            max_concurrent_downloads: default_max_concurrent(),
            skip_existing: true,
        }
    }
}

/// Slack notification configuration
///
/// Present only when notification is enabled; both the token and the channel
/// list are required to construct it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Bot token used as the bearer credential on upload calls
    pub token: String,

    /// Comma-separated channel list, passed through to the upload call
    pub channels: String,

    /// Base URL of the Slack Web API (default: "https://slack.com/api")
    ///
    /// Overridable so tests can point uploads at a local mock server.
    #[serde(default = "default_slack_api_base")]
    pub api_base: String,

    /// Only files whose name ends with one of these suffixes are forwarded
    /// (default: [".pdf"])
    #[serde(default = "default_notify_suffixes")]
    pub notify_suffixes: Vec<String>,

    /// Timeout for a single upload call (default: 30s)
    #[serde(default = "default_upload_timeout", with = "duration_serde")]
    pub upload_timeout: Duration,
}

impl SlackConfig {
    /// Create a Slack configuration from the required token/channels pair,
    /// with defaults for everything else
    pub fn new(token: impl Into<String>, channels: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            channels: channels.into(),
            api_base: default_slack_api_base(),
            notify_suffixes: default_notify_suffixes(),
            upload_timeout: default_upload_timeout(),
        }
    }
}

/// Main configuration for [`ZineDownloader`](crate::ZineDownloader)
///
/// Fields are organized into logical sub-configs:
/// - [`site`](SiteConfig) — base URL, endpoints, credentials, request timeout
/// - [`download`](DownloadConfig) — destination tree, concurrency, skipping
/// - [`slack`](SlackConfig) — optional notification settings
///
/// Sub-config fields are flattened for serialization, so the JSON/TOML format
/// stays flat with no nesting.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Site and credential settings
    #[serde(flatten)]
    pub site: SiteConfig,

    /// Download behavior settings
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// Notification settings (None disables the notifier entirely)
    #[serde(default)]
    pub slack: Option<SlackConfig>,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// `USERNAME` and `PASSWORD` are required; a missing or empty value is a
    /// [`Error::Config`] whose message is suitable for printing directly to
    /// an operator. `SLACK_TOKEN` and `SLACK_CHANNELS` enable notification
    /// only when both are present; exactly one of the pair logs a warning
    /// and leaves notification disabled. `ZINE_BASE_URL` optionally overrides
    /// the site base URL.
    pub fn from_env() -> Result<Self> {
        let username = require_env("USERNAME")?;
        let password = require_env("PASSWORD")?;

        let mut site = SiteConfig {
            username,
            password,
            ..SiteConfig::default()
        };
        if let Ok(base) = std::env::var("ZINE_BASE_URL")
            && !base.is_empty()
        {
            site.base_url = base;
        }

        let slack = match (optional_env("SLACK_TOKEN"), optional_env("SLACK_CHANNELS")) {
            (Some(token), Some(channels)) => Some(SlackConfig::new(token, channels)),
            (None, None) => None,
            _ => {
                tracing::warn!(
                    "SLACK_TOKEN and SLACK_CHANNELS must both be set to enable notifications; \
                     notification stays disabled"
                );
                None
            }
        };

        Ok(Self {
            site,
            download: DownloadConfig::default(),
            slack,
        })
    }
}

/// Read a required environment variable, treating an empty value as absent
fn require_env(key: &str) -> Result<String> {
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::config(
            format!("environment variable {key} must be set"),
            key,
        )),
    }
}

/// Read an optional environment variable, treating an empty value as absent
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn default_base_url() -> String {
    "https://magazines.example.com".to_string()
}

fn default_login_path() -> String {
    "/login.php".to_string()
}

fn default_archive_path() -> String {
    "/archive.php".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_max_concurrent() -> usize {
    crate::scheduler::DEFAULT_MAX_CONCURRENCY
}

fn default_true() -> bool {
    true
}

fn default_slack_api_base() -> String {
    "https://slack.com/api".to_string()
}

fn default_notify_suffixes() -> Vec<String> {
    vec![".pdf".to_string()]
}

fn default_upload_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Serde module for serializing/deserializing Duration as seconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
