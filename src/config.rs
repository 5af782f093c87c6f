//! Settings: product server, tracker endpoints, retry policy, collector filters.
//!
//! Load order is defaults, then a YAML file, then `ISSUEGATE_*` environment
//! variables. A `.env` file, when present, is loaded into the environment
//! by the binary before settings are read.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ports::filesystem::FileSystem;
use crate::resolve::RetryPolicy;
use crate::version::Version;

/// Default settings file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "issuegate.yaml";

/// The product server the tests run against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Product version, compared against fix versions.
    pub version: Option<String>,
    /// Server hostname, recorded in cache metadata.
    pub hostname: Option<String>,
}

/// Endpoint and credentials for one tracker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSettings {
    /// Base URL of the tracker.
    pub url: String,
    /// API key sent as a bearer token.
    pub api_key: Option<String>,
}

/// Retry settings for tracker calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Fixed wait between attempts, in seconds.
    pub fixed_delay_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self { max_attempts: 4, fixed_delay_secs: 20 }
    }
}

/// Collector behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorSettings {
    /// Node-id prefixes excluded from issue processing.
    pub exclude_prefixes: Vec<String>,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self { exclude_prefixes: vec!["tests/robottelo/".to_string()] }
    }
}

/// All settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Product server.
    pub server: ServerSettings,
    /// Bugzilla endpoint.
    pub bugzilla: TrackerSettings,
    /// Jira endpoint.
    pub jira: TrackerSettings,
    /// Retry policy for tracker calls.
    pub retry: RetrySettings,
    /// Collector filters.
    pub collector: CollectorSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            bugzilla: TrackerSettings {
                url: "https://bugzilla.redhat.com".to_string(),
                api_key: None,
            },
            jira: TrackerSettings { url: "https://issues.redhat.com".to_string(), api_key: None },
            retry: RetrySettings::default(),
            collector: CollectorSettings::default(),
        }
    }
}

impl Settings {
    /// Loads settings from `path` (or the default locations) through `fs`
    /// and applies environment overrides.
    ///
    /// An explicitly given file must exist; the default file is optional.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(fs: &dyn FileSystem, path: Option<&Path>) -> Result<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| env::var("ISSUEGATE_CONFIG").ok().map(PathBuf::from));
        let default_file = Path::new(DEFAULT_CONFIG_FILE);
        let mut settings = match explicit {
            Some(path) => Self::from_file(fs, &path)?,
            None if fs.exists(default_file) => Self::from_file(fs, default_file)?,
            None => Self::default(),
        };
        settings.apply_env(|key| env::var(key).ok());
        Ok(settings)
    }

    /// Parses settings from a YAML file read through `fs`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        let content = fs
            .read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_yaml(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Parses settings from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Applies `ISSUEGATE_*` overrides using `lookup` to read variables.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("ISSUEGATE_SERVER_VERSION") {
            self.server.version = Some(v);
        }
        if let Some(v) = lookup("ISSUEGATE_SERVER_HOSTNAME") {
            self.server.hostname = Some(v);
        }
        if let Some(v) = lookup("ISSUEGATE_BUGZILLA_URL") {
            self.bugzilla.url = v;
        }
        if let Some(v) = lookup("ISSUEGATE_BUGZILLA_API_KEY") {
            self.bugzilla.api_key = Some(v);
        }
        if let Some(v) = lookup("ISSUEGATE_JIRA_URL") {
            self.jira.url = v;
        }
        if let Some(v) = lookup("ISSUEGATE_JIRA_API_KEY") {
            self.jira.api_key = Some(v);
        }
    }

    /// The configured product version, or `0` when unset or unparseable.
    #[must_use]
    pub fn server_version(&self) -> Version {
        self.server.version.as_deref().and_then(Version::extract).unwrap_or_else(Version::zero)
    }

    /// The retry policy for tracker calls.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts.max(1),
            fixed_delay: Duration::from_secs(self.retry.fixed_delay_secs),
        }
    }
}
