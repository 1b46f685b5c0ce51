//! Configuration settings for the CI Gatekeeper core functionality.
//!
//! This module centralizes configuration constants and settings used throughout
//! the crate. The configuration is stored as TOML, either next to the server or in
//! the repository at [`REPOSITORY_CONFIG_PATH`].
use ci_gatekeeper_developer_platforms::ConfigFetcher;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::errors::ConfigLoadError;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Prefix shared by all labels the gatekeeper manages
pub const CI_LABEL_PREFIX: &str = "ci/";

/// Label applied when the checks of a pull request failed
pub const CI_FAILURE_LABEL: &str = "ci/failure";

/// Label applied when all checks of a pull request passed
pub const CI_SUCCESS_LABEL: &str = "ci/success";

/// CI providers whose check suites take part in aggregation by default
pub const DEFAULT_CI_PROVIDERS: [&str; 2] = ["cirrus-ci", "github-actions"];

/// Location of the per-repository configuration file
pub const REPOSITORY_CONFIG_PATH: &str = ".github/ci-gatekeeper.toml";

/// The only configuration schema version this crate understands
pub const SUPPORTED_SCHEMA_VERSION: u32 = 1;

/// Top-level configuration for ci-gatekeeper
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GatekeeperConfig {
    #[serde(rename = "schemaVersion", default = "default_schema_version")]
    pub schema_version: u32,

    #[serde(default)]
    pub checks: ChecksConfig,

    #[serde(default)]
    pub labels: LabelsConfig,

    #[serde(default)]
    pub merge: MergeConfig,
}

impl Default for GatekeeperConfig {
    fn default() -> Self {
        Self {
            schema_version: SUPPORTED_SCHEMA_VERSION,
            checks: ChecksConfig::default(),
            labels: LabelsConfig::default(),
            merge: MergeConfig::default(),
        }
    }
}

impl GatekeeperConfig {
    /// Parses a configuration from TOML text and validates the schema version.
    pub fn from_toml(content: &str) -> Result<Self, ConfigLoadError> {
        let config: GatekeeperConfig = toml::from_str(content)?;
        if config.schema_version != SUPPORTED_SCHEMA_VERSION {
            return Err(ConfigLoadError::UnsupportedSchemaVersion(
                config.schema_version,
            ));
        }

        Ok(config)
    }
}

/// Which CI providers are considered when aggregating check results
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChecksConfig {
    /// App slugs of the recognised CI providers
    #[serde(default = "ChecksConfig::default_providers")]
    pub providers: Vec<String>,
}

impl ChecksConfig {
    fn default_providers() -> Vec<String> {
        DEFAULT_CI_PROVIDERS.iter().map(|s| s.to_string()).collect()
    }
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            providers: Self::default_providers(),
        }
    }
}

/// How the status label is written to a pull request
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LabelSyncMode {
    /// Replace the whole label set in one call
    #[default]
    Replace,

    /// Remove each stale label, then add the new one
    Sequential,
}

/// Names of the status labels
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabelsConfig {
    /// Labels starting with this prefix are owned by the gatekeeper
    #[serde(default = "LabelsConfig::default_prefix")]
    pub prefix: String,

    #[serde(default = "LabelsConfig::default_success")]
    pub success: String,

    #[serde(default = "LabelsConfig::default_failure")]
    pub failure: String,

    /// Label for cancelled runs. Falls back to the failure label when not set.
    #[serde(default)]
    pub cancelled: Option<String>,

    #[serde(default)]
    pub mode: LabelSyncMode,
}

impl LabelsConfig {
    fn default_prefix() -> String {
        CI_LABEL_PREFIX.to_string()
    }

    fn default_success() -> String {
        CI_SUCCESS_LABEL.to_string()
    }

    fn default_failure() -> String {
        CI_FAILURE_LABEL.to_string()
    }
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            prefix: Self::default_prefix(),
            success: Self::default_success(),
            failure: Self::default_failure(),
            cancelled: None,
            mode: LabelSyncMode::default(),
        }
    }
}

/// Which check suites the merge gate looks at
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum GateScope {
    /// Every check suite on the head commit
    #[default]
    All,

    /// Only check suites from the configured CI providers
    AllowListed,
}

/// Merge instruction settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MergeConfig {
    #[serde(default)]
    pub gate_scope: GateScope,
}

fn default_schema_version() -> u32 {
    SUPPORTED_SCHEMA_VERSION
}

/// Loads the ci-gatekeeper configuration from the given path.
///
/// # Arguments
/// * `path` - Path to the configuration file
///
/// # Returns
/// * `Ok(GatekeeperConfig)` if loaded and valid
/// * `Err(ConfigLoadError)` if the file is missing, malformed or uses an unsupported
///   schema version
pub fn load_gatekeeper_config<P: AsRef<Path>>(path: P) -> Result<GatekeeperConfig, ConfigLoadError> {
    let path_ref = path.as_ref();
    let content = match fs::read_to_string(path_ref) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigLoadError::NotFound(path_ref.display().to_string()));
        }
        Err(e) => return Err(ConfigLoadError::Io(e)),
    };

    GatekeeperConfig::from_toml(&content)
}

/// Loads the configuration stored in a repository at [`REPOSITORY_CONFIG_PATH`].
///
/// Returns `fallback` when the repository has no configuration file, or when the
/// file can't be fetched or parsed. Problems are logged and never fail the event.
pub async fn load_repository_config<F: ConfigFetcher + ?Sized>(
    fetcher: &F,
    repo_owner: &str,
    repo_name: &str,
    fallback: &GatekeeperConfig,
) -> GatekeeperConfig {
    match fetcher
        .fetch_config(repo_owner, repo_name, REPOSITORY_CONFIG_PATH)
        .await
    {
        Ok(Some(content)) => match GatekeeperConfig::from_toml(&content) {
            Ok(config) => {
                debug!(
                    repository_owner = repo_owner,
                    repository = repo_name,
                    "Using repository configuration"
                );
                config
            }
            Err(e) => {
                warn!(
                    repository_owner = repo_owner,
                    repository = repo_name,
                    error = %e,
                    "Invalid repository configuration, using defaults"
                );
                fallback.clone()
            }
        },
        Ok(None) => fallback.clone(),
        Err(e) => {
            warn!(
                repository_owner = repo_owner,
                repository = repo_name,
                error = %e,
                "Failed to fetch repository configuration, using defaults"
            );
            fallback.clone()
        }
    }
}
