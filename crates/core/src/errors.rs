use thiserror::Error;

use ci_gatekeeper_developer_platforms::errors::Error as PlatformError;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

#[derive(Error, Debug)]
pub enum GatekeeperError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid issue or pull request reference: '{0}'")]
    InvalidReference(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Checks are not finished yet")]
    NotReady,

    #[error("Upstream call failed: {0}")]
    UpstreamFailure(String),
}

impl GatekeeperError {
    /// Returns `true` for outcomes that end an event without telling anyone.
    ///
    /// An unfinished CI round or a commit without an open pull request are expected
    /// situations; a later event will pick up the work.
    pub fn is_silent(&self) -> bool {
        matches!(self, GatekeeperError::NotReady | GatekeeperError::NotFound(_))
    }
}

impl From<PlatformError> for GatekeeperError {
    fn from(e: PlatformError) -> Self {
        GatekeeperError::UpstreamFailure(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Unsupported configuration schema version: {0}")]
    UnsupportedSchemaVersion(u32),
}
