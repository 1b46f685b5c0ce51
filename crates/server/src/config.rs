use std::path::Path;

use ci_gatekeeper_core::config::{load_gatekeeper_config, GatekeeperConfig};
use ci_gatekeeper_developer_platforms::cirrus::CIRRUS_API_URL;
use tracing::info;

use crate::errors::ServerError;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

pub const DEFAULT_PORT: u16 = 3000;

pub const ENV_APP_ID: &str = "GITHUB_APP_ID";
pub const ENV_APP_PRIVATE_KEY: &str = "GITHUB_APP_PRIVATE_KEY";
pub const ENV_WEBHOOK_SECRET: &str = "GITHUB_WEBHOOK_SECRET";
pub const ENV_PORT: &str = "CI_GATEKEEPER_PORT";
pub const ENV_CIRRUS_API_URL: &str = "CIRRUS_API_URL";

/// Settings of the running server.
#[derive(Clone)]
pub struct AppConfig {
    pub app_id: u64,
    pub app_private_key: String,
    pub webhook_secret: String,
    pub port: u16,
    pub cirrus_api_url: String,

    /// Used for repositories without a configuration file of their own.
    pub defaults: GatekeeperConfig,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("app_id", &self.app_id)
            .field("port", &self.port)
            .field("cirrus_api_url", &self.cirrus_api_url)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    /// Reads the settings from the process environment.
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the settings through `lookup`, which returns the value of a variable
    /// when it is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ServerError::ConfigError(format!("{key} is not set")))
        };

        let app_id = required(ENV_APP_ID)?.trim().parse::<u64>().map_err(|_| {
            ServerError::ConfigError(format!("{ENV_APP_ID} must be a numeric app ID"))
        })?;

        // Keys stored in single-line secrets carry escaped newlines
        let app_private_key = required(ENV_APP_PRIVATE_KEY)?.replace("\\n", "\n");
        let webhook_secret = required(ENV_WEBHOOK_SECRET)?;

        let port = match lookup(ENV_PORT) {
            Some(value) => value.trim().parse::<u16>().map_err(|_| {
                ServerError::ConfigError(format!("{ENV_PORT} must be a port number"))
            })?,
            None => DEFAULT_PORT,
        };

        let cirrus_api_url = lookup(ENV_CIRRUS_API_URL).unwrap_or_else(|| CIRRUS_API_URL.to_string());

        Ok(Self {
            app_id,
            app_private_key,
            webhook_secret,
            port,
            cirrus_api_url,
            defaults: GatekeeperConfig::default(),
        })
    }

    /// Replaces the default gatekeeper configuration with the one stored at `path`.
    pub fn with_defaults_from(mut self, path: &Path) -> Result<Self, ServerError> {
        self.defaults = load_gatekeeper_config(path)
            .map_err(|e| ServerError::ConfigError(e.to_string()))?;
        info!(path = %path.display(), "Loaded default gatekeeper configuration");
        Ok(self)
    }
}
