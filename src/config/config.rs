use figment::providers::Env;
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use crate::error::{Error, Result};

/// Origin allowed when neither FRONTEND_ORIGINS nor FRONTEND_ORIGIN is set.
pub const DEFAULT_ORIGIN: &str = "https://frontend-dev-e7yt.onrender.com";

/// Production authorize endpoint. B2_AUTH_URL overrides it, which is also how
/// the tests point the HTTP path at a mock server.
pub const DEFAULT_AUTH_URL: &str = "https://api.backblazeb2.com";

/// Everything a run needs, sourced once from the environment.
///
/// B2_APPLICATION_KEY and B2_BUCKET_ID are mandatory; the rest are optional
/// with defaults or fallback discovery. Empty values are treated as unset, so
/// `FOO=` in a CI environment behaves like an absent variable.
#[derive(Deserialize, Serialize, Debug, Default, JsonSchema)]
pub struct Config {
    pub account_id: Option<String>,
    pub application_key_id: Option<String>,
    pub application_key: Option<String>,
    pub bucket_id: Option<String>,
    /// Explicit path to the b2 executable, skipping discovery.
    pub cli_path: Option<String>,
    /// Comma-separated list of allowed origins.
    pub frontend_origins: Option<String>,
    /// Single-origin spelling, consulted when FRONTEND_ORIGINS is unset.
    pub frontend_origin: Option<String>,
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_auth_url() -> String {
    DEFAULT_AUTH_URL.to_string()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Returns the mandatory (application key, bucket id) pair, or the
    /// configuration error that must stop the run before any tool or network
    /// activity.
    pub fn mandatory(&self) -> Result<(&str, &str)> {
        match (non_empty(&self.application_key), non_empty(&self.bucket_id)) {
            (Some(key), Some(bucket)) => Ok((key, bucket)),
            _ => Err(Error::MissingConfig(
                "Set B2_APPLICATION_KEY and B2_BUCKET_ID (and optionally \
                 B2_APPLICATION_KEY_ID/B2_ACCOUNT_ID)."
                    .to_string(),
            )),
        }
    }

    pub fn account_id(&self) -> Option<&str> {
        non_empty(&self.account_id)
    }

    pub fn application_key_id(&self) -> Option<&str> {
        non_empty(&self.application_key_id)
    }

    pub fn cli_path(&self) -> Option<&str> {
        non_empty(&self.cli_path)
    }

    /// The allowed-origin list: FRONTEND_ORIGINS, else FRONTEND_ORIGIN, else
    /// the default, split on commas with blanks dropped.
    pub fn origins(&self) -> Vec<String> {
        let raw = non_empty(&self.frontend_origins)
            .or_else(|| non_empty(&self.frontend_origin))
            .unwrap_or(DEFAULT_ORIGIN);
        raw.split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn figment() -> Figment {
    Figment::new()
        .merge(Env::prefixed("B2_"))
        .merge(
            Env::raw()
                .only(&["FRONTEND_ORIGINS", "FRONTEND_ORIGIN"])
                .map(|key| key.as_str().to_lowercase().into()),
        )
        .merge(
            // LOG_LEVEL -> logging.level, LOG_FORMAT -> logging.format
            Env::raw()
                .only(&["LOG_LEVEL", "LOG_FORMAT"])
                .map(|key| key.as_str().to_lowercase().replace("log_", "logging_").into())
                .split("_"),
        )
}

/// Load config from the environment (B2_* plus the FRONTEND_ORIGIN(S) and
/// LOG_* variables).
pub fn load_config() -> Config {
    match figment().extract::<Config>() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    }
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() {
    let schema = schema_for!(Config);
    println!("{}", serde_json::to_string_pretty(&schema).unwrap());
}
