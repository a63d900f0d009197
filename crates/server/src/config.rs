//! Configuration loading and validation for the attribute encryption service.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any required variable is missing or invalid.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Validated service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path of the JSON key file (`keys`, `current_key_id`, optional
    /// `identity_binding`). **Required.**
    pub keys_file: String,

    /// Directory holding the OpenAPI record schemas. **Required.**
    pub schema_dir: String,

    /// HTTP header used to identify which schema to apply.
    #[serde(default = "default_schema_header")]
    pub schema_header_name: String,

    /// How often (seconds) to re-read the key file.
    #[serde(default = "default_key_reload_interval")]
    pub key_reload_interval_secs: u64,

    /// How often (seconds) to re-read the schema directory.
    #[serde(default = "default_schema_refresh_interval")]
    pub schema_refresh_interval_secs: u64,

    /// Port the HTTP server listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// OTLP endpoint for trace export. Traces are only exported when set.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_schema_header() -> String {
    "X-Schema-Name".into()
}
fn default_key_reload_interval() -> u64 {
    300
}
fn default_schema_refresh_interval() -> u64 {
    300
}
fn default_listen_port() -> u16 {
    8080
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// OTLP endpoint, treating an empty value as unset.
    pub fn otlp_endpoint(&self) -> Option<&str> {
        self.otel_exporter_otlp_endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.keys_file, "KEYS_FILE")?;
        ensure_non_empty(&self.schema_dir, "SCHEMA_DIR")?;
        ensure_non_empty(&self.schema_header_name, "SCHEMA_HEADER_NAME")?;

        if self.key_reload_interval_secs == 0 {
            anyhow::bail!("KEY_RELOAD_INTERVAL_SECS must be > 0");
        }
        if self.schema_refresh_interval_secs == 0 {
            anyhow::bail!("SCHEMA_REFRESH_INTERVAL_SECS must be > 0");
        }
        Ok(())
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}
