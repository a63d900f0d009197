//! OpenAPI schema loading, encrypted attribute resolution, and caching.
//!
//! # Responsibilities
//!
//! - Read OpenAPI documents from the schema directory at startup and on a
//!   refresh interval.
//! - Index every property annotated with `x-encrypted: true`.
//! - Serve the attribute paths for a schema name to the request handlers.
//!
//! # Module invariants
//!
//! - **No key dependencies.** This module must not import anything from
//!   `crate::keys`.

pub mod cache;
pub mod resolver;

pub use cache::SchemaCache;

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use openapiv3::OpenAPI;
use tokio::time;
use tracing::{debug, info, warn};

use crate::config::Config;

const SCHEMA_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// Read every schema document in `cfg.schema_dir` and atomically replace the cache.
///
/// Each `.yaml`, `.yml` or `.json` file is parsed as YAML, falling back to
/// JSON. Other files are ignored.
///
/// # Errors
///
/// Returns an error if the directory cannot be listed or any schema file
/// cannot be read or parsed. The cache is left untouched in that case.
pub async fn load_all(cfg: &Config, cache: &SchemaCache) -> Result<()> {
    let dir = Path::new(&cfg.schema_dir);
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("failed to list schema directory {}", dir.display()))?;

    let mut schemas: HashMap<String, OpenAPI> = HashMap::new();

    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("failed to read schema directory {}", dir.display()))?
    {
        let path = entry.path();
        let Some(name) = schema_name_from_path(&path) else {
            debug!(path = %path.display(), "skipping non-schema file");
            continue;
        };

        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read schema {}", path.display()))?;
        let api = parse_schema(&text)
            .with_context(|| format!("failed to parse schema {}", path.display()))?;

        info!(schema = %name, path = %path.display(), "loaded schema");
        schemas.insert(name, api);
    }

    if schemas.is_empty() {
        warn!(dir = %dir.display(), "no schema files found");
    }

    cache.replace_all(schemas);
    info!(count = cache.len(), "schema cache refreshed");
    Ok(())
}

/// Spawn a background task that periodically reloads the schema directory.
///
/// On failure the previous cache contents are retained and a warning is
/// emitted; the service keeps serving with stale schemas.
pub fn refresh_task(cfg: Config, cache: SchemaCache) -> tokio::task::JoinHandle<()> {
    let interval = std::time::Duration::from_secs(cfg.schema_refresh_interval_secs);
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = load_all(&cfg, &cache).await {
                warn!(error = %format!("{e:#}"), "schema refresh failed; retaining previous cache");
            }
        }
    })
}

fn parse_schema(text: &str) -> Result<OpenAPI> {
    if let Ok(parsed) = serde_yaml::from_str(text) {
        return Ok(parsed);
    }
    serde_json::from_str(text).context("not a valid OpenAPI document in YAML or JSON")
}

/// Schema name for a file: its stem, when the extension is a known schema format.
fn schema_name_from_path(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?;
    if !SCHEMA_EXTENSIONS.contains(&ext) {
        return None;
    }
    path.file_stem()?.to_str().map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUSTOMERS_YAML: &str = r#"
openapi: "3.0.0"
info:
  title: customers
  version: "1"
paths: {}
components:
  schemas:
    Customer:
      type: object
      properties:
        email:
          type: string
          x-encrypted: true
"#;

    fn test_config(schema_dir: &Path) -> Config {
        Config {
            keys_file: "/unused".into(),
            schema_dir: schema_dir.display().to_string(),
            schema_header_name: "X-Schema-Name".into(),
            key_reload_interval_secs: 1,
            schema_refresh_interval_secs: 1,
            listen_port: 0,
            otel_exporter_otlp_endpoint: None,
            log_level: "info".into(),
        }
    }

    #[test]
    fn schema_name_uses_stem_of_known_extensions() {
        assert_eq!(
            schema_name_from_path(Path::new("/s/customers-v1.yaml")).as_deref(),
            Some("customers-v1")
        );
        assert_eq!(schema_name_from_path(Path::new("users.json")).as_deref(), Some("users"));
        assert_eq!(schema_name_from_path(Path::new("orders.yml")).as_deref(), Some("orders"));
        assert_eq!(schema_name_from_path(Path::new("README.md")), None);
        assert_eq!(schema_name_from_path(Path::new("bare")), None);
    }

    #[tokio::test]
    async fn load_all_reads_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("customers.yaml"), CUSTOMERS_YAML).unwrap();
        let api: OpenAPI = serde_yaml::from_str(CUSTOMERS_YAML).unwrap();
        std::fs::write(
            dir.path().join("accounts.json"),
            serde_json::to_string(&api).unwrap(),
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let cache = SchemaCache::new();
        load_all(&test_config(dir.path()), &cache).await.unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(&*cache.get("customers").unwrap().attributes, ["email".to_owned()]);
        assert!(cache.get("accounts").is_ok());
    }

    #[tokio::test]
    async fn invalid_schema_keeps_previous_cache() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("customers.yaml"), CUSTOMERS_YAML).unwrap();
        let cfg = test_config(dir.path());
        let cache = SchemaCache::new();
        load_all(&cfg, &cache).await.unwrap();

        std::fs::write(dir.path().join("broken.json"), "{ not an api").unwrap();
        assert!(load_all(&cfg, &cache).await.is_err());
        assert!(cache.get("customers").is_ok());
    }

    #[tokio::test]
    async fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_config(&dir.path().join("absent"));
        assert!(load_all(&cfg, &SchemaCache::new()).await.is_err());
    }
}
