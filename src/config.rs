use anyhow::bail;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

use crate::error::ProvisionError;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub elasticsearch: EsConfig,
    #[serde(default)]
    pub readiness: ReadinessConfig,
    #[serde(default)]
    pub provision: ProvisionConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EsConfig {
    pub url: String,
    pub index_name: String,
    /// Per-request timeout applied by the transport
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Fixed sleep between two failed health checks
    pub interval_ms: u64,
    /// 0 keeps polling forever
    pub max_attempts: u32,
    /// Cluster status the health endpoint waits for, e.g. yellow
    pub wait_for_status: String,
    /// Server-side wait passed to `_cluster/health`, e.g. 10s
    pub health_timeout: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    pub failure_mode: FailureMode,
    pub force_recreate: bool,
    pub verify_mapping: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Log a failed step and keep going
    #[default]
    BestEffort,
    /// Stop at the first failed step
    FailFast,
}

impl FromStr for FailureMode {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "best_effort" => Ok(Self::BestEffort),
            "fail_fast" => Ok(Self::FailFast),
            other => Err(ProvisionError::Config(format!(
                "unknown failure mode '{other}', expected best_effort or fail_fast"
            ))),
        }
    }
}

impl Default for EsConfig {
    fn default() -> Self {
        Self {
            url: "http://elasticsearch:9200".into(),
            index_name: "address_places".into(),
            request_timeout_secs: 15,
        }
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            interval_ms: 5000,
            max_attempts: 60,
            wait_for_status: "yellow".into(),
            health_timeout: "10s".into(),
        }
    }
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            failure_mode: FailureMode::BestEffort,
            force_recreate: false,
            verify_mapping: true,
        }
    }
}

impl AppConfig {
    /// Loads `config.toml` when present. An explicitly requested `path` must
    /// exist.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        // Step 1: Try loading .env file (silently ignore if not found)
        let _ = dotenvy::dotenv();

        if let Some(path) = path
            && !path.exists()
        {
            bail!("Config file '{}' not found", path.display());
        }
        let path = path.unwrap_or(Path::new(DEFAULT_CONFIG_PATH));

        // Step 2: Try loading TOML config as base
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str::<AppConfig>(&content)?
        } else {
            AppConfig::defaults()
        };

        // Step 3: Override with environment variables where present
        config.apply_env(|key| std::env::var(key).ok())?;

        Ok(config)
    }

    pub fn defaults() -> Self {
        Self {
            elasticsearch: EsConfig::default(),
            readiness: ReadinessConfig::default(),
            provision: ProvisionConfig::default(),
        }
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("ELASTICSEARCH_URL") {
            self.elasticsearch.url = url;
        }
        if let Some(index) = lookup("ELASTICSEARCH_INDEX") {
            self.elasticsearch.index_name = index;
        }
        if let Some(val) = lookup("ELASTICSEARCH_REQUEST_TIMEOUT_SECS") {
            self.elasticsearch.request_timeout_secs = val.parse()?;
        }
        if let Some(val) = lookup("READINESS_INTERVAL_MS") {
            self.readiness.interval_ms = val.parse()?;
        }
        if let Some(val) = lookup("READINESS_MAX_ATTEMPTS") {
            self.readiness.max_attempts = val.parse()?;
        }
        if let Some(val) = lookup("READINESS_WAIT_FOR_STATUS") {
            self.readiness.wait_for_status = val;
        }
        if let Some(val) = lookup("READINESS_HEALTH_TIMEOUT") {
            self.readiness.health_timeout = val;
        }
        if let Some(val) = lookup("PROVISION_FAILURE_MODE") {
            self.provision.failure_mode = val.parse()?;
        }
        if let Some(val) = lookup("PROVISION_FORCE_RECREATE") {
            self.provision.force_recreate = val.parse()?;
        }
        if let Some(val) = lookup("PROVISION_VERIFY_MAPPING") {
            self.provision.verify_mapping = val.parse()?;
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if let Err(e) = url::Url::parse(&self.elasticsearch.url) {
            bail!(
                "Invalid Elasticsearch URL '{}': {e}. Set ELASTICSEARCH_URL or elasticsearch.url in config.toml",
                self.elasticsearch.url
            );
        }

        let index = &self.elasticsearch.index_name;
        if index.is_empty() || index.chars().any(|c| c.is_ascii_uppercase()) {
            bail!("Index name must be non-empty and lowercase, got '{index}'");
        }

        if self.readiness.interval_ms == 0 {
            bail!("readiness.interval_ms must be greater than zero");
        }

        if !matches!(
            self.readiness.wait_for_status.as_str(),
            "green" | "yellow" | "red"
        ) {
            bail!(
                "readiness.wait_for_status must be green, yellow or red, got '{}'",
                self.readiness.wait_for_status
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_keep_literal_engine_address() {
        let config = AppConfig::defaults();
        assert_eq!(config.elasticsearch.url, "http://elasticsearch:9200");
        assert_eq!(config.elasticsearch.index_name, "address_places");
        assert_eq!(config.readiness.interval_ms, 5000);
        assert_eq!(config.provision.failure_mode, FailureMode::BestEffort);
        assert!(config.provision.verify_mapping);
        config.validate().unwrap();
    }

    #[test]
    fn env_overrides_defaults() {
        let vars = env(&[
            ("ELASTICSEARCH_URL", "http://localhost:9201"),
            ("READINESS_MAX_ATTEMPTS", "0"),
            ("PROVISION_FAILURE_MODE", "fail-fast"),
            ("PROVISION_FORCE_RECREATE", "true"),
        ]);
        let mut config = AppConfig::defaults();
        config.apply_env(|k| vars.get(k).cloned()).unwrap();

        assert_eq!(config.elasticsearch.url, "http://localhost:9201");
        assert_eq!(config.readiness.max_attempts, 0);
        assert_eq!(config.provision.failure_mode, FailureMode::FailFast);
        assert!(config.provision.force_recreate);
        assert_eq!(config.elasticsearch.index_name, "address_places");
    }

    #[test]
    fn env_rejects_unparsable_numbers() {
        let vars = env(&[("READINESS_INTERVAL_MS", "soon")]);
        let mut config = AppConfig::defaults();
        assert!(config.apply_env(|k| vars.get(k).cloned()).is_err());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [elasticsearch]
            url = "http://search.internal:9200"

            [provision]
            failure_mode = "fail_fast"
            "#,
        )
        .unwrap();

        assert_eq!(config.elasticsearch.url, "http://search.internal:9200");
        assert_eq!(config.elasticsearch.index_name, "address_places");
        assert_eq!(config.readiness.wait_for_status, "yellow");
        assert_eq!(config.provision.failure_mode, FailureMode::FailFast);
        assert!(config.provision.verify_mapping);
    }

    #[test]
    fn explicit_missing_config_file_is_an_error() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/places-search-init/prod.toml")))
            .unwrap_err();
        assert!(err.to_string().contains("prod.toml"));
    }

    #[test]
    fn explicit_config_file_is_read() {
        let path = std::env::temp_dir().join(format!(
            "places-search-init-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[readiness]\nhealth_timeout = \"42s\"\n").unwrap();

        let loaded = AppConfig::load(Some(&path));
        std::fs::remove_file(&path).unwrap();

        let config = loaded.unwrap();
        assert_eq!(config.readiness.health_timeout, "42s");
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = AppConfig::defaults();
        config.elasticsearch.index_name = "Address_Places".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::defaults();
        config.readiness.wait_for_status = "orange".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::defaults();
        config.elasticsearch.url = "not a url".into();
        assert!(config.validate().is_err());
    }
}
