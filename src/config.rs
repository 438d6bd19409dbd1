use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::errors::{FeeError, Result};
use crate::events::EventStore;
use crate::types::{AcademicPeriod, Term};

/// reconciliation engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub store: StoreConfig,
    pub admission: AdmissionConfig,
    pub billing: BillingConfig,
    pub cache: CacheConfig,
    pub events: EventConfig,
    pub log: LogConfig,
}

/// where the fee-structure and payment stores live
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub auth_token: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            timeout_secs: 15,
            auth_token: None,
        }
    }
}

/// admission term used when a student has no enrollment date
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    pub fallback: AcademicPeriod,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            fallback: AcademicPeriod::new(Term::Term3, 2025),
        }
    }
}

/// billing-type synonyms layered over the built-in table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    pub version: Option<u32>,
    pub synonyms: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// how many audit events the engine keeps; the oldest are dropped first
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    pub capacity: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            capacity: EventStore::DEFAULT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl EngineConfig {
    /// config pointing at a running api
    pub fn local(base_url: &str) -> Self {
        Self {
            store: StoreConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                ..StoreConfig::default()
            },
            ..Self::default()
        }
    }

    /// config for in-process stores; caching off so every read hits the store
    pub fn offline() -> Self {
        Self {
            cache: CacheConfig { enabled: false },
            ..Self::default()
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(raw).map_err(|e| FeeError::InvalidConfiguration {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| FeeError::InvalidConfiguration {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.store.base_url.trim().is_empty() {
            return Err(FeeError::InvalidConfiguration {
                message: "store.base_url must not be empty".to_string(),
            });
        }
        reqwest::Url::parse(&self.store.base_url).map_err(|e| FeeError::InvalidConfiguration {
            message: format!("store.base_url is not a url: {}", e),
        })?;
        if self.store.timeout_secs == 0 {
            return Err(FeeError::InvalidConfiguration {
                message: "store.timeout_secs must be positive".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.store.timeout_secs, 15);
        assert_eq!(config.admission.fallback, AcademicPeriod::new(Term::Term3, 2025));
        assert!(config.cache.enabled);
        assert_eq!(config.events.capacity, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let raw = r#"
            [store]
            base_url = "https://school.example.org/api"
            timeout_secs = 5

            [admission.fallback]
            term = "Term 1"
            year = 2024

            [billing]
            version = 3

            [billing.synonyms]
            "Bus Fare" = "transport"

            [cache]
            enabled = false

            [events]
            capacity = 16
        "#;

        let config = EngineConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.store.base_url, "https://school.example.org/api");
        assert_eq!(config.store.timeout_secs, 5);
        assert_eq!(config.admission.fallback, AcademicPeriod::new(Term::Term1, 2024));
        assert_eq!(config.billing.version, Some(3));
        assert_eq!(config.billing.synonyms.get("Bus Fare").map(String::as_str), Some("transport"));
        assert!(!config.cache.enabled);
        assert_eq!(config.events.capacity, 16);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(EngineConfig::from_toml_str("[store]\nbase_url = \"\"").is_err());
        assert!(EngineConfig::from_toml_str("[store]\ntimeout_secs = 0").is_err());
        assert!(EngineConfig::from_toml_str("[store]\nbase_url = \"not a url\"").is_err());
        assert!(EngineConfig::from_toml_str("[admission.fallback]\nterm = \"Term 9\"\nyear = 2025").is_err());
    }

    #[test]
    fn test_local_preset_trims_slash() {
        let config = EngineConfig::local("http://127.0.0.1:8080/api/");
        assert_eq!(config.store.base_url, "http://127.0.0.1:8080/api");
    }
}
