//! Configuration management for routeplanner.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::RouteError;
use crate::maps::service::RouteSelection;
use crate::types::TrafficModel;

/// Value shipped in the generated config file; never a usable key.
pub const API_KEY_PLACEHOLDER: &str = "YOUR_GOOGLE_MAPS_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub google_maps: GoogleMapsConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub costs: CostConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleMapsConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_key_env() -> String {
    "GOOGLE_MAPS_API_KEY".to_string()
}

fn default_api_base() -> String {
    "https://maps.googleapis.com/maps/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Listener settings. The stdio front-end ignores these; they are kept so
/// one config file can serve a networked deployment too.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    #[serde(default)]
    pub default_traffic_model: TrafficModel,
    #[serde(default = "default_max_waypoints")]
    pub max_waypoints: usize,
    #[serde(default = "default_max_alternatives")]
    pub max_alternatives: usize,
    #[serde(default = "default_units")]
    pub units: String,
    #[serde(default)]
    pub route_selection: RouteSelection,
}

fn default_max_waypoints() -> usize {
    25 // provider limit for standard requests
}

fn default_max_alternatives() -> usize {
    3
}

fn default_units() -> String {
    "metric".to_string()
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            default_traffic_model: TrafficModel::default(),
            max_waypoints: default_max_waypoints(),
            max_alternatives: default_max_alternatives(),
            units: default_units(),
            route_selection: RouteSelection::default(),
        }
    }
}

/// Defaults used by the cost estimator when the caller omits vehicle data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostConfig {
    pub fuel_price_per_liter: f64,
    pub fuel_efficiency_l_per_100km: f64,
    pub toll_estimate_per_km: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            fuel_price_per_liter: 1.50,
            fuel_efficiency_l_per_100km: 8.0,
            toll_estimate_per_km: 0.05,
            currency: default_currency(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            google_maps: GoogleMapsConfig {
                api_key: Some(API_KEY_PLACEHOLDER.to_string()),
                api_key_env: default_api_key_env(),
                api_base: default_api_base(),
                timeout_secs: default_timeout_secs(),
            },
            server: ServerConfig::default(),
            routing: RoutingConfig::default(),
            costs: CostConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".routeplanner").join("config.toml"))
    }

    /// Load from `path`, or built-in defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        if let Ok(api_base) = std::env::var("ROUTEPLANNER_API_BASE") {
            config.google_maps.api_base = api_base;
        }
        if let Ok(model) = std::env::var("ROUTEPLANNER_TRAFFIC_MODEL") {
            config.routing.default_traffic_model =
                serde_json::from_value(serde_json::Value::String(model.clone()))
                    .with_context(|| format!("Invalid ROUTEPLANNER_TRAFFIC_MODEL: {}", model))?;
        }

        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Resolve the provider API key: config file first, then the env var.
    ///
    /// A missing key or the shipped placeholder is a configuration error.
    pub fn api_key(&self) -> std::result::Result<String, RouteError> {
        let from_file = self
            .google_maps
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty() && *k != API_KEY_PLACEHOLDER);
        if let Some(key) = from_file {
            return Ok(key.to_string());
        }

        match std::env::var(&self.google_maps.api_key_env) {
            Ok(key) if !key.trim().is_empty() && key.trim() != API_KEY_PLACEHOLDER => {
                Ok(key.trim().to_string())
            }
            _ => Err(RouteError::Configuration(format!(
                "Google Maps API key not set. Either:\n  \
                 1. Set google_maps.api_key in the config file\n  \
                 2. Set environment variable: export {}=your-key",
                self.google_maps.api_key_env
            ))),
        }
    }

    pub fn save_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let content =
            toml::to_string_pretty(&Self::default()).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key(key: Option<&str>) -> AppConfig {
        let mut config = AppConfig::default();
        config.google_maps.api_key = key.map(str::to_string);
        // Point at a variable no test environment defines.
        config.google_maps.api_key_env = "ROUTEPLANNER_TEST_UNSET_KEY_VAR".to_string();
        config
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.routing.default_traffic_model, TrafficModel::BestGuess);
        assert_eq!(config.routing.max_waypoints, 25);
        assert_eq!(config.costs.fuel_price_per_liter, 1.50);
        assert_eq!(config.costs.fuel_efficiency_l_per_100km, 8.0);
        assert_eq!(config.costs.toll_estimate_per_km, 0.05);
    }

    #[test]
    fn test_api_key_from_file() {
        let config = config_with_key(Some("abc123"));
        assert_eq!(config.api_key().unwrap(), "abc123");
    }

    #[test]
    fn test_placeholder_key_rejected() {
        let config = config_with_key(Some(API_KEY_PLACEHOLDER));
        let err = config.api_key().unwrap_err();
        assert!(matches!(err, RouteError::Configuration(_)));
    }

    #[test]
    fn test_missing_key_rejected() {
        let config = config_with_key(None);
        assert!(matches!(
            config.api_key(),
            Err(RouteError::Configuration(_))
        ));
    }

    #[test]
    fn test_minimal_toml_uses_section_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [google_maps]
            api_key = "k"

            [routing]
            default_traffic_model = "pessimistic"
            "#,
        )
        .unwrap();
        assert_eq!(config.google_maps.api_base, default_api_base());
        assert_eq!(
            config.routing.default_traffic_model,
            TrafficModel::Pessimistic
        );
        assert_eq!(config.routing.max_alternatives, 3);
        assert_eq!(config.costs.currency, "USD");
    }

    #[test]
    fn test_save_and_load_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        AppConfig::save_default(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(
            loaded.google_maps.api_key.as_deref(),
            Some(API_KEY_PLACEHOLDER)
        );
        assert_eq!(loaded.server.port, 3000);
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is = = not toml").unwrap();
        assert!(AppConfig::load(&path).is_err());
    }
}
