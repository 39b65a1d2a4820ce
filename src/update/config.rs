// Update Configuration File Handler
// Loads and saves update configuration from/to a JSON file

use std::fs;
use std::path::{Path, PathBuf};

use crate::update::{Environment, UpdateConfig, UpdateError};

/// Configuration file name
const CONFIG_FILE_NAME: &str = "update_config.json";

/// Environment variable that overrides the configured environment
pub const ENVIRONMENT_VAR: &str = "PRINT_HOST_ENV";

/// Get the configuration file path
/// Stores in the home directory: ~/.print-host/update_config.json
pub fn get_config_path() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".print-host").join(CONFIG_FILE_NAME)
}

/// Load update configuration from the default location,
/// then apply the environment override
pub fn load_config() -> UpdateConfig {
    let mut config = load_config_from(&get_config_path());
    let override_value = std::env::var(ENVIRONMENT_VAR).ok();
    apply_environment_override(&mut config, override_value.as_deref());
    config
}

/// Load update configuration from a file.
/// Returns defaults if the file is missing or unreadable.
pub fn load_config_from(config_path: &Path) -> UpdateConfig {
    if !config_path.exists() {
        log::info!("[UpdateConfig] Config file not found, using defaults");
        return UpdateConfig::default();
    }

    match fs::read_to_string(config_path) {
        Ok(content) => match serde_json::from_str::<UpdateConfig>(&content) {
            Ok(config) => {
                log::info!("[UpdateConfig] Loaded config from {:?}", config_path);
                config
            }
            Err(e) => {
                log::warn!("[UpdateConfig] Failed to parse config: {}, using defaults", e);
                UpdateConfig::default()
            }
        },
        Err(e) => {
            log::warn!("[UpdateConfig] Failed to read config: {}, using defaults", e);
            UpdateConfig::default()
        }
    }
}

/// Replace the configured environment with the override value, if it parses
pub fn apply_environment_override(config: &mut UpdateConfig, value: Option<&str>) {
    let Some(value) = value else {
        return;
    };
    match Environment::parse(value) {
        Some(environment) => {
            log::info!("[UpdateConfig] Environment overridden to {:?}", environment);
            config.environment = environment;
        }
        None => {
            log::warn!(
                "[UpdateConfig] Ignoring unknown {} value: {}",
                ENVIRONMENT_VAR,
                value
            );
        }
    }
}

/// Save update configuration to the default location
pub fn save_config(config: &UpdateConfig) -> Result<(), UpdateError> {
    save_config_to(config, &get_config_path())
}

/// Save update configuration to a file, creating the parent directory
pub fn save_config_to(config: &UpdateConfig, config_path: &Path) -> Result<(), UpdateError> {
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            UpdateError::Config(format!("Failed to create config directory: {}", e))
        })?;
    }

    let json = serde_json::to_string_pretty(config)
        .map_err(|e| UpdateError::Config(format!("Failed to serialize config: {}", e)))?;

    fs::write(config_path, json)
        .map_err(|e| UpdateError::Config(format!("Failed to write config: {}", e)))?;

    log::info!("[UpdateConfig] Saved config to {:?}", config_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_config_path() {
        let path = get_config_path();
        assert!(path.to_string_lossy().contains(".print-host"));
        assert!(path.to_string_lossy().ends_with("update_config.json"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("missing.json"));
        assert_eq!(config, UpdateConfig::default());
    }

    #[test]
    fn test_save_and_load_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let config = UpdateConfig {
            environment: Environment::Development,
            auto_download: true,
            auto_install_on_exit: false,
            startup_check_delay_secs: 30,
        };
        save_config_to(&config, &path).unwrap();

        assert_eq!(load_config_from(&path), config);
    }

    #[test]
    fn test_load_config_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "{ not json").unwrap();

        assert_eq!(load_config_from(&path), UpdateConfig::default());
    }

    #[test]
    fn test_environment_override() {
        let mut config = UpdateConfig::default();

        apply_environment_override(&mut config, Some("development"));
        assert_eq!(config.environment, Environment::Development);

        apply_environment_override(&mut config, Some("nonsense"));
        assert_eq!(config.environment, Environment::Development);

        apply_environment_override(&mut config, None);
        assert_eq!(config.environment, Environment::Development);

        apply_environment_override(&mut config, Some("production"));
        assert_eq!(config.environment, Environment::Production);
    }
}
