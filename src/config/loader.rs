//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable naming a config file to load at startup.
pub const CONFIG_PATH_ENV: &str = "FIB_CONFIG";

/// Environment variable carrying the trace-backend access credential.
pub const ACCESS_TOKEN_ENV: &str = "LS_ACCESS_TOKEN";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: ServiceConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Resolve the startup configuration: the file named by `FIB_CONFIG` when
/// set, defaults otherwise, with environment overrides applied on top.
pub fn resolve_config() -> Result<ServiceConfig, ConfigError> {
    let mut config = match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) => load_config(Path::new(&path))?,
        Err(_) => ServiceConfig::default(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Apply environment overrides. Values are treated as opaque strings.
pub fn apply_env_overrides(config: &mut ServiceConfig) {
    if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
        config.telemetry.access_token = token;
    }
}
