//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ResilienceConfig;
use crate::config::validation::{validate_config, ValidationError};

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
pub fn load_config(path: &Path) -> Result<ResilienceConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: ResilienceConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_toml() {
        let raw = r#"
            [cache]
            key_prefix = "bot"
            ttl_secs = 600

            [regions]
            primary_region = "us-east-1"
            failover_threshold = 3

            [[regions.regions]]
            name = "us-east-1"
            status = "active"
            priority = 1
            endpoint = "https://api.use1.example.test"

            [[regions.regions]]
            name = "us-west-2"
            status = "standby"
            priority = 2
            endpoint = "https://api.usw2.example.test"
        "#;

        let config: ResilienceConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.cache.key_prefix, "bot");
        assert_eq!(config.regions.regions.len(), 2);
        assert!(validate_config(&config).is_ok());
    }
}
