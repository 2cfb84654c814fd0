//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::FaucetConfig;
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
pub fn load_config(path: &Path) -> Result<FaucetConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

/// Parse, resolve and validate configuration text.
pub fn parse_config(content: &str) -> Result<FaucetConfig, ConfigError> {
    let mut config: FaucetConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    apply_env_overrides(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Replace inline mnemonics with the value of `mnemonic_env` when that
/// variable is set, so secrets can stay out of the file.
fn apply_env_overrides(config: &mut FaucetConfig) {
    for chain in &mut config.blockchains {
        let Some(var) = chain.sender.mnemonic_env.as_deref() else {
            continue;
        };
        match std::env::var(var) {
            Ok(value) if !value.trim().is_empty() => {
                chain.sender.mnemonic = value.trim().to_string();
            }
            _ => {
                tracing::warn!(chain = %chain.name, var = %var, "Mnemonic env var not set, using inline value");
            }
        }
    }
}
