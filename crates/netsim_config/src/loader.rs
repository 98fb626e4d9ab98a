//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::SimulatorConfig;
use std::path::Path;

/// File name looked up by [`load_config`].
pub const CONFIG_FILE_NAME: &str = "netsim.toml";

/// Loads and validates `<dir>/netsim.toml`.
pub fn load_config(dir: &Path) -> Result<SimulatorConfig, ConfigError> {
    let content = std::fs::read_to_string(dir.join(CONFIG_FILE_NAME))?;
    load_config_from_str(&content)
}

/// Parses and validates configuration text.
pub fn load_config_from_str(content: &str) -> Result<SimulatorConfig, ConfigError> {
    let config: SimulatorConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &SimulatorConfig) -> Result<(), ConfigError> {
    if config.simulation.oscillation_rounds == 0 {
        return Err(ConfigError::ValidationError(
            "simulation.oscillation_rounds must be greater than zero".to_string(),
        ));
    }
    if config.simulation.queue_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "simulation.queue_capacity must be greater than zero".to_string(),
        ));
    }
    Ok(())
}
