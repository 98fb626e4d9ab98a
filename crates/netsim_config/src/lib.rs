//! Parsing and validation of `netsim.toml` simulator settings.
//!
//! The resulting [`SimulatorConfig`] is handed explicitly to the simulator at
//! construction; nothing here is global.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE_NAME};
pub use types::*;
