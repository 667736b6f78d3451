pub mod display;
pub mod lexer;
pub mod parser;
pub mod types;
pub mod validate;

pub use display::display_config;
pub use parser::{ConfigError, ConfigParser, ParseResult};
pub use types::{Config, RouteConfig, ServerConfig};
pub use validate::validate_configs;

use crate::error::Result;

/// Load and validate the configuration file named on the command line.
pub fn load_config(path: &std::path::Path) -> Result<Vec<ServerConfig>> {
    let content = std::fs::read_to_string(path)?;
    let config = ConfigParser::parse(&content)?;
    Ok(validate_configs(config.servers))
}
