mod config;
pub use config::{ConfigError, GeneratorConfig};
