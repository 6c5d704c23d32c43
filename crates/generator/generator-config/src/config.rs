use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    #[serde(default = "defaults::namespace")]
    pub namespace: String,
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
    /// Fixed RNG seed; entropy-seeded when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),
}

mod defaults {
    pub fn namespace() -> String {
        "graph_coloring".into()
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            namespace: defaults::namespace(),
            log_level: defaults::log_level(),
            seed: None,
        }
    }
}

impl GeneratorConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let toml_to_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&toml_to_str)
    }

    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        assert_eq!(GeneratorConfig::parse("").unwrap(), GeneratorConfig::default());
    }

    #[test]
    fn fields_override_defaults() {
        let cfg = GeneratorConfig::parse("namespace = \"lab\"\nseed = 7\n").unwrap();
        assert_eq!(cfg.namespace, "lab");
        assert_eq!(cfg.seed, Some(7));
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn missing_file_reports_its_path() {
        let err = GeneratorConfig::load("/nonexistent/generator.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/generator.toml"));
    }

    #[test]
    fn wrong_types_are_parse_errors() {
        assert!(matches!(
            GeneratorConfig::parse("seed = \"abc\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
