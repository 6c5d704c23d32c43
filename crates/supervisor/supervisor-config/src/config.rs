use chroma_icc::MAX_CAPACITY;
use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    #[serde(default = "defaults::namespace")]
    pub namespace: String,
    #[serde(default = "defaults::capacity")]
    pub capacity: usize,
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
    /// Remove names left behind by a crashed supervisor before creating.
    #[serde(default)]
    pub reclaim_stale: bool,
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

    #[error("capacity must be between 1 and {max}, got {got}")]
    Capacity { got: usize, max: usize },
}

mod defaults {
    pub fn namespace() -> String {
        "graph_coloring".into()
    }

    pub fn capacity() -> usize {
        20
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            namespace: defaults::namespace(),
            capacity: defaults::capacity(),
            log_level: defaults::log_level(),
            reclaim_stale: false,
        }
    }
}

impl SupervisorConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let toml_to_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&toml_to_str)
    }

    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        let config: SupervisorConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 || self.capacity > MAX_CAPACITY {
            return Err(ConfigError::Capacity {
                got: self.capacity,
                max: MAX_CAPACITY,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = SupervisorConfig::parse("").unwrap();
        assert_eq!(cfg, SupervisorConfig::default());
        assert_eq!(cfg.capacity, 20);
        assert_eq!(cfg.namespace, "graph_coloring");
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = SupervisorConfig::parse(
            "namespace = \"lab\"\ncapacity = 64\nlog_level = \"debug\"\nreclaim_stale = true\n",
        )
        .unwrap();
        assert_eq!(cfg.namespace, "lab");
        assert_eq!(cfg.capacity, 64);
        assert_eq!(cfg.log_level, "debug");
        assert!(cfg.reclaim_stale);
    }

    #[test]
    fn capacity_bound_matches_the_channel() {
        let largest = format!("capacity = {MAX_CAPACITY}");
        let cfg = SupervisorConfig::parse(&largest).unwrap();
        assert!(chroma_icc::RingConfig::try_new(cfg.capacity).is_some());

        let too_large = format!("capacity = {}", MAX_CAPACITY + 1);
        assert!(matches!(
            SupervisorConfig::parse(&too_large),
            Err(ConfigError::Capacity { max: MAX_CAPACITY, .. })
        ));
    }

    #[test]
    fn capacity_out_of_range_is_rejected() {
        assert!(matches!(
            SupervisorConfig::parse("capacity = 0"),
            Err(ConfigError::Capacity { got: 0, .. })
        ));
        assert!(matches!(
            SupervisorConfig::parse("capacity = 100000"),
            Err(ConfigError::Capacity { .. })
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        assert!(matches!(
            SupervisorConfig::load("/nonexistent/supervisor.toml"),
            Err(ConfigError::Read { .. })
        ));
    }
}
