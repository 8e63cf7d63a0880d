use crate::error::Result;
use crate::id::IdStrategy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings shared by a database and every collection it opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Emit per-operation diagnostics at info level instead of trace.
    pub verbose: bool,
    /// How identifiers are generated for documents saved without one.
    pub id_strategy: IdStrategy,
    /// What to do when a freshly generated identifier already has a file.
    pub on_collision: OnCollision,
    /// Write documents through a temp file + rename instead of in place.
    pub atomic_writes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            verbose: false,
            id_strategy: IdStrategy::Hash,
            on_collision: OnCollision::Overwrite,
            atomic_writes: false,
        }
    }
}

impl Config {
    #[must_use]
    pub fn verbose(mut self, value: bool) -> Self {
        self.verbose = value;
        self
    }

    #[must_use]
    pub fn id_strategy(mut self, strategy: IdStrategy) -> Self {
        self.id_strategy = strategy;
        self
    }

    #[must_use]
    pub fn on_collision(mut self, policy: OnCollision) -> Self {
        self.on_collision = policy;
        self
    }

    #[must_use]
    pub fn atomic_writes(mut self, value: bool) -> Self {
        self.atomic_writes = value;
        self
    }
}

/// Policy for generated identifiers that hit an existing document file.
/// Caller-supplied identifiers always upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnCollision {
    #[default]
    Overwrite,
    Error,
}

/// Parse a YAML config file into a Config
pub fn parse_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)?;
    parse_config_str(&content)
}

/// Parse a YAML string into a Config. Missing keys take their defaults.
pub fn parse_config_str(content: &str) -> Result<Config> {
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    let config: Config = serde_yaml::from_str(content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(!config.verbose);
        assert_eq!(config.id_strategy, IdStrategy::Hash);
        assert_eq!(config.on_collision, OnCollision::Overwrite);
        assert!(!config.atomic_writes);
    }

    #[test]
    fn test_parse_partial_yaml() {
        let config = parse_config_str("verbose: true\non_collision: error\n").unwrap();
        assert_eq!(
            config,
            Config::default()
                .verbose(true)
                .on_collision(OnCollision::Error)
        );
    }

    #[test]
    fn test_parse_id_strategy() {
        let config = parse_config_str("id_strategy: ulid\natomic_writes: true").unwrap();
        assert_eq!(config.id_strategy, IdStrategy::Ulid);
        assert!(config.atomic_writes);
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse_config_str("").unwrap(), Config::default());
    }

    #[test]
    fn test_parse_rejects_unknown_strategy() {
        assert!(parse_config_str("id_strategy: sequential").is_err());
    }

    #[test]
    fn test_parse_config_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("pantexdb.yaml");
        std::fs::write(&path, "id_strategy: nanoid\n").unwrap();
        let config = parse_config(&path).unwrap();
        assert_eq!(config.id_strategy, IdStrategy::Nanoid);
    }
}
