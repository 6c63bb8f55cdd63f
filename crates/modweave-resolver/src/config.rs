//! Resolver configuration.
//!
//! Values are merged from several sources, highest priority first:
//!
//! 1. Environment variables (`MODWEAVE_*`)
//! 2. A JSON document handed to [`ResolverConfig::build`]
//! 3. Built-in defaults
//!
//! The JSON document uses kebab-case keys:
//!
//! ```json
//! {
//!     "environment": "server",
//!     "max-decisions": 50000,
//!     "explain-failures": true,
//!     "default-phase-ordering": [["builtin", "default"]]
//! }
//! ```

use std::collections::HashMap;
use std::env;

use serde::{Deserialize, Serialize};

use crate::candidate::EnvType;
use crate::error::{ResolutionError, Result};
use crate::phase::LoadPhases;

/// Where a configuration value came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Default built-in value
    Default,
    /// From the JSON document
    Document,
    /// From an environment variable
    Environment(String),
}

impl ConfigSource {
    pub fn as_str(&self) -> &str {
        match self {
            ConfigSource::Default => "default",
            ConfigSource::Document => "document",
            ConfigSource::Environment(var) => var,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ResolverConfig {
    /// Runtime environment candidates are filtered against
    pub environment: EnvType,

    /// Decision budget for a single solver run
    pub max_decisions: u64,

    /// Decision budget for each fix search attempt
    pub max_fix_decisions: u64,

    /// Largest number of removals/additions a proposed fix may contain
    pub max_fix_size: usize,

    /// Compute a minimal set of conflicting rules for failure messages
    pub explain_failures: bool,

    /// Log a warning when phase orderings form a cycle
    pub phase_cycle_warnings: bool,

    /// `[before, after]` pairs seeded into the phase sorter
    pub default_phase_ordering: Vec<(String, String)>,

    #[serde(skip)]
    sources: HashMap<String, ConfigSource>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            environment: EnvType::Client,
            max_decisions: 100_000,
            max_fix_decisions: 20_000,
            max_fix_size: 8,
            explain_failures: true,
            phase_cycle_warnings: true,
            default_phase_ordering: vec![(LoadPhases::BUILTIN.to_string(), LoadPhases::DEFAULT.to_string())],
            sources: HashMap::new(),
        }
    }
}

impl ResolverConfig {
    pub fn new(environment: EnvType) -> Self {
        Self {
            environment,
            ..Self::default()
        }
    }

    /// Build configuration from defaults, an optional JSON document and,
    /// when `use_environment` is set, `MODWEAVE_*` variables.
    pub fn build(document: Option<&str>, use_environment: bool) -> Result<Self> {
        let mut config = match document {
            Some(json) => {
                let mut config = Self::from_json(json)?;
                config.mark_document_keys(json)?;
                config
            }
            None => Self::default(),
        };

        if use_environment {
            config.apply_env_overrides(|var| env::var(var).ok())?;
        }

        Ok(config)
    }

    /// Parse a JSON document; missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ResolverConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Source of a given key; keys never overridden report `Default`
    pub fn source(&self, key: &str) -> ConfigSource {
        self.sources.get(key).cloned().unwrap_or(ConfigSource::Default)
    }

    fn mark_document_keys(&mut self, json: &str) -> Result<()> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if let Some(object) = value.as_object() {
            for key in object.keys() {
                self.sources.insert(key.clone(), ConfigSource::Document);
            }
        }
        Ok(())
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|s| !s.is_empty());

        if let Some(value) = get("MODWEAVE_ENV") {
            self.environment = match value.to_lowercase().as_str() {
                "client" => EnvType::Client,
                "server" => EnvType::Server,
                other => {
                    return Err(ResolutionError::Config(format!(
                        "MODWEAVE_ENV must be \"client\" or \"server\", got \"{}\"",
                        other
                    )))
                }
            };
            self.sources.insert(
                "environment".to_string(),
                ConfigSource::Environment("MODWEAVE_ENV".to_string()),
            );
        }

        if let Some(value) = get("MODWEAVE_MAX_DECISIONS") {
            self.max_decisions = value.parse().map_err(|_| {
                ResolutionError::Config(format!("MODWEAVE_MAX_DECISIONS is not a number: {}", value))
            })?;
            self.sources.insert(
                "max-decisions".to_string(),
                ConfigSource::Environment("MODWEAVE_MAX_DECISIONS".to_string()),
            );
        }

        if let Some(value) = get("MODWEAVE_DEBUG_EXPLAIN") {
            self.explain_failures = parse_bool(&value);
            self.sources.insert(
                "explain-failures".to_string(),
                ConfigSource::Environment("MODWEAVE_DEBUG_EXPLAIN".to_string()),
            );
        }

        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_decisions == 0 {
            return Err(ResolutionError::Config("max-decisions must be greater than 0".to_string()));
        }
        for (before, after) in &self.default_phase_ordering {
            if before == after {
                return Err(ResolutionError::Config(format!(
                    "default-phase-ordering orders phase {} after itself",
                    before
                )));
            }
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ResolverConfig::default();
        assert_eq!(config.environment, EnvType::Client);
        assert_eq!(config.max_decisions, 100_000);
        assert!(config.explain_failures);
        assert_eq!(
            config.default_phase_ordering,
            vec![("builtin".to_string(), "default".to_string())]
        );
        assert_eq!(config.source("max-decisions"), ConfigSource::Default);
    }

    #[test]
    fn test_from_json_keeps_missing_defaults() {
        let config = ResolverConfig::from_json(r#"{"environment": "server", "max-decisions": 10}"#).unwrap();
        assert_eq!(config.environment, EnvType::Server);
        assert_eq!(config.max_decisions, 10);
        assert_eq!(config.max_fix_size, 8);
        assert!(config.phase_cycle_warnings);
    }

    #[test]
    fn test_from_json_phase_ordering() {
        let config = ResolverConfig::from_json(
            r#"{"default-phase-ordering": [["builtin", "early"], ["early", "default"]]}"#,
        )
        .unwrap();
        assert_eq!(config.default_phase_ordering.len(), 2);
        assert_eq!(config.default_phase_ordering[1].0, "early");
    }

    #[test]
    fn test_from_json_rejects_self_ordering() {
        let err = ResolverConfig::from_json(r#"{"default-phase-ordering": [["late", "late"]]}"#).unwrap_err();
        assert!(matches!(err, ResolutionError::Config(_)));
    }

    #[test]
    fn test_from_json_invalid() {
        let err = ResolverConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, ResolutionError::Json(_)));
    }

    #[test]
    fn test_build_tracks_document_sources() {
        let config = ResolverConfig::build(Some(r#"{"explain-failures": false}"#), false).unwrap();
        assert!(!config.explain_failures);
        assert_eq!(config.source("explain-failures"), ConfigSource::Document);
        assert_eq!(config.source("environment"), ConfigSource::Default);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ResolverConfig::default();
        config
            .apply_env_overrides(|var| match var {
                "MODWEAVE_ENV" => Some("Server".to_string()),
                "MODWEAVE_MAX_DECISIONS" => Some("500".to_string()),
                "MODWEAVE_DEBUG_EXPLAIN" => Some("0".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.environment, EnvType::Server);
        assert_eq!(config.max_decisions, 500);
        assert!(!config.explain_failures);
        assert_eq!(config.source("environment").as_str(), "MODWEAVE_ENV");
    }

    #[test]
    fn test_env_overrides_ignore_empty_values() {
        let mut config = ResolverConfig::default();
        config.apply_env_overrides(|_| Some(String::new())).unwrap();
        assert_eq!(config.environment, EnvType::Client);
        assert_eq!(config.source("environment"), ConfigSource::Default);
    }

    #[test]
    fn test_env_overrides_reject_garbage() {
        let mut config = ResolverConfig::default();
        let err = config
            .apply_env_overrides(|var| (var == "MODWEAVE_MAX_DECISIONS").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("MODWEAVE_MAX_DECISIONS"));

        let err = config
            .apply_env_overrides(|var| (var == "MODWEAVE_ENV").then(|| "toaster".to_string()))
            .unwrap_err();
        assert!(matches!(err, ResolutionError::Config(_)));
    }
}
