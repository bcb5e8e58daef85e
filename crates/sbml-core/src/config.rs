//! Engine settings loaded from TOML.
//!
//! ```toml
//! level = 2
//! version = 4
//! checks = ["identifier", "general", "units"]
//! conversion-checks = ["identifier", "general"]
//! severity-override = "as-warning"
//! ```

use crate::error_log::SeverityOverride;
use crate::validation::CheckCategories;
use sbml_schema::Revision;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read file: {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid toml at {path}: {source}")]
    ParseToml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("level {level} version {version} is not a valid SBML revision")]
    InvalidRevision { level: u32, version: u32 },

    #[error("unknown check category '{0}'")]
    UnknownCategory(String),
}

/// Defaults applied to documents created with
/// [`Document::with_config`](crate::Document::with_config).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct EngineConfig {
    pub level: u32,
    pub version: u32,
    /// Category names enabled for `check_consistency`.
    pub checks: Vec<String>,
    /// Category names run before and after a revision conversion.
    pub conversion_checks: Vec<String>,
    pub severity_override: SeverityOverride,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            level: Revision::DEFAULT.level(),
            version: Revision::DEFAULT.version(),
            checks: names(CheckCategories::ALL),
            conversion_checks: names(CheckCategories::CONVERSION_DEFAULT),
            severity_override: SeverityOverride::Disabled,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Self::parse(text, "<string>")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text, &path.display().to_string())
    }

    fn parse(text: &str, path: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::ParseToml {
            path: path.to_string(),
            source,
        })?;
        config.validate()?;
        tracing::debug!(path, revision = %config.revision(), "engine config loaded");
        Ok(config)
    }

    /// Checks the revision and every category name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if Revision::new(self.level, self.version).is_none() {
            return Err(ConfigError::InvalidRevision {
                level: self.level,
                version: self.version,
            });
        }
        resolve(&self.checks)?;
        resolve(&self.conversion_checks)?;
        Ok(())
    }

    /// Revision for new documents; the default revision when the configured
    /// pair is invalid.
    pub fn revision(&self) -> Revision {
        Revision::new(self.level, self.version).unwrap_or(Revision::DEFAULT)
    }

    /// Unknown names are skipped; [`validate`](Self::validate) reports them.
    pub fn applicable_categories(&self) -> CheckCategories {
        collect(&self.checks)
    }

    pub fn conversion_categories(&self) -> CheckCategories {
        collect(&self.conversion_checks)
    }

    pub fn severity_override(&self) -> SeverityOverride {
        self.severity_override
    }
}

fn names(categories: CheckCategories) -> Vec<String> {
    categories.names().into_iter().map(str::to_string).collect()
}

fn resolve(names: &[String]) -> Result<CheckCategories, ConfigError> {
    names.iter().try_fold(CheckCategories::NONE, |acc, name| {
        CheckCategories::from_name(name)
            .map(|category| acc | category)
            .ok_or_else(|| ConfigError::UnknownCategory(name.clone()))
    })
}

fn collect(names: &[String]) -> CheckCategories {
    names
        .iter()
        .filter_map(|name| CheckCategories::from_name(name))
        .fold(CheckCategories::NONE, |acc, category| acc | category)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn empty_config_uses_defaults() {
        let config = EngineConfig::from_toml_str("").expect("empty config");
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.revision(), Revision::DEFAULT);
        assert_eq!(config.applicable_categories(), CheckCategories::ALL);
        assert_eq!(config.conversion_categories(), CheckCategories::CONVERSION_DEFAULT);
    }

    #[test]
    fn settings_flow_into_new_documents() {
        let config = EngineConfig::from_toml_str(
            "level = 2\nversion = 4\nchecks = [\"identifier\", \"units\"]\n\
             severity-override = \"as-warning\"\n",
        )
        .expect("config");
        let document = Document::with_config(&config);
        assert_eq!(document.revision(), Revision::L2V4);
        assert_eq!(
            document.applicable_categories(),
            CheckCategories::IDENTIFIER | CheckCategories::UNITS
        );
        assert_eq!(
            document.error_log().severity_override(),
            SeverityOverride::AsWarning
        );
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = EngineConfig::from_toml_str("level = 2\nversion = 9\n").expect_err("revision");
        assert!(matches!(err, ConfigError::InvalidRevision { level: 2, version: 9 }));

        let err = EngineConfig::from_toml_str("checks = [\"spelling\"]\n").expect_err("category");
        assert!(matches!(err, ConfigError::UnknownCategory(name) if name == "spelling"));

        let err = EngineConfig::from_toml_str("colour = \"blue\"\n").expect_err("unknown key");
        assert!(matches!(err, ConfigError::ParseToml { .. }));
    }

    #[test]
    fn load_reports_the_path() {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let path = std::env::temp_dir().join(format!("sbml-engine-{stamp}.toml"));
        fs::write(&path, "level = 1\nversion = 2\n").expect("write config");
        let config = EngineConfig::load(&path).expect("load");
        assert_eq!(config.revision(), Revision::L1V2);
        fs::remove_file(&path).expect("cleanup");

        let err = EngineConfig::load(&path).expect_err("missing");
        assert!(err.to_string().contains("sbml-engine-"));
    }
}
