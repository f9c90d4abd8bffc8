use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Read-only capability snapshot of the audited site: which modules are
/// installed (and at which version), which config keys are set, and the
/// runtime version. Checks and the requirements validator only ever
/// read from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_version: Option<Version>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub modules: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overview: BTreeMap<String, Value>,
}

impl Environment {
    pub fn load(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read environment file: {}", path.display()))?;
        toml::from_str(&s)
            .with_context(|| format!("failed to parse environment file: {}", path.display()))
    }

    /// Loads the snapshot if the file exists; a missing file yields an
    /// empty snapshot, so checks with preconditions skip instead of
    /// erroring out.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn has_module(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn module_version(&self, name: &str) -> Option<&str> {
        self.modules.get(name).map(String::as_str)
    }

    pub fn config_value(&self, key: &str) -> Option<&str> {
        self.config.get(key).map(String::as_str)
    }

    pub fn has_config(&self, key: &str) -> bool {
        self.config.contains_key(key)
    }

    pub fn overview_map(&self) -> Map<String, Value> {
        self.overview
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_snapshot_toml() {
        let env: Environment = toml::from_str(
            r#"
runtime_version = "8.2.1"

[modules]
forum = "4.1.0"
quiz = "3.0.2"

[config]
debug = "0"
login_https = "1"

[overview]
user_count = 120
site_name = "demo"
"#,
        )
        .expect("parse");

        assert_eq!(env.runtime_version.as_ref().map(Version::to_string).as_deref(), Some("8.2.1"));
        assert_eq!(env.module_version("forum"), Some("4.1.0"));
        assert!(env.has_config("debug"));
        assert_eq!(env.config_value("login_https"), Some("1"));
        assert_eq!(env.overview_map().get("user_count"), Some(&Value::from(120)));
    }

    #[test]
    fn missing_file_yields_empty_snapshot() {
        let path = std::env::temp_dir().join("siteaudit-env-does-not-exist.toml");
        let env = Environment::load_or_default(&path).expect("load_or_default");
        assert_eq!(env, Environment::default());
    }
}
