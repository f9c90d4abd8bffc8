use semver::VersionReq;
use serde::{Deserialize, Serialize};

use crate::core::Severity;

/// A module the check needs before it can run, optionally pinned to a
/// version range of the installed module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleRequirement {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionReq>,
}

impl ModuleRequirement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }

    pub fn with_version(mut self, version: VersionReq) -> Self {
        self.version = Some(version);
        self
    }
}

/// Preconditions a check declares; validated against the environment
/// snapshot before the check runs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Requirements {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<ModuleRequirement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub config_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_runtime: Option<VersionReq>,
}

/// Read-only check metadata supplied by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckDescriptor {
    pub id: String,
    pub label: String,
    pub category: String,
    pub severity: Severity,
    pub enabled: bool,
    #[serde(default)]
    pub requirements: Requirements,
}

impl CheckDescriptor {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        category: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            category: category.into(),
            severity,
            enabled: true,
            requirements: Requirements::default(),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_requirements(mut self, requirements: Requirements) -> Self {
        self.requirements = requirements;
        self
    }
}
