use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::Severity;

/// Result classification of a single executed check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Pass,
    Fail,
    Skip,
}

impl Status {
    pub const fn as_str(self) -> &'static str {
        match self {
            Status::Pass => "PASS",
            Status::Fail => "FAIL",
            Status::Skip => "SKIP",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One concrete finding attached to a verdict. The title is a template
/// with `{name}` placeholders filled from `params` at render time, so
/// the stored report stays language-neutral.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub key: String,
    pub title_template: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
}

impl Issue {
    pub fn new(key: impl Into<String>, title_template: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title_template: title_template.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Substitutes every `{name}` placeholder that has a matching
    /// param; unmatched placeholders are left as-is.
    pub fn render(&self) -> String {
        let mut rendered = self.title_template.clone();
        for (name, value) in &self.params {
            rendered = rendered.replace(&format!("{{{name}}}"), value);
        }
        rendered
    }
}

/// The recorded result of one check inside a report. Carries the
/// severity so a saved report can be re-scored without the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub check_id: String,
    pub status: Status,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_text: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub arguments: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<Issue>,
}

/// What a check returns from `perform`. The executor stamps identity
/// and severity on it to form the final verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub status: Status,
    pub reason: Option<String>,
    pub arguments: Map<String, Value>,
    pub issues: Vec<Issue>,
}

impl Outcome {
    pub fn pass() -> Self {
        Self {
            status: Status::Pass,
            reason: None,
            arguments: Map::new(),
            issues: Vec::new(),
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            status: Status::Fail,
            reason: Some(reason.into()),
            arguments: Map::new(),
            issues: Vec::new(),
        }
    }

    pub fn skip(reason: impl Into<String>) -> Self {
        Self {
            status: Status::Skip,
            reason: Some(reason.into()),
            arguments: Map::new(),
            issues: Vec::new(),
        }
    }

    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    pub fn with_issue(mut self, issue: Issue) -> Self {
        self.issues.push(issue);
        self
    }

    pub(crate) fn into_verdict(self, check_id: &str, severity: Severity) -> Verdict {
        Verdict {
            check_id: check_id.to_string(),
            status: self.status,
            severity,
            reason_text: self.reason,
            arguments: self.arguments,
            issues: self.issues,
        }
    }
}
