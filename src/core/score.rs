use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::core::Severity;

/// Severity weights used by the report score. The defaults follow the
/// product convention critical:4 high:3 normal:2 low:1; config may
/// override them, but every weight must stay positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityWeights {
    pub critical: u32,
    pub high: u32,
    pub normal: u32,
    pub low: u32,
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self {
            critical: 4,
            high: 3,
            normal: 2,
            low: 1,
        }
    }
}

impl SeverityWeights {
    pub const fn weight(&self, severity: Severity) -> u32 {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Normal => self.normal,
            Severity::Low => self.low,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("critical", self.critical),
            ("high", self.high),
            ("normal", self.normal),
            ("low", self.low),
        ] {
            if value == 0 {
                bail!("score weight {name} must be greater than 0");
            }
        }
        Ok(())
    }
}
