use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::score::SeverityWeights;
use crate::core::{Status, Verdict};

pub const REPORT_SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tallies {
    pub pass: u32,
    pub fail: u32,
    pub skip: u32,
}

impl Tallies {
    pub fn total(self) -> u32 {
        self.pass + self.fail + self.skip
    }
}

/// The append-only aggregate of all verdicts for one audit run.
///
/// Verdict order is execution order. Re-adding a verdict for a check id
/// that is already present replaces the earlier entry in place, so a
/// single check can be re-run without duplicating its row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ReportWire")]
pub struct Report {
    pub schema_version: String,
    pub tool_version: String,
    pub generated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<Map<String, Value>>,
    pub verdicts: Vec<Verdict>,
    #[serde(skip_serializing)]
    index: HashMap<String, usize>,
}

#[derive(Debug, Deserialize)]
struct ReportWire {
    schema_version: String,
    tool_version: String,
    generated_at: String,
    #[serde(default)]
    overview: Option<Map<String, Value>>,
    #[serde(default)]
    verdicts: Vec<Verdict>,
}

impl From<ReportWire> for Report {
    fn from(wire: ReportWire) -> Self {
        let index = wire
            .verdicts
            .iter()
            .enumerate()
            .map(|(i, v)| (v.check_id.clone(), i))
            .collect();
        Report {
            schema_version: wire.schema_version,
            tool_version: wire.tool_version,
            generated_at: wire.generated_at,
            overview: wire.overview,
            verdicts: wire.verdicts,
            index,
        }
    }
}

impl Report {
    pub fn new(tool_version: impl Into<String>, generated_at: impl Into<String>) -> Self {
        Report {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            tool_version: tool_version.into(),
            generated_at: generated_at.into(),
            overview: None,
            verdicts: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Inserts the verdict, or replaces the existing entry for the same
    /// check id while keeping its original position.
    pub fn add_verdict(&mut self, verdict: Verdict) {
        match self.index.get(&verdict.check_id) {
            Some(&i) => self.verdicts[i] = verdict,
            None => {
                self.index
                    .insert(verdict.check_id.clone(), self.verdicts.len());
                self.verdicts.push(verdict);
            }
        }
    }

    pub fn get(&self, check_id: &str) -> Option<&Verdict> {
        self.index.get(check_id).map(|&i| &self.verdicts[i])
    }

    /// Stores the environment snapshot. Calling it again overwrites the
    /// previous value; it never merges.
    pub fn set_overview(&mut self, overview: Map<String, Value>) {
        self.overview = Some(overview);
    }

    pub fn tallies(&self) -> Tallies {
        let mut tallies = Tallies::default();
        for verdict in &self.verdicts {
            match verdict.status {
                Status::Pass => tallies.pass += 1,
                Status::Fail => tallies.fail += 1,
                Status::Skip => tallies.skip += 1,
            }
        }
        tallies
    }

    /// Severity-weighted pass rate over all non-skipped verdicts, in
    /// [0, 100]. An empty or all-skipped report scores 0.
    pub fn score(&self, weights: &SeverityWeights) -> f64 {
        let mut earned: u64 = 0;
        let mut possible: u64 = 0;
        for verdict in &self.verdicts {
            let weight = u64::from(weights.weight(verdict.severity));
            match verdict.status {
                Status::Pass => {
                    earned += weight;
                    possible += weight;
                }
                Status::Fail => possible += weight,
                Status::Skip => {}
            }
        }
        if possible == 0 {
            return 0.0;
        }
        100.0 * earned as f64 / possible as f64
    }

    pub fn len(&self) -> usize {
        self.verdicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Outcome, Severity};

    fn verdict(id: &str, status: Status, severity: Severity) -> Verdict {
        let outcome = match status {
            Status::Pass => Outcome::pass(),
            Status::Fail => Outcome::fail("failed"),
            Status::Skip => Outcome::skip("skipped"),
        };
        outcome.into_verdict(id, severity)
    }

    #[test]
    fn add_verdict_replaces_by_check_id_keeping_position() {
        let mut report = Report::new("0.1.0", "2026-01-01T00:00:00Z");
        report.add_verdict(verdict("a", Status::Pass, Severity::Low));
        report.add_verdict(verdict("b", Status::Fail, Severity::High));
        report.add_verdict(verdict("a", Status::Fail, Severity::Low));

        assert_eq!(report.len(), 2);
        assert_eq!(report.verdicts[0].check_id, "a");
        assert_eq!(report.verdicts[0].status, Status::Fail);
        assert_eq!(report.verdicts[1].check_id, "b");
    }

    #[test]
    fn tallies_count_each_status() {
        let mut report = Report::new("0.1.0", "2026-01-01T00:00:00Z");
        report.add_verdict(verdict("a", Status::Pass, Severity::Normal));
        report.add_verdict(verdict("b", Status::Fail, Severity::Normal));
        report.add_verdict(verdict("c", Status::Skip, Severity::Normal));

        let tallies = report.tallies();
        assert_eq!((tallies.pass, tallies.fail, tallies.skip), (1, 1, 1));
        assert_eq!(tallies.total(), 3);
    }

    #[test]
    fn score_weights_passes_by_severity_and_ignores_skips() {
        let mut report = Report::new("0.1.0", "2026-01-01T00:00:00Z");
        report.add_verdict(verdict("a", Status::Pass, Severity::Critical));
        report.add_verdict(verdict("b", Status::Fail, Severity::Low));
        report.add_verdict(verdict("c", Status::Skip, Severity::Normal));

        let weights = SeverityWeights::default();
        assert_eq!(report.score(&weights), 100.0 * 4.0 / 5.0);
    }

    #[test]
    fn score_is_zero_when_everything_skipped() {
        let mut report = Report::new("0.1.0", "2026-01-01T00:00:00Z");
        report.add_verdict(verdict("a", Status::Skip, Severity::Critical));
        assert_eq!(report.score(&SeverityWeights::default()), 0.0);

        let empty = Report::new("0.1.0", "2026-01-01T00:00:00Z");
        assert_eq!(empty.score(&SeverityWeights::default()), 0.0);
    }

    #[test]
    fn serde_round_trip_preserves_order_and_overview() {
        let mut report = Report::new("0.1.0", "2026-01-01T00:00:00Z");
        report.add_verdict(verdict("b", Status::Pass, Severity::High));
        report.add_verdict(verdict("a", Status::Skip, Severity::Low));
        let mut overview = Map::new();
        overview.insert("user_count".to_string(), Value::from(42));
        report.set_overview(overview);

        let json = serde_json::to_string(&report).expect("serialize");
        let restored: Report = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(restored, report);
        // The rebuilt index must keep replace-by-id working.
        let mut restored = restored;
        restored.add_verdict(verdict("b", Status::Fail, Severity::High));
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.verdicts[0].status, Status::Fail);
    }
}
