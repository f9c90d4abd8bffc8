mod descriptor;
mod report;
mod score;
mod severity;
mod verdict;

pub use descriptor::{CheckDescriptor, ModuleRequirement, Requirements};
pub use report::{REPORT_SCHEMA_VERSION, Report, Tallies};
pub use score::SeverityWeights;
pub use severity::Severity;
pub use verdict::{Issue, Outcome, Status, Verdict};
