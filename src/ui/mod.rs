use anyhow::Error;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::core::{CheckDescriptor, Report, Severity, SeverityWeights, Status};

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub color: bool,
    pub stdout_is_tty: bool,
    pub stderr_is_tty: bool,
    pub max_table_rows: usize,
    pub quiet: bool,
    pub verbose: bool,
}

pub fn eprintln_error(err: &Error) {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "error:");
    let _ = writeln!(stderr, "  {err}");

    let mut causes = err.chain().skip(1).peekable();
    if causes.peek().is_some() {
        let _ = writeln!(stderr, "caused by:");
        for cause in causes {
            let _ = writeln!(stderr, "  - {cause}");
        }
    }

    let _ = writeln!(stderr, "next:");
    let _ = writeln!(stderr, "  - re-run with `--verbose` for more detail");
    let _ = writeln!(
        stderr,
        "  - see `siteaudit --help` for available commands and options"
    );
}

pub fn print_report(report: &Report, weights: &SeverityWeights, cfg: &UiConfig) {
    if cfg.quiet {
        return;
    }

    let tallies = report.tallies();
    let mut out = io::stdout().lock();
    let _ = writeln!(
        out,
        "summary: {} checks  pass={}  fail={}  skip={}",
        tallies.total(),
        tallies.pass,
        tallies.fail,
        tallies.skip
    );
    let _ = writeln!(out, "score: {:.1} / 100", report.score(weights));

    if report.is_empty() {
        return;
    }

    let total = report.len();
    let rows = cfg.max_table_rows.max(1).min(total);
    let _ = writeln!(out);
    if total > rows {
        let _ = writeln!(out, "verdicts ({rows} shown of {total}):");
    } else {
        let _ = writeln!(out, "verdicts:");
    }

    for verdict in report.verdicts.iter().take(rows) {
        let status = format_status(verdict.status, cfg.color);
        let severity = format_severity(verdict.severity, cfg.color);
        let _ = writeln!(out, "- [{status}] {} [{severity}]", verdict.check_id);
        if let Some(reason) = &verdict.reason_text {
            let _ = writeln!(out, "  - reason: {reason}");
        }
        for issue in &verdict.issues {
            let _ = writeln!(out, "  - issue: {}", issue.render());
        }
        if cfg.verbose && !verdict.arguments.is_empty() {
            for (key, value) in &verdict.arguments {
                let _ = writeln!(out, "  - {key}: {value}");
            }
        }
    }
    if total > rows {
        let _ = writeln!(out, "- ... ({} more)", total - rows);
    }
}

pub fn print_checks(descriptors: &[&CheckDescriptor], cfg: &UiConfig) {
    if cfg.quiet {
        return;
    }

    let mut out = io::stdout().lock();
    let _ = writeln!(out, "registered checks ({}):", descriptors.len());
    for descriptor in descriptors {
        let severity = format_severity(descriptor.severity, cfg.color);
        let enabled = if descriptor.enabled { "" } else { " (disabled)" };
        let _ = writeln!(
            out,
            "- {} [{severity}] {} ({}){enabled}",
            descriptor.id, descriptor.label, descriptor.category
        );
    }
}

pub fn print_report_list(paths: &[PathBuf], cfg: &UiConfig) {
    if cfg.quiet {
        return;
    }

    let mut out = io::stdout().lock();
    if paths.is_empty() {
        let _ = writeln!(out, "no saved reports.");
        return;
    }
    let _ = writeln!(out, "saved reports ({}):", paths.len());
    for path in paths {
        let _ = writeln!(out, "- {}", path.display());
    }
}

fn format_status(status: Status, color: bool) -> String {
    let s = status.as_str();
    if !color {
        return s.to_string();
    }
    let code = match status {
        Status::Pass => "32",
        Status::Fail => "31",
        Status::Skip => "90",
    };
    format!("\x1b[{code}m{s}\x1b[0m")
}

fn format_severity(severity: Severity, color: bool) -> String {
    let s = severity.as_str();
    if !color {
        return s.to_string();
    }
    let code = match severity {
        Severity::Critical => "31",
        Severity::High => "33",
        Severity::Normal => "36",
        Severity::Low => "90",
    };
    format!("\x1b[{code}m{s}\x1b[0m")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_formatting_respects_color_flag() {
        assert_eq!(format_status(Status::Pass, false), "PASS");
        let colored = format_status(Status::Fail, true);
        assert!(colored.starts_with("\x1b[31m"));
        assert!(colored.ends_with("\x1b[0m"));
    }

    #[test]
    fn severity_formatting_respects_color_flag() {
        assert_eq!(format_severity(Severity::Low, false), "low");
        assert!(format_severity(Severity::Critical, true).contains("critical"));
    }
}
