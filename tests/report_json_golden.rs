use serde_json::{Map, Value};
use siteaudit::core::{Issue, Report, Severity, Status, Verdict};

#[test]
fn report_json_matches_golden() {
    let mut report = Report::new("0.1.0", "2026-01-01T00:00:00Z");

    let mut overview = Map::new();
    overview.insert("site_name".to_string(), Value::from("demo"));
    overview.insert("user_count".to_string(), Value::from(120));
    report.set_overview(overview);

    report.add_verdict(Verdict {
        check_id: "runtime-version".to_string(),
        status: Status::Pass,
        severity: Severity::High,
        reason_text: None,
        arguments: Map::new(),
        issues: vec![],
    });

    let mut arguments = Map::new();
    arguments.insert("key".to_string(), Value::from("debug"));
    arguments.insert("expected".to_string(), Value::from("0"));
    arguments.insert("actual".to_string(), Value::from("1"));
    report.add_verdict(Verdict {
        check_id: "core-debug-mode".to_string(),
        status: Status::Fail,
        severity: Severity::High,
        reason_text: Some("debug mode is enabled on a production site".to_string()),
        arguments,
        issues: vec![
            Issue::new("debug_on", "debug is set to {actual}").with_param("actual", "1"),
        ],
    });

    report.add_verdict(Verdict {
        check_id: "modules-up-to-date".to_string(),
        status: Status::Skip,
        severity: Severity::Normal,
        reason_text: Some("required module is not installed: forum".to_string()),
        arguments: Map::new(),
        issues: vec![],
    });

    let actual = serde_json::to_value(&report).expect("serialize report");
    let expected: Value =
        serde_json::from_str(include_str!("golden/report.json")).expect("parse golden json");

    assert_eq!(actual, expected);
}

#[test]
fn golden_report_deserializes_with_working_merge_semantics() {
    let mut report: Report =
        serde_json::from_str(include_str!("golden/report.json")).expect("parse golden json");
    assert_eq!(report.len(), 3);

    report.add_verdict(Verdict {
        check_id: "core-debug-mode".to_string(),
        status: Status::Pass,
        severity: Severity::High,
        reason_text: None,
        arguments: Map::new(),
        issues: vec![],
    });

    assert_eq!(report.len(), 3);
    assert_eq!(
        report.get("core-debug-mode").map(|v| v.status),
        Some(Status::Pass)
    );
    assert_eq!(report.verdicts[1].check_id, "core-debug-mode");
}
