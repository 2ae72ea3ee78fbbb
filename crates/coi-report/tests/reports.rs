//! Report building over realistic compliance results

use chrono::{DateTime, TimeZone, Utc};
use coi_domain::{
    AggregateStatus, ComplianceResult, Document, Evidence, FieldValue, Money, Outcome,
    ReportFormat, RuleId, RunId, Severity, Verdict,
};
use coi_report::{NonScalarPolicy, ReportBuilder, ReportConfig, ReportError, SEE_JSON};

fn at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

fn verdict(id: &str, outcome: Outcome, severity: Severity, evidence: Evidence) -> Verdict {
    Verdict {
        rule_id: RuleId::new(id),
        outcome,
        severity,
        evidence,
        evaluated_at: at(),
    }
}

fn document() -> Document {
    Document::new("inbox/acme.txt", "CERTIFICATE OF LIABILITY INSURANCE", at())
}

/// Blocking pass plus an advisory failure, listed out of order
fn advisory_result(insureds: Vec<&str>) -> ComplianceResult {
    ComplianceResult::new(
        RunId::new(),
        document().id,
        vec![
            verdict(
                "minimum-coverage.general_liability",
                Outcome::Pass,
                Severity::Blocking,
                Evidence::new()
                    .with_value(
                        "coverage_limit.general_liability",
                        Some(FieldValue::Money(Money::from_dollars(2_000_000))),
                    )
                    .with_note("coverage_limit.general_liability is $2,000,000, required at least $1,000,000"),
            ),
            verdict(
                "additional-insureds",
                Outcome::Pass,
                Severity::Blocking,
                Evidence::new().with_value("additional_insureds", Some(FieldValue::list(insureds))),
            ),
            verdict(
                "cancellation-notice",
                Outcome::Fail,
                Severity::Advisory,
                Evidence::new()
                    .with_value("cancellation_notice_days", Some(FieldValue::Integer(10)))
                    .with_note("cancellation_notice_days is 10, required at least 30"),
            ),
        ],
    )
}

#[test]
fn test_advisory_failure_is_listed_and_status_compliant() {
    let result = advisory_result(vec!["Owner Corp"]);
    assert_eq!(result.status, AggregateStatus::Compliant);

    let builder = ReportBuilder::new(ReportConfig::default());
    let report = builder
        .build_at(&result, &document().metadata(), Some("All good."), ReportFormat::Json, at())
        .unwrap();

    let json: serde_json::Value = serde_json::from_str(&report.body).unwrap();
    assert_eq!(json["aggregate_status"], "compliant");
    assert_eq!(json["generated_at"], "2024-03-01T12:00:00Z");
    assert_eq!(json["summary"], "All good.");
    assert_eq!(json["source"]["source"], "inbox/acme.txt");

    let ids: Vec<&str> = json["verdicts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["rule_id"].as_str().unwrap())
        .collect();
    assert_eq!(
        ids,
        vec!["additional-insureds", "cancellation-notice", "minimum-coverage.general_liability"]
    );
    assert_eq!(json["verdicts"][1]["outcome"], "fail");
    assert_eq!(json["verdicts"][1]["severity"], "advisory");
}

#[test]
fn test_build_at_is_byte_identical() {
    let result = advisory_result(vec!["Owner Corp", "Lender LLC"]);
    let metadata = document().metadata();
    let builder = ReportBuilder::new(ReportConfig::default());

    for format in [ReportFormat::Json, ReportFormat::Csv] {
        let a = builder.build_at(&result, &metadata, None, format, at()).unwrap();
        let b = builder.build_at(&result, &metadata, None, format, at()).unwrap();
        assert_eq!(a.body, b.body);
    }
}

#[test]
fn test_csv_rows_per_verdict() {
    let result = advisory_result(vec!["Owner Corp", "Lender LLC"]);
    let report = ReportBuilder::new(ReportConfig::default())
        .build_at(&result, &document().metadata(), None, ReportFormat::Csv, at())
        .unwrap();

    let lines: Vec<&str> = report.body.split("\r\n").filter(|l| !l.is_empty()).collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("run_id,document_id,source,generated_at,aggregate_status,rule_id"));
    assert!(lines[1].contains(",additional-insureds,pass,blocking,additional_insureds=Owner Corp|Lender LLC,"));
    assert!(lines[2].contains(",cancellation-notice,fail,advisory,cancellation_notice_days=10,"));
    // the note contains a comma, so it is quoted
    assert!(lines[3].ends_with("\"coverage_limit.general_liability is $2,000,000, required at least $1,000,000\","));
}

#[test]
fn test_ambiguous_list_flattened_to_see_json() {
    let result = advisory_result(vec!["Owner Corp", "Lender | Trust"]);
    let report = ReportBuilder::new(ReportConfig::default())
        .build_at(&result, &document().metadata(), None, ReportFormat::Csv, at())
        .unwrap();
    assert!(report.body.contains(&format!("additional_insureds={}", SEE_JSON)));

    // the JSON report keeps the full value
    let json = ReportBuilder::new(ReportConfig::default())
        .build_at(&result, &document().metadata(), None, ReportFormat::Json, at())
        .unwrap();
    assert!(json.body.contains("Lender | Trust"));
}

#[test]
fn test_ambiguous_list_rejected_under_reject_policy() {
    let result = advisory_result(vec!["Lender | Trust"]);
    let config = ReportConfig {
        non_scalar: NonScalarPolicy::Reject,
        ..ReportConfig::default()
    };
    let err = ReportBuilder::new(config)
        .build_at(&result, &document().metadata(), None, ReportFormat::Csv, at())
        .unwrap_err();
    assert!(matches!(err, ReportError::Serialization(_)));
}

#[test]
fn test_lists_mimicking_pairs_or_empty_are_not_flattened() {
    let builder = ReportBuilder::new(ReportConfig::default());
    let csv = |insureds: Vec<&str>| {
        builder
            .build_at(&advisory_result(insureds), &document().metadata(), None, ReportFormat::Csv, at())
            .unwrap()
            .body
    };

    let see_json = format!("additional_insureds={}", SEE_JSON);
    assert!(csv(vec!["Owner Corp; policy_number=FAKE-1"]).contains(&see_json));
    assert!(csv(vec![""]).contains(&see_json));
    // an empty list stays distinguishable from a list of one empty name
    assert!(csv(vec![]).contains(",additional_insureds=,"));
}
