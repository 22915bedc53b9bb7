//! Plan analysis over tabular EXPLAIN output.

use ormscope_explain::{
    AccessType, ExplainError, Explainer, Extra, PlanRow, PlanTable, PolicyRules, SelectType,
    Violation,
};
use serde_json::{Value, json};

fn plan_row(id: i64, select_type: &str, access_type: &str, extra: &str) -> Vec<Value> {
    vec![
        json!(id),
        json!(select_type),
        json!("orders"),
        json!(access_type),
        Value::Null,
        Value::Null,
        Value::Null,
        Value::Null,
        json!(100),
        json!(extra),
    ]
}

#[test]
fn violation_on_second_row_stops_analysis() {
    let explainer = Explainer::new(
        PolicyRules::new()
            .with_extra_black_list([Extra::Temporary])
            .with_select_type_white_list([SelectType::Simple, SelectType::Primary]),
    );

    // Row 3 would fail the select-type white list; it must never be checked.
    let table = PlanTable::with_plan_columns()
        .with_row(plan_row(1, "PRIMARY", "ALL", "Using where"))
        .with_row(plan_row(2, "SIMPLE", "ref", "Using temporary, Using filesort"))
        .with_row(plan_row(3, "DERIVED", "ALL", ""));

    let analysis = explainer.analyze_table(&table).unwrap();

    // Extraction is eager, so every row is returned.
    assert_eq!(analysis.rows.len(), 3);
    assert_eq!(
        analysis.violation,
        Some(Violation::ExtraBlackListed {
            extra: "Using temporary, Using filesort".to_string()
        })
    );
}

#[test]
fn clean_plan_returns_all_rows() {
    let explainer = Explainer::new(
        PolicyRules::new()
            .with_extra_white_list([Extra::Where, Extra::Index])
            .with_min_access_type(AccessType::Range),
    );
    let table = PlanTable::with_plan_columns()
        .with_row(plan_row(1, "SIMPLE", "range", "Using where"))
        .with_row(plan_row(2, "SIMPLE", "eq_ref", "Using index"));

    let analysis = explainer.analyze_table(&table).unwrap();
    assert!(analysis.is_clean());
    assert_eq!(analysis.rows[1].access_type, "eq_ref");
}

#[test]
fn repeated_analysis_is_stable() {
    let explainer =
        Explainer::new(PolicyRules::new().with_select_type_white_list([SelectType::Simple]));
    let rows = vec![
        PlanRow::new(1).with_select_type("SIMPLE"),
        PlanRow::new(2).with_select_type("SUBQUERY"),
    ];

    let first = explainer.analyze(rows.clone());
    let second = explainer.analyze(rows);
    assert_eq!(first, second);

    let message = first.violation.unwrap().to_string();
    assert!(message.contains("SUBQUERY"));
    assert!(message.contains("white list"));
}

#[test]
fn extraction_failure_skips_rules() {
    let explainer = Explainer::new(PolicyRules::new().with_min_access_type(AccessType::All));
    let mut bad = plan_row(1, "SIMPLE", "ALL", "");
    bad[8] = json!({"estimate": 3});
    let table = PlanTable::with_plan_columns().with_row(bad);

    let err = explainer.analyze_table(&table).unwrap_err();
    assert!(matches!(err, ExplainError::Decode { ref column, .. } if column == "rows"));
}

#[test]
fn analysis_serializes_for_callbacks() {
    let explainer =
        Explainer::new(PolicyRules::new().with_extra_black_list([Extra::FileSort]));
    let analysis = explainer.analyze(vec![PlanRow::new(1).with_extra("Using filesort")]);

    let value = serde_json::to_value(&analysis).unwrap();
    assert_eq!(value["violation"]["kind"], "extra_black_listed");
    assert_eq!(value["violation"]["extra"], "Using filesort");
    assert_eq!(value["rows"][0]["Extra"], "Using filesort");
}
