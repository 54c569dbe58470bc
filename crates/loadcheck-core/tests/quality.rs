mod support;

use loadcheck_core::error::LoadError;
use loadcheck_core::quality::{run_checks, ExpectedResult, QualityCheck, QualityGate};
use loadcheck_core::step::StepOutcome;
use loadcheck_core::warehouse::ScalarValue;
use support::{ctx, FakeWarehouse};

const NON_EMPTY_SQL: &str = "SELECT COUNT(*) FROM usa.city_state_travelers_entry";
const EXACT_SQL: &str = "SELECT COUNT(*) FROM usa.arrival_date";

fn check(sql: &str, expected: ExpectedResult) -> QualityCheck {
    QualityCheck::new(sql, false, expected).unwrap()
}

#[tokio::test]
async fn first_failure_stops_the_remaining_checks() {
    let warehouse = FakeWarehouse::new()
        .with_answer(NON_EMPTY_SQL, Some(vec![ScalarValue::Int(0)]))
        .with_answer(EXACT_SQL, Some(vec![ScalarValue::Int(5)]));
    let checks = vec![
        check(NON_EMPTY_SQL, ExpectedResult::NotEmpty),
        check(EXACT_SQL, ExpectedResult::Exactly(5)),
    ];

    let err = run_checks(&warehouse, &checks, &ctx(2016, 4, 1))
        .await
        .unwrap_err();

    assert!(matches!(err, LoadError::ExpectationMismatch { .. }));
    assert_eq!(warehouse.statements(), vec![NON_EMPTY_SQL]);
}

#[tokio::test]
async fn exact_match_passes() {
    let warehouse = FakeWarehouse::new().with_answer(EXACT_SQL, Some(vec![ScalarValue::Int(5)]));
    let checks = vec![check(EXACT_SQL, ExpectedResult::Exactly(5))];

    let results = run_checks(&warehouse, &checks, &ctx(2016, 4, 1))
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert!(results[0].passed);
    assert_eq!(results[0].actual, Some(ScalarValue::Int(5)));
}

#[tokio::test]
async fn exact_mismatch_names_both_values() {
    let warehouse = FakeWarehouse::new().with_answer(EXACT_SQL, Some(vec![ScalarValue::Int(4)]));
    let checks = vec![check(EXACT_SQL, ExpectedResult::Exactly(5))];

    let err = run_checks(&warehouse, &checks, &ctx(2016, 4, 1))
        .await
        .unwrap_err();

    match &err {
        LoadError::ExpectationMismatch {
            check_sql,
            expected,
            actual,
        } => {
            assert_eq!(check_sql, EXACT_SQL);
            assert_eq!(expected, &ExpectedResult::Exactly(5));
            assert_eq!(actual, &ScalarValue::Int(4));
        }
        other => panic!("unexpected error {other:?}"),
    }
    let message = err.to_string();
    assert!(message.contains('5') && message.contains('4'));
}

#[tokio::test]
async fn zero_rows_is_empty_result_even_for_not_empty() {
    let warehouse = FakeWarehouse::new().with_answer(NON_EMPTY_SQL, None);
    let checks = vec![check(NON_EMPTY_SQL, ExpectedResult::NotEmpty)];

    let err = run_checks(&warehouse, &checks, &ctx(2016, 4, 1))
        .await
        .unwrap_err();

    assert!(matches!(err, LoadError::EmptyResult { .. }));
}

#[tokio::test]
async fn zero_rows_is_empty_result_even_when_expecting_zero() {
    let warehouse = FakeWarehouse::new().with_answer(EXACT_SQL, None);
    let checks = vec![check(EXACT_SQL, ExpectedResult::Exactly(0))];

    let err = run_checks(&warehouse, &checks, &ctx(2016, 4, 1))
        .await
        .unwrap_err();

    assert!(matches!(err, LoadError::EmptyResult { .. }));
}

#[tokio::test]
async fn execution_date_is_substituted_when_flagged() {
    let template = "SELECT COUNT(*) FROM usa.arrival_date WHERE arrival_date = '{}'";
    let rendered = "SELECT COUNT(*) FROM usa.arrival_date WHERE arrival_date = '2016-04-01'";
    let warehouse = FakeWarehouse::new().with_answer(rendered, Some(vec![ScalarValue::Int(1)]));
    let gate = QualityGate::new(vec![
        QualityCheck::new(template, true, ExpectedResult::Exactly(1)).unwrap(),
    ]);

    let outcome = gate.execute(&warehouse, &ctx(2016, 4, 1)).await.unwrap();

    assert_eq!(outcome, StepOutcome::Certified { checks: 1 });
    assert_eq!(warehouse.statements(), vec![rendered]);
}

#[tokio::test]
async fn warehouse_errors_abort_the_gate() {
    let warehouse = FakeWarehouse::new().failing_on("usa.city_state_travelers_entry");
    let checks = vec![
        check(NON_EMPTY_SQL, ExpectedResult::NotEmpty),
        check(EXACT_SQL, ExpectedResult::Exactly(5)),
    ];

    let err = run_checks(&warehouse, &checks, &ctx(2016, 4, 1))
        .await
        .unwrap_err();

    assert!(matches!(err, LoadError::SqlExecution { .. }));
    assert_eq!(warehouse.statements().len(), 1);
}

#[tokio::test]
async fn gate_from_config_file_passes_on_loaded_tables() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../config/dq_check_settings.json");
    let gate = QualityGate::load(&path).expect("load dq check settings");
    assert!(!gate.is_empty());

    let warehouse = FakeWarehouse::new()
        .with_rows("usa.city_state_travelers_entry", 80)
        .with_rows("usa.arrival_date", 1)
        .with_answer(
            "SELECT COUNT(*) FROM usa.arrival_date WHERE arrival_date = '2016-04-01'",
            Some(vec![ScalarValue::Int(1)]),
        )
        .with_answer(
            "SELECT COUNT(*) FROM usa.city_state_travelers_entry WHERE admission_number IS NULL",
            Some(vec![ScalarValue::Int(0)]),
        );

    let outcome = gate.execute(&warehouse, &ctx(2016, 4, 1)).await.unwrap();
    assert_eq!(
        outcome,
        StepOutcome::Certified {
            checks: gate.len()
        }
    );
}
