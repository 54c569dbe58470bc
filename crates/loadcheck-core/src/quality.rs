//! Declarative data quality checks run after the loads.
//!
//! Checks run in declaration order and the first failure stops the gate; the
//! remaining checks are never sent to the warehouse.

use std::fmt;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::error::{LoadError, Result};
use crate::step::StepOutcome;
use crate::types::RunContext;
use crate::warehouse::{ScalarValue, Warehouse};

const NOT_EMPTY: &str = "NOT EMPTY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedResult {
    /// First column must be anything but zero.
    NotEmpty,
    Exactly(i64),
}

impl fmt::Display for ExpectedResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedResult::NotEmpty => f.write_str(NOT_EMPTY),
            ExpectedResult::Exactly(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityCheck {
    check_sql: String,
    uses_execution_date: bool,
    expected: ExpectedResult,
}

impl QualityCheck {
    pub fn new(
        check_sql: impl Into<String>,
        uses_execution_date: bool,
        expected: ExpectedResult,
    ) -> Result<Self> {
        let check_sql = check_sql.into();
        if check_sql.trim().is_empty() {
            return Err(LoadError::Config("quality check has an empty query".into()));
        }
        if uses_execution_date && !has_placeholder(&check_sql) {
            return Err(LoadError::Config(format!(
                "quality check is parameterized by execution date but has no '{{}}' placeholder: {check_sql}"
            )));
        }
        Ok(Self {
            check_sql,
            uses_execution_date,
            expected,
        })
    }

    pub fn expected(&self) -> &ExpectedResult {
        &self.expected
    }

    /// Query text to send for this run.
    pub fn render(&self, ctx: &RunContext) -> String {
        if self.uses_execution_date {
            substitute(&self.check_sql, &ctx.ds)
        } else {
            self.check_sql.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub check_sql: String,
    pub expected: ExpectedResult,
    /// `None` when the query returned no row or no column.
    pub actual: Option<ScalarValue>,
    pub passed: bool,
}

impl CheckResult {
    pub fn evaluate(
        check_sql: String,
        expected: ExpectedResult,
        row: Option<Vec<ScalarValue>>,
    ) -> Self {
        let actual = row.and_then(|values| values.into_iter().next());
        let passed = match (&actual, &expected) {
            (None, _) => false,
            (Some(value), ExpectedResult::NotEmpty) => !value.is_zero(),
            (Some(value), ExpectedResult::Exactly(n)) => value.equals_int(*n),
        };
        Self {
            check_sql,
            expected,
            actual,
            passed,
        }
    }

    pub fn into_result(self) -> Result<Self> {
        match self.actual {
            None => Err(LoadError::EmptyResult {
                check_sql: self.check_sql,
            }),
            Some(actual) if !self.passed => Err(LoadError::ExpectationMismatch {
                check_sql: self.check_sql,
                expected: self.expected,
                actual,
            }),
            Some(_) => Ok(self),
        }
    }
}

/// Ordered list of checks, usually loaded from a `dq_checks` JSON file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QualityGate {
    checks: Vec<QualityCheck>,
}

#[derive(Debug, Deserialize)]
struct DqCheckFile {
    dq_checks: Vec<RawCheck>,
}

#[derive(Debug, Deserialize)]
struct RawCheck {
    check_sql: String,
    execution_date: String,
    expected_result: Value,
}

impl TryFrom<RawCheck> for QualityCheck {
    type Error = LoadError;

    fn try_from(raw: RawCheck) -> Result<Self> {
        let uses_execution_date = match raw.execution_date.as_str() {
            "TRUE" => true,
            "FALSE" => false,
            other => {
                return Err(LoadError::Config(format!(
                    "execution_date must be \"TRUE\" or \"FALSE\", got {other:?}"
                )))
            }
        };

        let expected = match &raw.expected_result {
            Value::String(s) if s == NOT_EMPTY => ExpectedResult::NotEmpty,
            Value::Number(n) => n.as_i64().map(ExpectedResult::Exactly).ok_or_else(|| {
                LoadError::Config(format!("expected_result {n} is not an integer"))
            })?,
            other => {
                return Err(LoadError::Config(format!(
                    "expected_result must be \"{NOT_EMPTY}\" or an integer, got {other}"
                )))
            }
        };

        QualityCheck::new(raw.check_sql, uses_execution_date, expected)
    }
}

impl QualityGate {
    pub fn new(checks: Vec<QualityCheck>) -> Self {
        Self { checks }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: DqCheckFile = serde_json::from_str(json)
            .map_err(|err| LoadError::Config(format!("malformed dq_checks document: {err}")))?;
        let checks = file
            .dq_checks
            .into_iter()
            .map(QualityCheck::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { checks })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|err| {
            LoadError::Config(format!("failed to read {}: {err}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    pub fn checks(&self) -> &[QualityCheck] {
        &self.checks
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub async fn execute(&self, warehouse: &dyn Warehouse, ctx: &RunContext) -> Result<StepOutcome> {
        let results = run_checks(warehouse, &self.checks, ctx).await?;
        Ok(StepOutcome::Certified {
            checks: results.len(),
        })
    }
}

/// Runs `checks` in order, returning on the first failure.
pub async fn run_checks(
    warehouse: &dyn Warehouse,
    checks: &[QualityCheck],
    ctx: &RunContext,
) -> Result<Vec<CheckResult>> {
    let mut results = Vec::with_capacity(checks.len());
    for check in checks {
        let check_sql = check.render(ctx);
        let row = warehouse.first_row(&check_sql).await?;
        let result = CheckResult::evaluate(check_sql, check.expected.clone(), row).into_result()?;

        match (&result.expected, &result.actual) {
            (ExpectedResult::Exactly(expected), Some(actual)) => info!(
                check_sql = %result.check_sql,
                %actual,
                expected,
                "data quality check passed"
            ),
            _ => info!(check_sql = %result.check_sql, "data quality check passed, table is not empty"),
        }
        results.push(result);
    }
    Ok(results)
}

fn has_placeholder(template: &str) -> bool {
    substitute(template, "") != substitute(template, "?")
}

// Positional placeholders are `{}` or `{0}`; `{{` and `}}` are literal braces.
fn substitute(template: &str, value: &str) -> String {
    let mut out = String::with_capacity(template.len() + value.len());
    let mut rest = template;
    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
        } else if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
        } else if tail.starts_with("{}") {
            out.push_str(value);
            rest = &tail[2..];
        } else if tail.starts_with("{0}") {
            out.push_str(value);
            rest = &tail[3..];
        } else {
            out.push_str(&tail[..1]);
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}
