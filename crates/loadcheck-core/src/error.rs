// crates/loadcheck-core/src/error.rs

use thiserror::Error;

use crate::quality::ExpectedResult;
use crate::warehouse::ScalarValue;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("could not reach {context}: {message}")]
    Connectivity { context: String, message: String },

    #[error("statement rejected by the warehouse: {message}\n  statement: {statement}")]
    SqlExecution { statement: String, message: String },

    #[error("data quality check failed, query returned no rows: {check_sql}")]
    EmptyResult { check_sql: String },

    #[error("data quality check failed. Expected: {expected} | Got: {actual} | SQL: {check_sql}")]
    ExpectationMismatch {
        check_sql: String,
        expected: ExpectedResult,
        actual: ScalarValue,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl LoadError {
    /// Classifies a driver error raised while running `statement`.
    pub fn from_sqlx(statement: &str, err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::Connectivity {
                context: "warehouse".to_string(),
                message: err.to_string(),
            },
            other => Self::SqlExecution {
                statement: statement.trim().to_string(),
                message: other.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, LoadError>;
