use std::fmt;

use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use sqlx::pool::PoolConnection;
use sqlx::{Column, PgConnection, Postgres, Row, TypeInfo};
use tokio::sync::Mutex;

use crate::db::DbPool;
use crate::error::{LoadError, Result};

/// First-column value of a query result.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl ScalarValue {
    /// Interprets a text-format column value according to its column type.
    /// Only numeric columns become numbers and booleans count as 0 or 1;
    /// everything else stays text, so a varchar `'0'` is not zero.
    pub fn from_column(type_name: &str, raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return ScalarValue::Null;
        };
        let trimmed = raw.trim();
        match type_name {
            "INT2" | "INT4" | "INT8" | "OID" => trimmed
                .parse::<i64>()
                .map(ScalarValue::Int)
                .unwrap_or_else(|_| ScalarValue::Text(raw.to_string())),
            "FLOAT4" | "FLOAT8" | "NUMERIC" => {
                if let Ok(value) = trimmed.parse::<i64>() {
                    ScalarValue::Int(value)
                } else {
                    trimmed
                        .parse::<f64>()
                        .map(ScalarValue::Float)
                        .unwrap_or_else(|_| ScalarValue::Text(raw.to_string()))
                }
            }
            "BOOL" => match trimmed {
                "t" | "true" => ScalarValue::Int(1),
                "f" | "false" => ScalarValue::Int(0),
                _ => ScalarValue::Text(raw.to_string()),
            },
            _ => ScalarValue::Text(raw.to_string()),
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            ScalarValue::Int(value) => *value == 0,
            ScalarValue::Float(value) => *value == 0.0,
            ScalarValue::Null | ScalarValue::Text(_) => false,
        }
    }

    pub fn equals_int(&self, expected: i64) -> bool {
        match self {
            ScalarValue::Int(value) => *value == expected,
            ScalarValue::Float(value) => *value == expected as f64,
            ScalarValue::Null | ScalarValue::Text(_) => false,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Null => f.write_str("NULL"),
            ScalarValue::Int(value) => write!(f, "{value}"),
            ScalarValue::Float(value) => write!(f, "{value}"),
            ScalarValue::Text(value) => write!(f, "'{value}'"),
        }
    }
}

/// SQL endpoint the loaders and checks talk to.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Runs a statement, returning the affected row count.
    async fn run(&self, sql: &str) -> Result<u64>;

    /// Runs a query and returns the first row, or `None` when it produced
    /// no rows.
    async fn first_row(&self, sql: &str) -> Result<Option<Vec<ScalarValue>>>;
}

/// Hands out a warehouse session per step.
#[async_trait]
pub trait WarehouseConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Warehouse>>;
}

#[async_trait]
impl WarehouseConnector for DbPool {
    async fn connect(&self) -> Result<Box<dyn Warehouse>> {
        Ok(Box::new(PgWarehouse::acquire(self).await?))
    }
}

/// One pooled Postgres-protocol connection held for the life of a step.
/// The connection goes back to the pool when this value is dropped.
pub struct PgWarehouse {
    conn: Mutex<PoolConnection<Postgres>>,
}

impl PgWarehouse {
    pub async fn acquire(pool: &DbPool) -> Result<Self> {
        let conn = pool.acquire().await.map_err(|err| LoadError::Connectivity {
            context: "warehouse".to_string(),
            message: err.to_string(),
        })?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

/// First item of a result stream; an exhausted stream is `Ok(None)`.
async fn first_of<T, S>(rows: S, sql: &str) -> Result<Option<T>>
where
    S: Stream<Item = sqlx::Result<T>>,
{
    let mut rows = std::pin::pin!(rows);
    rows.try_next()
        .await
        .map_err(|err| LoadError::from_sqlx(sql, err))
}

#[async_trait]
impl Warehouse for PgWarehouse {
    async fn run(&self, sql: &str) -> Result<u64> {
        let mut guard = self.conn.lock().await;
        let conn: &mut PgConnection = guard.as_mut();
        let result = sqlx::Executor::execute(conn, sqlx::raw_sql(sql))
            .await
            .map_err(|err| LoadError::from_sqlx(sql, err))?;
        Ok(result.rows_affected())
    }

    async fn first_row(&self, sql: &str) -> Result<Option<Vec<ScalarValue>>> {
        let mut guard = self.conn.lock().await;
        let conn: &mut PgConnection = guard.as_mut();
        let Some(row) = first_of(sqlx::raw_sql(sql).fetch(conn), sql).await? else {
            return Ok(None);
        };

        // Simple-protocol results arrive as text regardless of column type.
        let mut values = Vec::with_capacity(row.len());
        for (idx, column) in row.columns().iter().enumerate() {
            let raw: Option<String> = row
                .try_get_unchecked(idx)
                .map_err(|err| LoadError::from_sqlx(sql, err))?;
            values.push(ScalarValue::from_column(
                column.type_info().name(),
                raw.as_deref(),
            ));
        }
        Ok(Some(values))
    }
}
