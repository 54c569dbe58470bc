//! Fact and dimension loads driven by a caller-supplied insert statement.

use tracing::info;

use crate::error::{LoadError, Result};
use crate::sql;
use crate::step::StepOutcome;
use crate::types::{LoadTarget, WriteMode};
use crate::warehouse::Warehouse;

#[derive(Debug, Clone)]
pub struct ModelLoad {
    target: LoadTarget,
    insert_sql: String,
}

impl ModelLoad {
    /// Fact tables append by default. Re-running with overlapping source
    /// rows inserts them again.
    pub fn fact(
        schema: impl Into<String>,
        table: impl Into<String>,
        insert_sql: impl Into<String>,
    ) -> Result<Self> {
        Self::new(LoadTarget::new(schema, table, WriteMode::Append)?, insert_sql)
    }

    /// Dimension tables are rebuilt from scratch by default.
    pub fn dimension(
        schema: impl Into<String>,
        table: impl Into<String>,
        insert_sql: impl Into<String>,
    ) -> Result<Self> {
        Self::new(
            LoadTarget::new(schema, table, WriteMode::FullRefresh)?,
            insert_sql,
        )
    }

    pub fn new(target: LoadTarget, insert_sql: impl Into<String>) -> Result<Self> {
        let insert_sql = insert_sql.into();
        if insert_sql.trim().is_empty() {
            return Err(LoadError::Config(format!(
                "load into {target} has an empty insert statement"
            )));
        }
        Ok(Self { target, insert_sql })
    }

    pub fn with_write_mode(mut self, write_mode: WriteMode) -> Self {
        self.target = self.target.with_write_mode(write_mode);
        self
    }

    pub fn target(&self) -> &LoadTarget {
        &self.target
    }

    pub fn insert_sql(&self) -> &str {
        &self.insert_sql
    }

    pub async fn execute(&self, warehouse: &dyn Warehouse) -> Result<StepOutcome> {
        info!(table = %self.target, "inserting data");

        if self.target.write_mode() == WriteMode::FullRefresh {
            info!(table = %self.target, "clearing all records in table");
            warehouse.run(&sql::delete_all(&self.target)).await?;
        }

        let inserted = warehouse.run(&self.insert_sql).await?;
        info!(table = %self.target, rows = inserted, "insert finished");
        Ok(StepOutcome::Loaded)
    }
}
