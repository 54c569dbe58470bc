#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use loadcheck_core::error::{LoadError, Result};
use loadcheck_core::object_store::ObjectStore;
use loadcheck_core::types::RunContext;
use loadcheck_core::warehouse::{ScalarValue, Warehouse, WarehouseConnector};

pub fn ctx(year: i32, month: u32, day: u32) -> RunContext {
    RunContext::new(NaiveDate::from_ymd_opt(year, month, day).expect("valid date"))
}

#[derive(Default)]
struct State {
    statements: Vec<String>,
    row_counts: HashMap<String, u64>,
    copy_rows: HashMap<String, u64>,
    inserts: HashMap<String, (String, u64)>,
    answers: HashMap<String, Option<Vec<ScalarValue>>>,
    failing: Option<String>,
    sessions: usize,
}

/// In-memory warehouse that tracks row counts per table.
///
/// `DELETE FROM t` empties `t`, `COPY t FROM ...` adds the rows registered
/// with `with_copy_rows`, and a registered insert statement adds its rows to
/// its table. Queries are answered from `with_answer`, falling back to the
/// row count for `SELECT COUNT(*) FROM t`. Clones share state.
#[derive(Clone, Default)]
pub struct FakeWarehouse {
    state: Arc<Mutex<State>>,
}

impl FakeWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(self, table: &str, rows: u64) -> Self {
        self.state
            .lock()
            .unwrap()
            .row_counts
            .insert(table.to_string(), rows);
        self
    }

    pub fn with_copy_rows(self, table: &str, rows: u64) -> Self {
        self.state
            .lock()
            .unwrap()
            .copy_rows
            .insert(table.to_string(), rows);
        self
    }

    pub fn with_insert(self, sql: &str, table: &str, rows: u64) -> Self {
        self.state
            .lock()
            .unwrap()
            .inserts
            .insert(sql.to_string(), (table.to_string(), rows));
        self
    }

    pub fn with_answer(self, sql: &str, row: Option<Vec<ScalarValue>>) -> Self {
        self.state
            .lock()
            .unwrap()
            .answers
            .insert(sql.to_string(), row);
        self
    }

    /// Statements containing `needle` fail as if the warehouse rejected them.
    pub fn failing_on(self, needle: &str) -> Self {
        self.state.lock().unwrap().failing = Some(needle.to_string());
        self
    }

    pub fn statements(&self) -> Vec<String> {
        self.state.lock().unwrap().statements.clone()
    }

    pub fn row_count(&self, table: &str) -> u64 {
        self.state
            .lock()
            .unwrap()
            .row_counts
            .get(table)
            .copied()
            .unwrap_or(0)
    }

    pub fn sessions(&self) -> usize {
        self.state.lock().unwrap().sessions
    }

    fn check_failure(state: &State, sql: &str) -> Result<()> {
        match &state.failing {
            Some(needle) if sql.contains(needle.as_str()) => Err(LoadError::SqlExecution {
                statement: sql.to_string(),
                message: "relation does not exist".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Warehouse for FakeWarehouse {
    async fn run(&self, sql: &str) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        state.statements.push(sql.to_string());
        Self::check_failure(&state, sql)?;

        if let Some(table) = sql.strip_prefix("DELETE FROM ") {
            let removed = state.row_counts.insert(table.trim().to_string(), 0);
            return Ok(removed.unwrap_or(0));
        }

        if let Some(rest) = sql.strip_prefix("COPY ") {
            let table = rest.split_whitespace().next().unwrap_or_default().to_string();
            let rows = state.copy_rows.get(&table).copied().unwrap_or(0);
            *state.row_counts.entry(table).or_insert(0) += rows;
            return Ok(rows);
        }

        if let Some((table, rows)) = state.inserts.get(sql).cloned() {
            *state.row_counts.entry(table).or_insert(0) += rows;
            return Ok(rows);
        }

        Ok(0)
    }

    async fn first_row(&self, sql: &str) -> Result<Option<Vec<ScalarValue>>> {
        let mut state = self.state.lock().unwrap();
        state.statements.push(sql.to_string());
        Self::check_failure(&state, sql)?;

        if let Some(answer) = state.answers.get(sql) {
            return Ok(answer.clone());
        }

        if let Some(table) = sql.strip_prefix("SELECT COUNT(*) FROM ") {
            let count = state.row_counts.get(table.trim()).copied().unwrap_or(0);
            return Ok(Some(vec![ScalarValue::Int(count as i64)]));
        }

        Ok(None)
    }
}

#[async_trait]
impl WarehouseConnector for FakeWarehouse {
    async fn connect(&self) -> Result<Box<dyn Warehouse>> {
        self.state.lock().unwrap().sessions += 1;
        Ok(Box::new(self.clone()))
    }
}

#[derive(Default)]
pub struct FakeObjectStore {
    objects: HashSet<(String, String)>,
    lookups: Mutex<Vec<String>>,
    unreachable: bool,
}

impl FakeObjectStore {
    /// Every lookup fails as if the storage endpoint were down.
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub fn with_object(mut self, bucket: &str, key: &str) -> Self {
        self.objects.insert((bucket.to_string(), key.to_string()));
        self
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn exists(&self, bucket: &str, key: &str) -> Result<bool> {
        self.lookups.lock().unwrap().push(format!("{bucket}/{key}"));
        if self.unreachable {
            return Err(LoadError::Connectivity {
                context: "object store".to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(self
            .objects
            .contains(&(bucket.to_string(), key.to_string())))
    }
}
