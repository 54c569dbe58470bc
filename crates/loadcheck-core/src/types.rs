use std::fmt;

use chrono::NaiveDate;

use crate::error::{LoadError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Keep existing rows and insert the new ones on top.
    Append,
    /// Remove every row before inserting.
    FullRefresh,
}

/// A warehouse table and the way it gets populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTarget {
    schema: String,
    table: String,
    write_mode: WriteMode,
}

impl LoadTarget {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        write_mode: WriteMode,
    ) -> Result<Self> {
        let schema = schema.into();
        let table = table.into();
        if schema.trim().is_empty() {
            return Err(LoadError::Config(format!(
                "schema name for table '{table}' cannot be empty"
            )));
        }
        if table.trim().is_empty() {
            return Err(LoadError::Config(format!(
                "table name in schema '{schema}' cannot be empty"
            )));
        }
        Ok(Self {
            schema,
            table,
            write_mode,
        })
    }

    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }

    pub fn with_write_mode(mut self, write_mode: WriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

impl fmt::Display for LoadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// Bucket plus key. For partitioned sources the key is the prefix that the
/// partition fragment gets appended to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub bucket: String,
    pub key: String,
}

impl SourceLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Result<Self> {
        let bucket = bucket.into();
        let key = key.into();
        if bucket.trim().is_empty() {
            return Err(LoadError::Config(format!(
                "bucket for source '{key}' cannot be empty"
            )));
        }
        if key.trim().is_empty() {
            return Err(LoadError::Config(format!(
                "source key in bucket '{bucket}' cannot be empty"
            )));
        }
        Ok(Self { bucket, key })
    }

    pub fn uri(&self, path: &str) -> String {
        format!("s3://{}/{}", self.bucket, path)
    }
}

/// Static access keys handed to `COPY ... CSV`.
#[derive(Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Execution instant handed down by whoever schedules the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub execution_date: NaiveDate,
    pub ds: String,
}

impl RunContext {
    pub fn new(execution_date: NaiveDate) -> Self {
        Self {
            execution_date,
            ds: execution_date.format("%Y-%m-%d").to_string(),
        }
    }
}
