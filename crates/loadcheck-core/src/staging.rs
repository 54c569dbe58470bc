//! Bulk loads from object storage into staging tables.
//!
//! The clear and the copy are two separate statements. Nothing wraps them in
//! a transaction, so a failure after the clear leaves the staging table empty
//! until the step is run again.

use tracing::{debug, info, warn};

use crate::error::{LoadError, Result};
use crate::object_store::ObjectStore;
use crate::partition;
use crate::sql;
use crate::step::StepOutcome;
use crate::types::{AwsCredentials, LoadTarget, RunContext, SourceLocation, WriteMode};
use crate::warehouse::Warehouse;

/// Date-partitioned Parquet source copied with an IAM role.
#[derive(Debug, Clone)]
pub struct StageParquet {
    target: LoadTarget,
    source: SourceLocation,
    iam_role: String,
    test_mode: bool,
}

impl StageParquet {
    /// The table is cleared first unless `target` is in append mode.
    pub fn new(
        target: LoadTarget,
        source: SourceLocation,
        iam_role: impl Into<String>,
    ) -> Result<Self> {
        let iam_role = iam_role.into();
        if iam_role.trim().is_empty() {
            return Err(LoadError::Config(format!(
                "staging load into {target} needs an IAM role"
            )));
        }
        Ok(Self {
            target,
            source,
            iam_role,
            test_mode: false,
        })
    }

    /// Load the prefix itself instead of the dated partition under it.
    pub fn with_test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    pub fn target(&self) -> &LoadTarget {
        &self.target
    }

    pub fn source_uri(&self, ctx: &RunContext) -> String {
        let path = partition::resolve(&self.source.key, ctx.execution_date, self.test_mode);
        self.source.uri(&path)
    }

    pub async fn execute(&self, warehouse: &dyn Warehouse, ctx: &RunContext) -> Result<StepOutcome> {
        info!(table = %self.target, "copying parquet data from object storage");

        if self.target.write_mode() == WriteMode::FullRefresh {
            info!(table = %self.target, "clearing staging table");
            warehouse.run(&sql::delete_all(&self.target)).await?;
        }

        // A missing partition is a zero-row load on the warehouse side.
        let uri = self.source_uri(ctx);
        let statement = sql::copy_parquet(&self.target, &uri, &self.iam_role);
        debug!(%statement, "issuing copy");
        warehouse.run(&statement).await?;

        info!(table = %self.target, %uri, "parquet copy finished");
        Ok(StepOutcome::Loaded)
    }
}

/// Single delimited file with a header row, copied with access keys.
#[derive(Debug, Clone)]
pub struct StageCsv {
    target: LoadTarget,
    source: SourceLocation,
    credentials: AwsCredentials,
}

impl StageCsv {
    pub fn new(
        target: LoadTarget,
        source: SourceLocation,
        credentials: AwsCredentials,
    ) -> Result<Self> {
        if target.write_mode() != WriteMode::FullRefresh {
            return Err(LoadError::Config(format!(
                "csv staging into {target} always clears the table; append mode is not supported"
            )));
        }
        if credentials.access_key_id.is_empty() || credentials.secret_access_key.is_empty() {
            return Err(LoadError::Config(format!(
                "csv staging into {target} needs an access key pair"
            )));
        }
        Ok(Self {
            target,
            source,
            credentials,
        })
    }

    pub fn target(&self) -> &LoadTarget {
        &self.target
    }

    pub async fn execute(
        &self,
        warehouse: &dyn Warehouse,
        store: &dyn ObjectStore,
    ) -> Result<StepOutcome> {
        info!(table = %self.target, "staging csv data from object storage");

        info!(table = %self.target, "clearing staging table");
        warehouse.run(&sql::delete_all(&self.target)).await?;

        let uri = self.source.uri(&self.source.key);
        if !store.exists(&self.source.bucket, &self.source.key).await? {
            warn!(table = %self.target, %uri, "source object not found, skipping copy");
            return Ok(StepOutcome::Skipped {
                reason: format!("{uri} does not exist"),
            });
        }

        let statement = sql::copy_csv(&self.target, &uri, &self.credentials);
        debug!(statement = %sql::redact(&statement, &self.credentials), "issuing copy");
        warehouse.run(&statement).await?;

        info!(table = %self.target, %uri, "csv copy finished");
        Ok(StepOutcome::Loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn parquet(test_mode: bool) -> StageParquet {
        StageParquet::new(
            LoadTarget::new("usa", "immigration_staging_day", WriteMode::FullRefresh).unwrap(),
            SourceLocation::new("jjq-capstone", "raw/i94_immigration_data").unwrap(),
            "arn:aws:iam::000000000000:role/redshift",
        )
        .unwrap()
        .with_test_mode(test_mode)
    }

    #[test]
    fn source_uri_uses_partition() {
        let ctx = RunContext::new(NaiveDate::from_ymd_opt(2016, 4, 1).unwrap());
        assert_eq!(
            parquet(false).source_uri(&ctx),
            "s3://jjq-capstone/raw/i94_immigration_data/arrival_year=2016/arrival_month=4/arrival_day=1/"
        );
    }

    #[test]
    fn source_uri_in_test_mode_is_the_prefix() {
        let ctx = RunContext::new(NaiveDate::from_ymd_opt(2016, 4, 1).unwrap());
        assert_eq!(
            parquet(true).source_uri(&ctx),
            "s3://jjq-capstone/raw/i94_immigration_data"
        );
    }

    #[test]
    fn parquet_requires_iam_role() {
        let err = StageParquet::new(
            LoadTarget::new("usa", "immigration_staging_day", WriteMode::Append).unwrap(),
            SourceLocation::new("jjq-capstone", "raw").unwrap(),
            "",
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::Config(_)));
    }

    #[test]
    fn csv_rejects_append_mode() {
        let err = StageCsv::new(
            LoadTarget::new("usa", "usa_port", WriteMode::Append).unwrap(),
            SourceLocation::new("jjq-capstone", "raw/usa_port.csv").unwrap(),
            AwsCredentials {
                access_key_id: "AKIA".into(),
                secret_access_key: "secret".into(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::Config(_)));
    }
}
