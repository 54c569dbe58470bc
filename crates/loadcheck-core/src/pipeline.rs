//! The I94 immigration load plan and a runner for it.
//!
//! Staging tasks touch disjoint tables and run concurrently. The model loads
//! run one after another (fact before dimension) and the quality gate runs
//! last. Retries belong to whatever schedules the plan.

use futures::future::join_all;
use tracing::{error, info};

use crate::config::PipelineConfig;
use crate::error::{LoadError, Result};
use crate::model_load::ModelLoad;
use crate::object_store::ObjectStore;
use crate::quality::QualityGate;
use crate::queries;
use crate::staging::{StageCsv, StageParquet};
use crate::step::{Services, Step, StepOutcome, Task};
use crate::types::{AwsCredentials, LoadTarget, RunContext, SourceLocation, WriteMode};
use crate::warehouse::WarehouseConnector;

/// Lookup tables staged from CSV: (task id, table, file name).
const LABEL_SOURCES: &[(&str, &str, &str)] = &[
    ("copy_usa_port_description", "usa_port", "usa_port.csv"),
    ("copy_travel_way_description", "travel_way", "travel_way.csv"),
    ("copy_visa_code_description", "visa_code", "visa_code.csv"),
    ("copy_country_code_description", "i94country_code", "country_code.csv"),
];

#[derive(Debug, Clone)]
pub struct Plan {
    pub stages: Vec<Task>,
    pub loads: Vec<Task>,
    pub gate: Option<Task>,
}

impl Plan {
    /// Tasks in the order `run` finishes them.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.stages
            .iter()
            .chain(self.loads.iter())
            .chain(self.gate.iter())
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks().find(|task| task.id == id)
    }

    pub async fn run(
        &self,
        connector: &dyn WarehouseConnector,
        object_store: &dyn ObjectStore,
        ctx: &RunContext,
    ) -> Result<Vec<(String, StepOutcome)>> {
        info!(ds = %ctx.ds, stages = self.stages.len(), "running staging tasks");
        // Every stage runs to completion before a failure is reported, so a
        // failing stage never interrupts another one between clear and copy.
        let results = join_all(
            self.stages
                .iter()
                .map(|task| run_task(task, connector, object_store, ctx)),
        )
        .await;
        let mut outcomes = Vec::with_capacity(results.len());
        let mut first_error = None;
        for result in results {
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => {
                    error!(error = %err, "staging task failed");
                    first_error.get_or_insert(err);
                }
            }
        }
        if let Some(err) = first_error {
            return Err(err);
        }

        for task in self.loads.iter().chain(self.gate.iter()) {
            outcomes.push(run_task(task, connector, object_store, ctx).await?);
        }

        info!(ds = %ctx.ds, tasks = outcomes.len(), "plan finished");
        Ok(outcomes)
    }
}

/// Runs one task on its own warehouse session.
pub async fn run_task(
    task: &Task,
    connector: &dyn WarehouseConnector,
    object_store: &dyn ObjectStore,
    ctx: &RunContext,
) -> Result<(String, StepOutcome)> {
    let warehouse = connector.connect().await?;
    let services = Services {
        warehouse: warehouse.as_ref(),
        object_store,
    };
    let outcome = task.execute(services, ctx).await?;
    Ok((task.id.clone(), outcome))
}

/// Runs the quality gate on its own warehouse session. Needs neither object
/// storage nor copy credentials.
pub async fn run_quality_gate(
    gate: &QualityGate,
    connector: &dyn WarehouseConnector,
    ctx: &RunContext,
) -> Result<StepOutcome> {
    if gate.is_empty() {
        return Err(LoadError::Config(
            "quality gate has no checks configured".into(),
        ));
    }
    let warehouse = connector.connect().await?;
    gate.execute(warehouse.as_ref(), ctx).await
}

pub fn i94_plan(
    config: &PipelineConfig,
    credentials: &AwsCredentials,
    gate: QualityGate,
) -> Result<Plan> {
    let immigration_mode = if config.append_only_immigration {
        WriteMode::Append
    } else {
        WriteMode::FullRefresh
    };

    let mut stages = vec![Task::new(
        "copy_i94_immigration_data",
        Step::StageParquet(
            StageParquet::new(
                LoadTarget::new(queries::SCHEMA, "immigration_staging_day", immigration_mode)?,
                SourceLocation::new(&config.bucket, &config.immigration_prefix)?,
                &config.iam_role_arn,
            )?
            .with_test_mode(config.test_mode),
        ),
    )];

    for (id, table, file) in LABEL_SOURCES {
        let key = format!("{}/{}", config.labels_prefix.trim_end_matches('/'), file);
        stages.push(Task::new(
            *id,
            Step::StageCsv(StageCsv::new(
                LoadTarget::new(queries::SCHEMA, *table, WriteMode::FullRefresh)?,
                SourceLocation::new(&config.bucket, key)?,
                credentials.clone(),
            )?),
        ));
    }

    let loads = vec![
        Task::new(
            "load_usa_travelers_info",
            Step::ModelLoad(ModelLoad::fact(
                queries::SCHEMA,
                "city_state_travelers_entry",
                queries::CITY_STATE_TRAVELERS_ENTRY_INSERT,
            )?),
        ),
        Task::new(
            "load_arrival_date",
            Step::ModelLoad(ModelLoad::dimension(
                queries::SCHEMA,
                "arrival_date",
                queries::ARRIVAL_DATE_INSERT,
            )?),
        ),
    ];

    if gate.is_empty() {
        return Err(LoadError::Config(
            "quality gate has no checks configured".into(),
        ));
    }

    Ok(Plan {
        stages,
        loads,
        gate: Some(Task::new("run_data_quality_checks", Step::QualityCheck(gate))),
    })
}
