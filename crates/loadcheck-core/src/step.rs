use tracing::info;

use crate::error::Result;
use crate::model_load::ModelLoad;
use crate::object_store::ObjectStore;
use crate::quality::QualityGate;
use crate::staging::{StageCsv, StageParquet};
use crate::types::RunContext;
use crate::warehouse::Warehouse;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Loaded,
    /// The step ran its clear but had nothing to copy.
    Skipped { reason: String },
    Certified { checks: usize },
}

/// External systems a step talks to. Borrowed for a single step.
#[derive(Clone, Copy)]
pub struct Services<'a> {
    pub warehouse: &'a dyn Warehouse,
    pub object_store: &'a dyn ObjectStore,
}

#[derive(Debug, Clone)]
pub enum Step {
    StageParquet(StageParquet),
    StageCsv(StageCsv),
    ModelLoad(ModelLoad),
    QualityCheck(QualityGate),
}

impl Step {
    pub fn kind(&self) -> &'static str {
        match self {
            Step::StageParquet(_) => "stage_parquet",
            Step::StageCsv(_) => "stage_csv",
            Step::ModelLoad(_) => "model_load",
            Step::QualityCheck(_) => "quality_check",
        }
    }

    pub async fn execute(&self, services: Services<'_>, ctx: &RunContext) -> Result<StepOutcome> {
        match self {
            Step::StageParquet(stage) => stage.execute(services.warehouse, ctx).await,
            Step::StageCsv(stage) => stage.execute(services.warehouse, services.object_store).await,
            Step::ModelLoad(load) => load.execute(services.warehouse).await,
            Step::QualityCheck(gate) => gate.execute(services.warehouse, ctx).await,
        }
    }
}

/// A step with the id the scheduler knows it by.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: String,
    pub step: Step,
}

impl Task {
    pub fn new(id: impl Into<String>, step: Step) -> Self {
        Self {
            id: id.into(),
            step,
        }
    }

    pub async fn execute(&self, services: Services<'_>, ctx: &RunContext) -> Result<StepOutcome> {
        info!(task = %self.id, kind = self.step.kind(), ds = %ctx.ds, "starting task");
        let outcome = self.step.execute(services, ctx).await?;
        info!(task = %self.id, ?outcome, "task finished");
        Ok(outcome)
    }
}
