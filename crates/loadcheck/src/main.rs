use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use loadcheck_core::config::{self, PipelineConfig};
use loadcheck_core::db;
use loadcheck_core::object_store::S3ObjectStore;
use loadcheck_core::pipeline::{self, Plan};
use loadcheck_core::quality::QualityGate;
use loadcheck_core::types::RunContext;
use tracing::{info, info_span, Instrument};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(author, version, about = "Stage, model and certify I94 warehouse loads", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the plan's task ids in execution order
    Plan(PlanArgs),
    /// Run the whole plan, or one task, for an execution date
    Run(RunArgs),
    /// Run only the data quality gate for an execution date
    Check(CheckArgs),
}

#[derive(Args, Debug)]
struct PlanArgs {
    /// Pipeline config file (TOML)
    #[arg(long, default_value = "config/loadcheck.toml")]
    config: PathBuf,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Pipeline config file (TOML)
    #[arg(long, default_value = "config/loadcheck.toml")]
    config: PathBuf,
    /// Execution date, YYYY-MM-DD
    #[arg(long)]
    date: NaiveDate,
    /// Run a single task instead of the whole plan
    #[arg(long)]
    task: Option<String>,
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Pipeline config file (TOML)
    #[arg(long, default_value = "config/loadcheck.toml")]
    config: PathBuf,
    /// Execution date, YYYY-MM-DD
    #[arg(long)]
    date: NaiveDate,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Plan(args) => handle_plan(args),
        Command::Run(args) => handle_run(args).await,
        Command::Check(args) => handle_check(args).await,
    }
}

fn load_gate(config: &PipelineConfig) -> Result<QualityGate> {
    QualityGate::load(&config.dq_checks_path)
        .with_context(|| format!("failed to load {}", config.dq_checks_path.display()))
}

fn build_plan(config_path: &Path) -> Result<(PipelineConfig, Plan)> {
    let config = PipelineConfig::load(config_path)?;
    let credentials = config::credentials_from_env()?;
    let gate = load_gate(&config)?;
    let plan = pipeline::i94_plan(&config, &credentials, gate)?;
    Ok((config, plan))
}

fn handle_plan(args: PlanArgs) -> Result<()> {
    let (_, plan) = build_plan(&args.config)?;
    for task in plan.tasks() {
        println!("{:<32} {}", task.id, task.step.kind());
    }
    Ok(())
}

async fn handle_run(args: RunArgs) -> Result<()> {
    let (config, plan) = build_plan(&args.config)?;
    let ctx = RunContext::new(args.date);

    let database_url = config::database_url_from_env()?;
    let pool = db::connect(&database_url, config.max_connections).await?;
    let store = S3ObjectStore::from_env_async().await;

    let span = info_span!("run", run_id = %Uuid::new_v4(), ds = %ctx.ds);
    async move {
        match args.task.as_deref() {
            Some(id) => {
                let task = plan
                    .task(id)
                    .ok_or_else(|| anyhow!("unknown task '{id}'"))?;
                let (_, outcome) = pipeline::run_task(task, &pool, &store, &ctx)
                    .await
                    .with_context(|| format!("task '{id}' failed"))?;
                info!(task = id, ?outcome, "task completed");
            }
            None => {
                let outcomes = plan
                    .run(&pool, &store, &ctx)
                    .await
                    .with_context(|| format!("run for {} failed", ctx.ds))?;
                info!(tasks = outcomes.len(), "run completed");
            }
        }
        pool.close().await;
        Ok::<(), anyhow::Error>(())
    }
    .instrument(span)
    .await
}

async fn handle_check(args: CheckArgs) -> Result<()> {
    let config = PipelineConfig::load(&args.config)?;
    let gate = load_gate(&config)?;
    let ctx = RunContext::new(args.date);

    let database_url = config::database_url_from_env()?;
    let pool = db::connect(&database_url, config.max_connections).await?;

    let span = info_span!("check", run_id = %Uuid::new_v4(), ds = %ctx.ds);
    async move {
        let outcome = pipeline::run_quality_gate(&gate, &pool, &ctx)
            .await
            .with_context(|| format!("quality gate for {} failed", ctx.ds))?;
        info!(?outcome, "quality gate passed");
        pool.close().await;
        Ok::<(), anyhow::Error>(())
    }
    .instrument(span)
    .await
}
