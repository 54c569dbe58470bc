use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::types::AwsCredentials;

/// Pipeline settings read from a TOML file. Secrets stay in the environment.
/// The table schema is fixed by the insert statements and is not a setting.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    pub bucket: String,
    pub iam_role_arn: String,
    #[serde(default = "default_immigration_prefix")]
    pub immigration_prefix: String,
    #[serde(default = "default_labels_prefix")]
    pub labels_prefix: String,
    #[serde(default = "default_true")]
    pub append_only_immigration: bool,
    #[serde(default)]
    pub test_mode: bool,
    pub dq_checks_path: PathBuf,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_immigration_prefix() -> String {
    "raw/i94_immigration_data".to_string()
}

fn default_labels_prefix() -> String {
    "raw/i94_immigration_labels_description".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_connections() -> u32 {
    5
}

impl PipelineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("failed to parse pipeline config")
    }

    /// Reads the file and resolves `dq_checks_path` against its directory.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut config = Self::from_toml_str(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        if config.dq_checks_path.is_relative() {
            if let Some(dir) = path.parent() {
                config.dq_checks_path = dir.join(&config.dq_checks_path);
            }
        }
        Ok(config)
    }
}

/// Access keys used by the CSV staging copies.
pub fn credentials_from_env() -> Result<AwsCredentials> {
    let access_key_id =
        std::env::var("AWS_ACCESS_KEY_ID").context("AWS_ACCESS_KEY_ID must be set")?;
    let secret_access_key =
        std::env::var("AWS_SECRET_ACCESS_KEY").context("AWS_SECRET_ACCESS_KEY must be set")?;
    Ok(AwsCredentials {
        access_key_id,
        secret_access_key,
    })
}

/// `DATABASE_URL`, falling back to `LOADCHECK_DATABASE_URL`.
pub fn database_url_from_env() -> Result<String> {
    std::env::var("DATABASE_URL")
        .or_else(|_| std::env::var("LOADCHECK_DATABASE_URL"))
        .context("DATABASE_URL (or LOADCHECK_DATABASE_URL) must be set")
}
