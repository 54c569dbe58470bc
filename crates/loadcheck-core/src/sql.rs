//! Statement text for the bulk-load and clear steps.

use crate::types::{AwsCredentials, LoadTarget};

pub fn delete_all(target: &LoadTarget) -> String {
    format!("DELETE FROM {}", target.qualified_name())
}

pub fn copy_parquet(target: &LoadTarget, uri: &str, iam_role: &str) -> String {
    format!(
        "COPY {} FROM '{}' IAM_ROLE '{}' FORMAT AS PARQUET;",
        target.qualified_name(),
        uri,
        iam_role
    )
}

pub fn copy_csv(target: &LoadTarget, uri: &str, credentials: &AwsCredentials) -> String {
    format!(
        "COPY {} FROM '{}' ACCESS_KEY_ID '{}' SECRET_ACCESS_KEY '{}' CSV IGNOREHEADER 1;",
        target.qualified_name(),
        uri,
        credentials.access_key_id,
        credentials.secret_access_key
    )
}

/// Replaces secrets in a COPY statement before it reaches a log line.
pub fn redact(statement: &str, credentials: &AwsCredentials) -> String {
    statement.replace(credentials.secret_access_key.as_str(), "****")
}
