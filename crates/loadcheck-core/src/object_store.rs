//! Existence checks against S3-compatible storage.

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn exists(&self, bucket: &str, key: &str) -> Result<bool>;
}

#[cfg(feature = "runtime")]
pub use s3::{S3Config, S3ObjectStore};

#[cfg(feature = "runtime")]
mod s3 {
    use async_trait::async_trait;
    use aws_config::BehaviorVersion;
    use aws_credential_types::provider::SharedCredentialsProvider;
    use aws_credential_types::Credentials;
    use aws_sdk_s3::config::Region;
    use aws_sdk_s3::Client;

    use super::ObjectStore;
    use crate::error::{LoadError, Result};

    #[derive(Debug, Clone)]
    pub struct S3Config {
        pub region: String,
        pub endpoint: Option<String>,
        pub access_key_id: Option<String>,
        pub secret_access_key: Option<String>,
        pub force_path_style: bool,
    }

    impl Default for S3Config {
        fn default() -> Self {
            Self {
                region: "us-west-2".to_string(),
                endpoint: None,
                access_key_id: None,
                secret_access_key: None,
                force_path_style: false,
            }
        }
    }

    impl S3Config {
        /// Reads `S3_REGION`, `S3_ENDPOINT_URL`, `AWS_ACCESS_KEY_ID`,
        /// `AWS_SECRET_ACCESS_KEY` and `S3_FORCE_PATH_STYLE`.
        pub fn from_env() -> Self {
            let defaults = Self::default();
            let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
            Self {
                region: var("S3_REGION").unwrap_or(defaults.region),
                endpoint: var("S3_ENDPOINT_URL"),
                access_key_id: var("AWS_ACCESS_KEY_ID"),
                secret_access_key: var("AWS_SECRET_ACCESS_KEY"),
                force_path_style: var("S3_FORCE_PATH_STYLE")
                    .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                    .unwrap_or(false),
            }
        }
    }

    #[derive(Clone)]
    pub struct S3ObjectStore {
        client: Client,
    }

    impl S3ObjectStore {
        pub async fn new(config: S3Config) -> Self {
            let mut loader = aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(config.region.clone()));

            if let (Some(access_key), Some(secret_key)) =
                (&config.access_key_id, &config.secret_access_key)
            {
                let credentials = Credentials::new(access_key, secret_key, None, None, "static");
                loader = loader.credentials_provider(SharedCredentialsProvider::new(credentials));
            }

            let shared_config = loader.load().await;
            let mut builder = aws_sdk_s3::config::Builder::from(&shared_config);

            if let Some(endpoint) = &config.endpoint {
                builder = builder.endpoint_url(endpoint);
            }

            if config.force_path_style {
                builder = builder.force_path_style(true);
            }

            Self {
                client: Client::from_conf(builder.build()),
            }
        }

        pub async fn from_env_async() -> Self {
            Self::new(S3Config::from_env()).await
        }
    }

    #[async_trait]
    impl ObjectStore for S3ObjectStore {
        async fn exists(&self, bucket: &str, key: &str) -> Result<bool> {
            match self.client.head_object().bucket(bucket).key(key).send().await {
                Ok(_) => Ok(true),
                Err(err) => {
                    if err
                        .as_service_error()
                        .map(|service_err| service_err.is_not_found())
                        .unwrap_or(false)
                    {
                        Ok(false)
                    } else {
                        Err(LoadError::Connectivity {
                            context: format!("object store (s3://{bucket}/{key})"),
                            message: err.to_string(),
                        })
                    }
                }
            }
        }
    }
}
