//! S3-compatible storage backend.

use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use tracing::debug;

use crate::constants::{DEFAULT_STORAGE_REGION, OUTBOUND_REQUEST_TIMEOUT};
use crate::error::AppError;
use crate::storage::ObjectStore;

pub struct S3ObjectStore {
    client: Client,
    container: String,
}

impl S3ObjectStore {
    /// Build a client for an S3-compatible endpoint. Credentials come from
    /// the standard AWS environment; the region falls back to a fixed
    /// default so custom endpoints work without extra setup.
    pub async fn new(endpoint: &str, container: &str) -> Self {
        let region =
            RegionProviderChain::default_provider().or_else(Region::new(DEFAULT_STORAGE_REGION));
        let timeouts = TimeoutConfig::builder()
            .operation_timeout(OUTBOUND_REQUEST_TIMEOUT)
            .build();
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(region)
            .timeout_config(timeouts)
            .load()
            .await;
        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .endpoint_url(endpoint)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(s3_config),
            container: container.to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list_objects(&self) -> Result<Vec<String>, AppError> {
        let mut names = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_objects_v2()
                .bucket(&self.container)
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|err| AppError::Storage(DisplayErrorContext(err).to_string()))?;

            names.extend(
                output
                    .contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string)),
            );

            match output.next_continuation_token() {
                Some(token) => continuation_token = Some(token.to_string()),
                None => break,
            }
        }

        names.sort();
        debug!(count = names.len(), container = %self.container, "Listed objects");
        Ok(names)
    }

    async fn get_object(&self, name: &str) -> Result<Vec<u8>, AppError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.container)
            .key(name)
            .send()
            .await
            .map_err(|err| {
                if err
                    .as_service_error()
                    .is_some_and(|service_err| service_err.is_no_such_key())
                {
                    AppError::ObjectNotFound(name.to_string())
                } else {
                    AppError::Storage(DisplayErrorContext(err).to_string())
                }
            })?;

        let content = output
            .body
            .collect()
            .await
            .map_err(|err| AppError::Storage(err.to_string()))?;
        Ok(content.into_bytes().to_vec())
    }

    async fn put_object(&self, name: &str, content: &[u8]) -> Result<(), AppError> {
        self.client
            .put_object()
            .bucket(&self.container)
            .key(name)
            .body(ByteStream::from(content.to_vec()))
            .send()
            .await
            .map_err(|err| AppError::Storage(DisplayErrorContext(err).to_string()))?;
        Ok(())
    }

    async fn delete_object(&self, name: &str) -> Result<(), AppError> {
        // S3 deletes of missing keys report success, so probe first to keep
        // "delete of a missing object is an error" semantics.
        self.client
            .head_object()
            .bucket(&self.container)
            .key(name)
            .send()
            .await
            .map_err(|err| {
                if err
                    .as_service_error()
                    .is_some_and(|service_err| service_err.is_not_found())
                {
                    AppError::ObjectNotFound(name.to_string())
                } else {
                    AppError::Storage(DisplayErrorContext(err).to_string())
                }
            })?;

        self.client
            .delete_object()
            .bucket(&self.container)
            .key(name)
            .send()
            .await
            .map_err(|err| AppError::Storage(DisplayErrorContext(err).to_string()))?;
        Ok(())
    }
}
