use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::{debug, info};

use crate::config::Config;
use crate::storage::{BlobStore, StoreError};

/// Constructs an S3 client. Uses static credentials and a custom endpoint when
/// configured (MinIO locally), otherwise the default AWS provider chain.
pub async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.aws_region.clone()));

    if let (Some(key_id), Some(secret)) = (&config.aws_access_key_id, &config.aws_secret_access_key)
    {
        loader = loader.credentials_provider(Credentials::new(
            key_id,
            secret,
            None,
            None,
            "match-api-static",
        ));
    }
    if let Some(endpoint) = &config.s3_endpoint {
        loader = loader.endpoint_url(endpoint);
    }

    let sdk_config = loader.load().await;
    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(config.s3_endpoint.is_some())
        .build();

    info!(
        "S3 client initialized (region: {}, custom endpoint: {})",
        config.aws_region,
        config.s3_endpoint.is_some()
    );
    aws_sdk_s3::Client::from_conf(s3_config)
}

/// Blob store over one S3 bucket. A missing bucket name is a configuration
/// error reported per operation, so the service can still start and report it
/// through the health check.
#[derive(Clone)]
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: Option<String>,
}

impl S3BlobStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: Option<String>) -> Self {
        Self { client, bucket }
    }

    fn bucket(&self) -> Result<&str, StoreError> {
        self.bucket
            .as_deref()
            .ok_or_else(|| StoreError::Configuration("RAW_INPUTS_BUCKET is not set".to_string()))
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put_text(&self, key: &str, body: &str) -> Result<(), StoreError> {
        let bucket = self.bucket()?;
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body.as_bytes().to_vec()))
            .content_type("text/plain")
            .send()
            .await
            .map_err(|e| StoreError::Blob(format!("S3 upload of {key} failed: {e}")))?;

        debug!("Uploaded s3://{bucket}/{key}");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, StoreError> {
        let bucket = self.bucket()?;
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().map(|se| se.is_no_such_key()) == Some(true) {
                    StoreError::BlobNotFound(key.to_string())
                } else {
                    StoreError::Blob(format!("S3 download of {key} failed: {e}"))
                }
            })?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Blob(format!("S3 body read of {key} failed: {e}")))?;
        Ok(data.into_bytes())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let bucket = self.bucket()?;
        self.client
            .head_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| StoreError::Blob(format!("bucket {bucket} not accessible: {e}")))?;
        Ok(())
    }
}
