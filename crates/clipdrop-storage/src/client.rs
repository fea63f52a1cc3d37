//! R2 client implementation.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};
use url::Url;

use clipdrop_models::Category;

use crate::error::{StorageError, StorageResult};
use crate::keys::{thumbnail_key, validate_key, video_key};
use crate::payload::{MediaStore, StoredObject, UploadPayload};

/// Configuration for R2 client.
#[derive(Debug, Clone)]
pub struct R2Config {
    /// R2 endpoint URL (S3 API endpoint)
    pub endpoint_url: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    /// Region (usually "auto" for R2)
    pub region: String,
    /// Public bucket or custom domain that serves uploaded objects
    pub public_base_url: Url,
}

fn required_env(name: &str) -> StorageResult<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| StorageError::MissingEnv(name.to_string()))
}

impl R2Config {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        let public_base_url = Url::parse(&required_env("R2_PUBLIC_BASE_URL")?)?;
        if !matches!(public_base_url.scheme(), "http" | "https") {
            return Err(StorageError::config_error(format!(
                "R2_PUBLIC_BASE_URL must be http(s), got {}",
                public_base_url
            )));
        }

        Ok(Self {
            endpoint_url: required_env("R2_ENDPOINT_URL")?,
            access_key_id: required_env("R2_ACCESS_KEY_ID")?,
            secret_access_key: required_env("R2_SECRET_ACCESS_KEY")?,
            bucket_name: required_env("R2_BUCKET_NAME")?,
            region: std::env::var("R2_REGION").unwrap_or_else(|_| "auto".to_string()),
            public_base_url,
        })
    }
}

/// Public URL of `key` under `base`; each key segment is percent-encoded.
pub fn public_url(base: &Url, key: &str) -> String {
    let encoded: Vec<String> = key.split('/').map(|s| urlencoding::encode(s).into_owned()).collect();
    format!("{}/{}", base.as_str().trim_end_matches('/'), encoded.join("/"))
}

/// Cloudflare R2 storage client.
#[derive(Clone)]
pub struct R2Client {
    client: Client,
    bucket: String,
    public_base_url: Url,
}

impl R2Client {
    /// Create a new R2 client from configuration.
    pub async fn new(config: R2Config) -> StorageResult<Self> {
        let credentials = Credentials::new(&config.access_key_id, &config.secret_access_key, None, None, "r2");

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        info!(bucket = %config.bucket_name, "R2 client configured");

        Ok(Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket_name,
            public_base_url: config.public_base_url,
        })
    }

    /// Create from environment variables.
    pub async fn from_env() -> StorageResult<Self> {
        Self::new(R2Config::from_env()?).await
    }

    pub fn public_url(&self, key: &str) -> String {
        public_url(&self.public_base_url, key)
    }

    /// Upload bytes to R2 under `key`.
    pub async fn upload_bytes(&self, data: Vec<u8>, key: &str, content_type: &str) -> StorageResult<StoredObject> {
        validate_key(key)?;
        if data.is_empty() {
            return Err(StorageError::EmptyPayload(key.to_string()));
        }
        let size = data.len();
        debug!("Uploading {} bytes to {}", size, key);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(format!("{}: {}", key, e)))?;

        info!(key = %key, bytes = size, "Uploaded object");
        Ok(StoredObject {
            key: key.to_string(),
            url: self.public_url(key),
        })
    }

    /// Delete an object.
    pub async fn delete_object(&self, key: &str) -> StorageResult<()> {
        debug!("Deleting {}", key);

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::delete_failed(format!("{}: {}", key, e)))?;

        Ok(())
    }

    /// Check if an object exists.
    pub async fn exists(&self, key: &str) -> StorageResult<bool> {
        match self.client.head_object().bucket(&self.bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let message = e.to_string();
                if message.contains("NotFound") || message.contains("NoSuchKey") {
                    Ok(false)
                } else {
                    Err(StorageError::AwsSdk(message))
                }
            }
        }
    }

    /// Check connectivity to R2 by performing a head bucket operation.
    pub async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StorageError::AwsSdk(format!("R2 connectivity check failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl MediaStore for R2Client {
    async fn upload_video(&self, payload: UploadPayload, category: Category) -> StorageResult<StoredObject> {
        let key = video_key(category, &payload.file_name);
        self.upload_bytes(payload.bytes, &key, &payload.content_type).await
    }

    async fn upload_thumbnail(&self, payload: UploadPayload, category: Category) -> StorageResult<StoredObject> {
        let key = thumbnail_key(category);
        self.upload_bytes(payload.bytes, &key, &payload.content_type).await
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        R2Client::delete_object(self, key).await
    }
}
