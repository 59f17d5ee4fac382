use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use bytes::Bytes;

use crate::error::Error;

use super::Storage;

/// Configuration for an S3-compatible bucket (AWS S3 itself, or any
/// compatible provider reached through a custom endpoint).
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub path_prefix: Option<String>,
}

impl S3Config {
    /// Reads configuration the way the rest of this codebase does: an
    /// optional `.env` file via `dotenvy`, then plain environment
    /// variables.
    pub fn from_env() -> Result<Self, Error> {
        dotenvy::dotenv().ok();

        let bucket = std::env::var("STORAGE_BUCKET_NAME")
            .map_err(|_| Error::Config("STORAGE_BUCKET_NAME is not set".to_string()))?;

        Ok(S3Config {
            bucket,
            region: std::env::var("STORAGE_REGION").ok(),
            endpoint_url: std::env::var("STORAGE_ENDPOINT_URL").ok(),
            path_prefix: std::env::var("STORAGE_PATH_PREFIX").ok(),
        })
    }
}

pub struct S3Storage {
    client: aws_sdk_s3::Client,
    config: S3Config,
}

impl S3Storage {
    pub async fn new(config: S3Config) -> Self {
        let client = build_client(&config).await;
        S3Storage { client, config }
    }

    fn key(&self, name: &str) -> String {
        match &self.config.path_prefix {
            Some(prefix) => format!("{prefix}/{name}"),
            None => name.to_string(),
        }
    }

    async fn put(&self, name: &str, bytes: Bytes, content_type: &str) -> Result<(), Error> {
        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(self.key(name))
            .body(bytes.into())
            .content_type(content_type)
            .send()
            .await
            .map_err(aws_sdk_s3::Error::from)?;
        Ok(())
    }
}

async fn build_client(config: &S3Config) -> aws_sdk_s3::Client {
    let region_provider = RegionProviderChain::first_try(config.region.clone().map(Region::new))
        .or_default_provider()
        .or_else(Region::new("us-east-1"));

    let mut loader = aws_config::from_env()
        .region(region_provider)
        .behavior_version(aws_config::BehaviorVersion::latest());

    if let (Ok(access_key), Ok(secret_key)) = (
        std::env::var("AWS_ACCESS_KEY_ID"),
        std::env::var("AWS_SECRET_ACCESS_KEY"),
    ) {
        loader = loader.credentials_provider(Credentials::new(
            access_key,
            secret_key,
            None,
            None,
            "hls-sink",
        ));
    }

    if let Some(endpoint) = &config.endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }

    let shared_config = loader.load().await;
    aws_sdk_s3::Client::new(&shared_config)
}

fn content_type_for(name: &str) -> &'static str {
    if name.ends_with(".m3u8") {
        "application/vnd.apple.mpegurl"
    } else {
        "application/octet-stream"
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn store_init(&self, name: &str, bytes: Bytes) -> Result<(), Error> {
        self.put(name, bytes, content_type_for(name)).await
    }

    async fn store_segment(&self, name: &str, bytes: Bytes) -> Result<(), Error> {
        self.put(name, bytes, content_type_for(name)).await
    }

    async fn store_manifests(&self, manifests: &[(String, String)]) -> Result<(), Error> {
        for (name, text) in manifests {
            self.put(name, Bytes::from(text.clone()), "application/vnd.apple.mpegurl")
                .await?;
        }
        Ok(())
    }

    async fn remove_segments(&self, names: &[String]) -> Result<(), Error> {
        for name in names {
            self.client
                .delete_object()
                .bucket(&self.config.bucket)
                .key(self.key(name))
                .send()
                .await
                .map_err(aws_sdk_s3::Error::from)?;
        }
        Ok(())
    }
}
