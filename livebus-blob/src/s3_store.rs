use std::env;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::debug;

use crate::{ObjectHandle, ObjectStore, StoreError, StoreResult};

/// Connection settings for an S3-compatible bucket.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub endpoint_url: String,
    pub bucket: String,
    /// Base for retrieval urls. Defaults to `{endpoint_url}/{bucket}`.
    pub public_base_url: Option<String>,
}

impl S3Config {
    /// Read `S3_REGION`, `S3_ACCESS_KEY_ID`, `S3_SECRET_ACCESS_KEY`,
    /// `S3_ENDPOINT_URL`, `S3_BUCKET` and the optional `S3_PUBLIC_BASE_URL`.
    pub fn from_env() -> StoreResult<Self> {
        fn get_env(key: &str) -> StoreResult<String> {
            env::var(key).map_err(|_| StoreError::backend(format!("{} environment variable required", key)))
        }

        Ok(Self {
            region: get_env("S3_REGION")?,
            access_key_id: get_env("S3_ACCESS_KEY_ID")?,
            secret_access_key: get_env("S3_SECRET_ACCESS_KEY")?,
            endpoint_url: get_env("S3_ENDPOINT_URL")?,
            bucket: get_env("S3_BUCKET")?,
            public_base_url: env::var("S3_PUBLIC_BASE_URL").ok().filter(|v| !v.trim().is_empty()),
        })
    }

    pub fn public_base_url(&self) -> String {
        match &self.public_base_url {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("{}/{}", self.endpoint_url.trim_end_matches('/'), self.bucket),
        }
    }
}

/// Object store backed by any S3-compatible service (AWS, MinIO, RustFS...).
#[derive(Clone)]
pub struct S3CompatibleStore {
    client: Client,
    bucket: String,
    base_url: String,
}

impl S3CompatibleStore {
    pub async fn new(config: S3Config) -> Self {
        let base_url = config.public_base_url();
        let bucket = config.bucket.clone();
        let client = Self::create_client(config).await;
        Self {
            client,
            bucket,
            base_url,
        }
    }

    pub async fn from_env() -> StoreResult<Self> {
        Ok(Self::new(S3Config::from_env()?).await)
    }

    async fn create_client(config: S3Config) -> Client {
        let credentials = Credentials::new(
            config.access_key_id,
            config.secret_access_key,
            None,
            None,
            "livebus",
        );

        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .endpoint_url(config.endpoint_url)
            .load()
            .await;

        Client::from_conf(
            aws_sdk_s3::config::Builder::from(&aws_config)
                .force_path_style(true)
                .build(),
        )
    }

    fn map_sdk_error<E>(err: SdkError<E, HttpResponse>) -> StoreError
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let timed_out = match &err {
            SdkError::TimeoutError(_) => true,
            SdkError::DispatchFailure(failure) => failure.is_timeout(),
            _ => false,
        };
        if timed_out {
            return StoreError::RetryLimitExceeded(DisplayErrorContext(&err).to_string());
        }

        let message = DisplayErrorContext(&err).to_string();
        match err.raw_response().map(|r| r.status().as_u16()) {
            Some(401) | Some(403) => StoreError::PermissionDenied(message),
            Some(404) => StoreError::NotFound(message),
            _ => StoreError::Backend(message),
        }
    }
}

fn key_from_url<'a>(base_url: &str, url: &'a str) -> Option<&'a str> {
    url.strip_prefix(base_url)?
        .strip_prefix('/')
        .filter(|key| !key.is_empty())
}

#[async_trait]
impl ObjectStore for S3CompatibleStore {
    async fn put(&self, key: &str, content_type: &str, bytes: Bytes) -> StoreResult<ObjectHandle> {
        let size_bytes = bytes.len() as u64;
        let output = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(Self::map_sdk_error)?;

        debug!(%key, size_bytes, "object stored");
        Ok(ObjectHandle {
            key: key.to_string(),
            size_bytes,
            etag: output.e_tag().map(|s| s.to_string()),
        })
    }

    async fn url(&self, handle: &ObjectHandle) -> StoreResult<String> {
        Ok(format!("{}/{}", self.base_url, handle.key))
    }

    async fn delete(&self, url: &str) -> StoreResult<()> {
        let key = key_from_url(&self.base_url, url).ok_or_else(|| StoreError::InvalidUrl(url.to_string()))?;
        self.delete_key(key).await
    }

    async fn delete_object(&self, handle: &ObjectHandle) -> StoreResult<()> {
        self.delete_key(&handle.key).await
    }
}

impl S3CompatibleStore {
    async fn delete_key(&self, key: &str) -> StoreResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(Self::map_sdk_error)?;

        debug!(%key, "object deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> S3Config {
        S3Config {
            region: "us-east-1".into(),
            access_key_id: "key".into(),
            secret_access_key: "secret".into(),
            endpoint_url: "http://localhost:9000/".into(),
            bucket: "livebus".into(),
            public_base_url: None,
        }
    }

    #[test]
    fn base_url_defaults_to_path_style() {
        assert_eq!(config().public_base_url(), "http://localhost:9000/livebus");

        let cdn = S3Config {
            public_base_url: Some("https://img.example.com/".into()),
            ..config()
        };
        assert_eq!(cdn.public_base_url(), "https://img.example.com");
    }

    #[test]
    fn keys_are_recovered_from_urls() {
        let base = "http://localhost:9000/livebus";
        assert_eq!(
            key_from_url(base, "http://localhost:9000/livebus/nightbus_images/1_a.jpg"),
            Some("nightbus_images/1_a.jpg")
        );
        assert_eq!(key_from_url(base, "http://localhost:9000/other/a.jpg"), None);
        assert_eq!(key_from_url(base, "http://localhost:9000/livebus/"), None);
    }
}
