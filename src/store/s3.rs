use aws_config::BehaviorVersion;
use aws_sdk_s3::primitives::ByteStream;
use tracing::debug;

use super::BlobStore;

pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to get object {key}: {message}")]
    Get { key: String, message: String },
    #[error("Failed to read object body {key}: {message}")]
    Body { key: String, message: String },
    #[error("Failed to put object {key}: {message}")]
    Put { key: String, message: String },
}

pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl S3Store {
    /// Without credentials the default provider chain (env, profile, IMDS)
    /// is used. `endpoint` points the client at an S3-compatible service.
    pub async fn new(
        bucket: impl Into<String>,
        region: Option<String>,
        endpoint: Option<String>,
        credentials: Option<Credentials>,
    ) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        if let Some(endpoint) = endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        if let Some(credentials) = credentials {
            loader = loader.credentials_provider(aws_sdk_s3::config::Credentials::new(
                credentials.access_key_id,
                credentials.secret_access_key,
                None,
                None,
                "catalog-review",
            ));
        }
        let config = loader.load().await;
        Self {
            client: aws_sdk_s3::Client::new(&config),
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

impl BlobStore for S3Store {
    type Error = Error;

    async fn get(&self, blob: &str) -> Result<Option<bytes::Bytes>, Self::Error> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(blob)
            .send()
            .await
        {
            Ok(output) => output,
            Err(error)
                if error
                    .as_service_error()
                    .is_some_and(|error| error.is_no_such_key()) =>
            {
                debug!(bucket = %self.bucket, key = blob, "no such key");
                return Ok(None);
            }
            Err(error) => {
                return Err(Error::Get {
                    key: blob.to_owned(),
                    message: error.to_string(),
                });
            }
        };
        let body = output
            .body
            .collect()
            .await
            .map_err(|error| Error::Body {
                key: blob.to_owned(),
                message: error.to_string(),
            })?
            .into_bytes();
        Ok(Some(body))
    }

    async fn put(&self, blob: &str, body: bytes::Bytes) -> Result<(), Self::Error> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(blob)
            .content_type("text/csv")
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|error| Error::Put {
                key: blob.to_owned(),
                message: error.to_string(),
            })?;
        Ok(())
    }
}
