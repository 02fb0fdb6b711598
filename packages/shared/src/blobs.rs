use async_trait::async_trait;
use aws_sdk_s3::Client;

#[cfg(test)]
use mockall::automock;

#[derive(Debug)]
pub enum BlobError {
    Storage(String),
}

impl std::fmt::Display for BlobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlobError::Storage(msg) => write!(f, "Blob storage error: {}", msg),
        }
    }
}

impl std::error::Error for BlobError {}

pub fn profile_image_path(user_id: &str) -> String {
    format!("profile-images/{}", user_id)
}

#[async_trait]
#[cfg_attr(test, automock)]
pub trait BlobStore: Send + Sync {
    /// Deleting a path that does not exist is a successful no-op.
    async fn delete(&self, path: &str) -> Result<(), BlobError>;
}

pub struct S3BlobStore {
    pub client: Client,
    pub bucket: String,
}

impl S3BlobStore {
    pub fn new(client: Client) -> Self {
        let bucket =
            std::env::var("MEDIA_BUCKET").expect("MEDIA_BUCKET environment variable must be set");
        Self { client, bucket }
    }

    pub fn with_bucket(client: Client, bucket: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn delete(&self, path: &str) -> Result<(), BlobError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| BlobError::Storage(e.to_string()))?;
        Ok(())
    }
}
