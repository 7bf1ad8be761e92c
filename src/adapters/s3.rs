use crate::domain::model::{ObjectEntry, Page};
use crate::domain::ports::ObjectStore;
use crate::utils::error::{OpsError, Result};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use chrono::DateTime;

#[derive(Debug, Clone)]
pub struct S3Storage {
    client: S3Client,
    bucket: String,
}

impl S3Storage {
    pub fn new(client: S3Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3Storage {
    async fn list_page(
        &self,
        prefix: Option<&str>,
        token: Option<String>,
    ) -> Result<Page<ObjectEntry, String>> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .set_prefix(prefix.map(str::to_string))
            .set_continuation_token(token)
            .send()
            .await
            .map_err(|e| OpsError::service("s3", "list_objects_v2", e))?;

        let items = output
            .contents()
            .iter()
            .filter_map(|object| {
                Some(ObjectEntry {
                    key: object.key()?.to_string(),
                    size: object.size().unwrap_or(0),
                    last_modified: object
                        .last_modified()
                        .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos())),
                })
            })
            .collect();

        let next = if output.is_truncated().unwrap_or(false) {
            output.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(Page { items, next })
    }

    async fn read_object(&self, key: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| OpsError::service("s3", "get_object", e))?;

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| OpsError::service("s3", "get_object", e))?;

        Ok(data.into_bytes().to_vec())
    }

    async fn write_object(&self, key: &str, data: &[u8]) -> Result<()> {
        tracing::debug!("Uploading {} bytes to s3://{}/{}", data.len(), self.bucket, key);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(|e| OpsError::service("s3", "put_object", e))?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| OpsError::service("s3", "delete_object", e))?;
        Ok(())
    }

    fn location(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }
}
