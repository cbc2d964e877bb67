//! S3-backed file storage. Same key layout as the local backend, keys optionally prefixed.

use crate::codec::UploadResult;
use crate::schema::FieldDefinition;
use crate::upload::{describe_upload, stored_keys, upload_dir_for, variants_for, FileStorage, FileStorageError};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::path::Path;

#[derive(Clone, Debug)]
pub struct S3FileStorage {
    client: Client,
    bucket: String,
    prefix: String,
}

impl S3FileStorage {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        S3FileStorage {
            client,
            bucket: bucket.into(),
            prefix: String::new(),
        }
    }

    /// Client from the default AWS credential/region chain.
    pub async fn from_env(bucket: impl Into<String>) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&config), bucket)
    }

    /// Key prefix (e.g. "uploads/"). A trailing '/' is added when missing.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        if !prefix.is_empty() && !prefix.ends_with('/') {
            prefix.push('/');
        }
        self.prefix = prefix;
        self
    }

    fn object_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[async_trait]
impl FileStorage for S3FileStorage {
    async fn process_upload(
        &self,
        temp_path: &Path,
        entity: &str,
        field: &FieldDefinition,
        file_name: &str,
        content_type: Option<&str>,
    ) -> Result<UploadResult, FileStorageError> {
        let bytes = tokio::fs::read(temp_path)
            .await
            .map_err(|e| FileStorageError(format!("could not read upload: {}", e)))?;
        let path = upload_dir_for(entity);
        let variants = variants_for(field);
        let result = describe_upload(&path, file_name, &variants, content_type);
        for key in result.variants.values() {
            let object_key = self.object_key(key);
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(&object_key)
                .set_content_type(content_type.map(String::from))
                .body(ByteStream::from(bytes.clone()))
                .send()
                .await
                .map_err(|e| FileStorageError(format!("s3 put {}: {}", object_key, e)))?;
        }
        tracing::info!(entity, field = %field.name, file = file_name, bucket = %self.bucket, "stored upload");
        Ok(result)
    }

    async fn delete(&self, upload: &UploadResult) -> Result<(), FileStorageError> {
        for key in stored_keys(upload) {
            let object_key = self.object_key(&key);
            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(&object_key)
                .send()
                .await
                .map_err(|e| FileStorageError(format!("s3 delete {}: {}", object_key, e)))?;
        }
        Ok(())
    }
}
