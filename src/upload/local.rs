//! Filesystem-backed file storage under a root directory.

use crate::codec::UploadResult;
use crate::schema::FieldDefinition;
use crate::upload::{describe_upload, stored_keys, upload_dir_for, variants_for, FileStorage, FileStorageError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Writes `<root>/<entity>/<YYYY-MM>/<variant>/<file>`. Renditions are copies of the original;
/// resizing belongs to whatever serves the files.
#[derive(Clone, Debug)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalFileStorage { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, FileStorageError> {
        if key.split('/').any(|seg| seg == "..") || key.starts_with('/') {
            return Err(FileStorageError(format!("invalid storage key: {}", key)));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn process_upload(
        &self,
        temp_path: &Path,
        entity: &str,
        field: &FieldDefinition,
        file_name: &str,
        content_type: Option<&str>,
    ) -> Result<UploadResult, FileStorageError> {
        let path = upload_dir_for(entity);
        let variants = variants_for(field);
        let result = describe_upload(&path, file_name, &variants, content_type);
        for key in result.variants.values() {
            let target = self.resolve(key)?;
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| FileStorageError(format!("could not create {}: {}", parent.display(), e)))?;
            }
            tokio::fs::copy(temp_path, &target)
                .await
                .map_err(|e| FileStorageError(format!("could not write {}: {}", target.display(), e)))?;
        }
        tracing::info!(entity, field = %field.name, file = file_name, "stored upload");
        Ok(result)
    }

    async fn delete(&self, upload: &UploadResult) -> Result<(), FileStorageError> {
        for key in stored_keys(upload) {
            let target = self.resolve(&key)?;
            match tokio::fs::remove_file(&target).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(FileStorageError(format!("could not remove {}: {}", target.display(), e)));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;

    #[tokio::test]
    async fn stores_and_deletes_variants() {
        let root = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(root.path());
        let temp = tempfile::NamedTempFile::new().unwrap();
        tokio::fs::write(temp.path(), b"jpeg bytes").await.unwrap();

        let field = FieldDefinition::upload("cover", FieldType::Image);
        let result = storage
            .process_upload(temp.path(), "gallery", &field, "abc.jpg", Some("image/jpeg"))
            .await
            .unwrap();

        assert!(result.path.starts_with("gallery/"));
        assert_eq!(result.file, "abc.jpg");
        for key in result.variants.values() {
            let bytes = tokio::fs::read(root.path().join(key)).await.unwrap();
            assert_eq!(bytes, b"jpeg bytes");
        }

        storage.delete(&result).await.unwrap();
        for key in result.variants.values() {
            assert!(!root.path().join(key).exists());
        }
        // second delete is a no-op
        storage.delete(&result).await.unwrap();
    }

    #[tokio::test]
    async fn rejects_keys_escaping_root() {
        let root = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(root.path());
        let upload = UploadResult::new("../", "passwd");
        assert!(storage.delete(&upload).await.is_err());
    }
}
