//! Upload processor: temp file, unique name, hand-off to file storage.

use crate::codec::UploadResult;
use crate::error::AppError;
use crate::schema::FieldDefinition;
use crate::upload::FileStorage;
use std::path::PathBuf;
use std::sync::Arc;

const TEMP_PREFIX: &str = "api";

/// Known upload media types. Anything else gets no extension.
const EXTENSIONS: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/gif", "gif"),
];

pub fn extension_for(content_type: Option<&str>) -> Option<&'static str> {
    let media = content_type?.split(';').next()?.trim().to_ascii_lowercase();
    EXTENSIONS.iter().find(|(ct, _)| *ct == media).map(|(_, ext)| *ext)
}

/// Random file name with an extension derived from the media type.
pub fn unique_file_name(content_type: Option<&str>) -> String {
    let stem = uuid::Uuid::new_v4().simple().to_string();
    match extension_for(content_type) {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem,
    }
}

#[derive(Clone)]
pub struct UploadProcessor {
    storage: Arc<dyn FileStorage>,
    temp_dir: PathBuf,
}

impl UploadProcessor {
    pub fn new(storage: Arc<dyn FileStorage>, temp_dir: PathBuf) -> Self {
        UploadProcessor { storage, temp_dir }
    }

    pub fn storage(&self) -> &Arc<dyn FileStorage> {
        &self.storage
    }

    /// Persist `bytes` for `field` of `entity`. Previously stored files are left alone.
    pub async fn store(
        &self,
        entity: &str,
        bytes: &[u8],
        field: &FieldDefinition,
        content_type: Option<&str>,
    ) -> Result<UploadResult, AppError> {
        let temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&self.temp_dir)
            .map_err(|e| AppError::Internal(format!("temp file: {}", e)))?;
        tokio::fs::write(temp.path(), bytes)
            .await
            .map_err(|e| AppError::Internal(format!("temp file: {}", e)))?;

        let file_name = unique_file_name(content_type);
        tracing::debug!(entity, field = %field.name, file = %file_name, size = bytes.len(), "processing upload");
        let result = self
            .storage
            .process_upload(temp.path(), entity, field, &file_name, content_type)
            .await
            .map_err(|e| AppError::Internal(e.0))?;
        // temp file is removed when `temp` drops
        Ok(result)
    }
}
