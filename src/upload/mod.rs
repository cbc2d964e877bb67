//! Upload handling: the file storage seam and its backends.

mod local;
mod processor;
mod s3;

pub use local::LocalFileStorage;
pub use processor::{extension_for, unique_file_name, UploadProcessor};
pub use s3::S3FileStorage;

use crate::codec::UploadResult;
use crate::schema::FieldDefinition;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Failure reported by a file storage backend. The message reaches the caller as an internal error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct FileStorageError(pub String);

/// Variant that always holds the unmodified upload.
pub const ORIGINAL_VARIANT: &str = "original";

/// Physical file storage: persists uploaded files and their renditions.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Persist the file at `temp_path` under `file_name` and describe where it went.
    async fn process_upload(
        &self,
        temp_path: &Path,
        entity: &str,
        field: &FieldDefinition,
        file_name: &str,
        content_type: Option<&str>,
    ) -> Result<UploadResult, FileStorageError>;

    /// Remove every stored rendition of `upload`. Missing files are not an error.
    async fn delete(&self, upload: &UploadResult) -> Result<(), FileStorageError>;
}

/// `{entity}/{YYYY-MM}/` directory for new uploads.
pub(crate) fn upload_dir_for(entity: &str) -> String {
    format!("{}/{}/", entity, chrono::Utc::now().format("%Y-%m"))
}

/// Variants written for a field: the original plus its thumbnail variant.
pub(crate) fn variants_for(field: &FieldDefinition) -> Vec<&str> {
    let mut out = vec![ORIGINAL_VARIANT];
    let thumb = field.thumbnail_variant();
    if thumb != ORIGINAL_VARIANT {
        out.push(thumb);
    }
    out
}

/// Storage keys of all renditions; falls back to `{path}{file}` when no variants were recorded.
pub(crate) fn stored_keys(upload: &UploadResult) -> Vec<String> {
    if upload.variants.is_empty() {
        vec![format!("{}{}", upload.path, upload.file)]
    } else {
        upload.variants.values().cloned().collect()
    }
}

/// Build the result for `file_name` stored under `path` with the given variants.
pub(crate) fn describe_upload(path: &str, file_name: &str, variants: &[&str], content_type: Option<&str>) -> UploadResult {
    let mut result = UploadResult::new(path, file_name);
    for v in variants {
        result
            .variants
            .insert((*v).to_string(), format!("{}{}/{}", path, v, file_name));
    }
    result.content_type = content_type.map(String::from);
    result
}
