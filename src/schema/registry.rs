//! Field schema registry: field lookup per entity type and cleanup of stored files.

use crate::codec::{decode_uploads, UploadResult};
use crate::config::ResolvedModel;
use crate::error::AppError;
use crate::schema::FieldDefinition;
use crate::upload::FileStorage;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

#[async_trait]
pub trait FieldRegistry: Send + Sync {
    /// All declared fields of an entity type, in declaration order.
    async fn fields_for(&self, entity: &str) -> Result<Vec<FieldDefinition>, AppError>;

    async fn field_by_name(&self, name: &str, entity: &str) -> Result<Option<FieldDefinition>, AppError>;

    /// Delete every file referenced by a stored upload value.
    async fn delete_files_for(&self, field: &str, entity: &str, stored: &Value) -> Result<(), AppError>;

    /// Delete one previously stored upload of a record's field.
    async fn delete_uploaded_file(
        &self,
        field: &str,
        entity: &str,
        record_id: &Value,
        upload: &UploadResult,
    ) -> Result<(), AppError>;
}

/// Registry answering from the resolved config model; deletes through a [`FileStorage`].
#[derive(Clone)]
pub struct ModelFieldRegistry {
    model: Arc<ResolvedModel>,
    storage: Arc<dyn FileStorage>,
}

impl ModelFieldRegistry {
    pub fn new(model: Arc<ResolvedModel>, storage: Arc<dyn FileStorage>) -> Self {
        ModelFieldRegistry { model, storage }
    }

    fn entity_fields(&self, entity: &str) -> Result<&[FieldDefinition], AppError> {
        self.model
            .entity(entity)
            .map(|e| e.fields.as_slice())
            .ok_or_else(|| AppError::NotFound(format!("entity type: {}", entity)))
    }
}

#[async_trait]
impl FieldRegistry for ModelFieldRegistry {
    async fn fields_for(&self, entity: &str) -> Result<Vec<FieldDefinition>, AppError> {
        Ok(self.entity_fields(entity)?.to_vec())
    }

    async fn field_by_name(&self, name: &str, entity: &str) -> Result<Option<FieldDefinition>, AppError> {
        Ok(self.entity_fields(entity)?.iter().find(|f| f.name == name).cloned())
    }

    async fn delete_files_for(&self, field: &str, entity: &str, stored: &Value) -> Result<(), AppError> {
        for upload in decode_uploads(stored)? {
            self.storage
                .delete(&upload)
                .await
                .map_err(|e| AppError::Internal(e.0))?;
            tracing::info!(entity, field, file = %upload.file, "deleted stored file");
        }
        Ok(())
    }

    async fn delete_uploaded_file(
        &self,
        field: &str,
        entity: &str,
        record_id: &Value,
        upload: &UploadResult,
    ) -> Result<(), AppError> {
        self.storage
            .delete(upload)
            .await
            .map_err(|e| AppError::Internal(e.0))?;
        tracing::info!(entity, field, id = %record_id, file = %upload.file, "deleted superseded file");
        Ok(())
    }
}
