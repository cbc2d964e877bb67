//! Entity CRUD controller: one instance per entity type.

use crate::access::check_ownership;
use crate::codec::{decode_payload, decode_uploads, encode_items, encode_single, is_empty_value, UploadResult};
use crate::config::ResolvedEntity;
use crate::error::AppError;
use crate::request::{DeleteRequest, ListQuery, RequestContext, UpdateRequest};
use crate::schema::{FieldDefinition, FieldRegistry, UploadKind};
use crate::service::validation::RequestValidator;
use crate::store::{Guard, RecordStore};
use crate::upload::UploadProcessor;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Result of [`EntityController::update`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Whole-record update; true once the store accepted the write.
    Record(bool),
    /// Single-field update. Upload fields yield the thumbnail URL, other fields an empty string.
    Field(String),
}

#[derive(Clone)]
pub struct EntityController {
    entity: Arc<ResolvedEntity>,
    store: Arc<dyn RecordStore>,
    registry: Arc<dyn FieldRegistry>,
    uploads: UploadProcessor,
    base_url: String,
}

impl EntityController {
    pub fn new(
        entity: Arc<ResolvedEntity>,
        store: Arc<dyn RecordStore>,
        registry: Arc<dyn FieldRegistry>,
        uploads: UploadProcessor,
        base_url: impl Into<String>,
    ) -> Self {
        EntityController {
            entity,
            store,
            registry,
            uploads,
            base_url: base_url.into(),
        }
    }

    pub fn entity(&self) -> &ResolvedEntity {
        &self.entity
    }

    /// Records matching `query`, hidden fields removed. No ownership check.
    pub async fn list(&self, query: &ListQuery) -> Result<Vec<Value>, AppError> {
        for (col, _) in &query.filters {
            self.check_queryable(col)?;
        }
        if let Some(order) = &query.order {
            self.check_queryable(&order.column)?;
        }
        let mut rows = self.store.all(&self.entity.table, query).await?;
        for row in &mut rows {
            self.entity.strip_hidden(row);
        }
        Ok(rows)
    }

    pub async fn get(&self, id: &Value) -> Result<Option<Value>, AppError> {
        let mut row = self.store.row(&self.entity.table, id).await?;
        if let Some(r) = row.as_mut() {
            self.entity.strip_hidden(r);
        }
        Ok(row)
    }

    /// Insert a record owned by the caller and return its id.
    pub async fn insert(&self, ctx: &RequestContext, data: Map<String, Value>) -> Result<Value, AppError> {
        let caller = ctx
            .caller
            .ok_or_else(|| AppError::Unauthorized("caller identity required".into()))?;
        let mut data = self.strip_protected(data);
        let fields = self.registry.fields_for(&self.entity.name).await?;
        RequestValidator::validate(&data, &fields)?;
        let stored = self.store_payload_uploads(ctx, &mut data, &fields).await?;
        if let Some(owner) = &self.entity.owner_column {
            data.insert(owner.clone(), Value::Number(caller.into()));
        }

        match self.store.insert(&self.entity.table, &data).await {
            Ok(id) => {
                tracing::info!(entity = %self.entity.name, id = %id, caller, "inserted");
                Ok(id)
            }
            Err(e) => {
                self.discard_uploads(&stored).await;
                Err(e)
            }
        }
    }

    pub async fn update(&self, ctx: &RequestContext, id: &Value, request: UpdateRequest) -> Result<UpdateOutcome, AppError> {
        match request {
            UpdateRequest::SingleField { field, content } => {
                self.update_field(ctx, id, &field, content).await.map(UpdateOutcome::Field)
            }
            UpdateRequest::WholeRecord(data) => self.update_record(ctx, id, data).await.map(UpdateOutcome::Record),
        }
    }

    /// Whole-record delete or single-field reset. True when a row was removed or the field reset.
    pub async fn delete(&self, ctx: &RequestContext, id: &Value, request: DeleteRequest) -> Result<bool, AppError> {
        match request {
            DeleteRequest::SingleField { field } => self.reset_field(ctx, id, &field).await,
            DeleteRequest::WholeRecord => {
                let record = self.fetch_owned(ctx, id).await?;
                let removed = self
                    .store
                    .delete(&self.entity.table, id, &self.owner_guard(&record))
                    .await?;
                if removed == 0 {
                    return Err(self.conflict(id));
                }
                tracing::info!(entity = %self.entity.name, id = %id, "deleted");
                Ok(removed == 1)
            }
        }
    }

    /// Set one field. Uploads are stored and merged into the current value; other fields take
    /// `content` verbatim.
    pub async fn update_field(
        &self,
        ctx: &RequestContext,
        id: &Value,
        field_name: &str,
        content: Value,
    ) -> Result<String, AppError> {
        let record = self.fetch_owned(ctx, id).await?;
        let field = self.resolve_field(field_name).await?;
        if self.entity.is_protected(&field.name) {
            return Err(AppError::Forbidden(format!("field is protected: {}", field.name)));
        }
        RequestValidator::validate_value(&field, &content)?;

        let Some(kind) = field.field_type.upload_kind() else {
            let previous = record.get(&field.name).cloned().unwrap_or(Value::Null);
            self.persist_field(&record, id, &field, content, previous).await?;
            return Ok(String::new());
        };

        let payload = decode_payload(&content)?;
        let content_type = payload.content_type.as_deref().or(ctx.content_type.as_deref());
        let upload = self
            .uploads
            .store(&self.entity.name, &payload.bytes, &field, content_type)
            .await?;

        let result = self.merge_and_persist(&record, id, &field, kind, &upload).await;
        let previous = match result {
            Ok(previous) => previous,
            Err(e) => {
                self.discard_uploads(std::slice::from_ref(&upload)).await;
                return Err(e);
            }
        };

        if kind.replaces_on_upload() {
            for old in &previous {
                if let Err(e) = self
                    .registry
                    .delete_uploaded_file(&field.name, &self.entity.name, id, old)
                    .await
                {
                    tracing::warn!(entity = %self.entity.name, field = %field.name, file = %old.file, error = %e, "could not delete superseded upload");
                }
            }
        }
        Ok(upload.url(&self.base_url, field.thumbnail_variant()))
    }

    /// Clear one field, then delete the files the cleared value referenced. Clearing an empty field
    /// is a no-op. File deletion only happens once the clear has been written.
    pub async fn reset_field(&self, ctx: &RequestContext, id: &Value, field_name: &str) -> Result<bool, AppError> {
        let record = self.fetch_owned(ctx, id).await?;
        let field = self.resolve_field(field_name).await?;
        if self.entity.is_protected(&field.name) {
            return Err(AppError::Forbidden(format!("field is protected: {}", field.name)));
        }
        let current = record.get(&field.name).cloned().unwrap_or(Value::Null);
        if is_empty_value(&current) {
            return Ok(true);
        }
        self.persist_field(&record, id, &field, field.empty_value(), current.clone())
            .await?;
        if field.field_type.is_upload() {
            if let Err(e) = self
                .registry
                .delete_files_for(&field.name, &self.entity.name, &current)
                .await
            {
                tracing::warn!(entity = %self.entity.name, field = %field.name, id = %id, error = %e, "could not delete files of cleared field");
            }
        }
        Ok(true)
    }

    async fn update_record(&self, ctx: &RequestContext, id: &Value, data: Value) -> Result<bool, AppError> {
        let record = self.fetch_owned(ctx, id).await?;
        let Value::Object(data) = data else {
            return Err(AppError::BadRequest("invalid data (object expected)".into()));
        };
        let mut data = self.strip_protected(data);
        let fields = self.registry.fields_for(&self.entity.name).await?;
        RequestValidator::validate_partial(&data, &fields)?;
        let stored = self.store_payload_uploads(ctx, &mut data, &fields).await?;

        let updated = match self
            .store
            .update(&self.entity.table, id, &data, &self.owner_guard(&record))
            .await
        {
            Ok(n) => n,
            Err(e) => {
                self.discard_uploads(&stored).await;
                return Err(e);
            }
        };
        if updated == 0 {
            self.discard_uploads(&stored).await;
            return Err(self.conflict(id));
        }
        tracing::info!(entity = %self.entity.name, id = %id, fields = data.len(), "updated");
        Ok(true)
    }

    /// Merge a stored upload into the field's current value and write it. Returns the uploads the
    /// field held before.
    async fn merge_and_persist(
        &self,
        record: &Value,
        id: &Value,
        field: &FieldDefinition,
        kind: UploadKind,
        upload: &UploadResult,
    ) -> Result<Vec<UploadResult>, AppError> {
        let current = self
            .store
            .one(&self.entity.table, &field.name, id)
            .await?
            .ok_or_else(|| self.conflict(id))?;
        let previous = decode_uploads(&current)?;
        let value = if kind.replaces_on_upload() {
            encode_single(upload)?
        } else {
            encode_items(&kind.merge_upload(previous.clone(), upload.clone()))?
        };
        self.persist_field(record, id, field, value, current).await?;
        Ok(previous)
    }

    /// Write one field, guarded on the record owner and the value the field held when read.
    async fn persist_field(
        &self,
        record: &Value,
        id: &Value,
        field: &FieldDefinition,
        value: Value,
        previous: Value,
    ) -> Result<(), AppError> {
        let mut data = Map::new();
        data.insert(field.name.clone(), value);
        let mut guard = self.owner_guard(record);
        guard.push(Guard::new(field.name.clone(), previous));
        let updated = self
            .store
            .update(&self.entity.table, id, &data, &guard)
            .await
            .map_err(|e| match e {
                AppError::Db(e) => AppError::Internal(e.to_string()),
                other => other,
            })?;
        if updated == 0 {
            return Err(self.conflict(id));
        }
        tracing::info!(entity = %self.entity.name, id = %id, field = %field.name, "field updated");
        Ok(())
    }

    /// Current record, or NotFound; then Forbidden unless the caller owns it.
    async fn fetch_owned(&self, ctx: &RequestContext, id: &Value) -> Result<Value, AppError> {
        let record = self
            .store
            .row(&self.entity.table, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {}", self.entity.name, id)))?;
        if !check_ownership(&record, self.entity.owner_column.as_deref(), ctx.caller) {
            return Err(AppError::Forbidden(format!("{} {}", self.entity.name, id)));
        }
        Ok(record)
    }

    async fn resolve_field(&self, name: &str) -> Result<FieldDefinition, AppError> {
        self.registry
            .field_by_name(name, &self.entity.name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("field: {}", name)))
    }

    /// Replace each non-empty upload value in `data` by the envelope of its stored file.
    async fn store_payload_uploads(
        &self,
        ctx: &RequestContext,
        data: &mut Map<String, Value>,
        fields: &[FieldDefinition],
    ) -> Result<Vec<UploadResult>, AppError> {
        let mut stored = Vec::new();
        for field in fields.iter().filter(|f| f.field_type.is_upload()) {
            let Some(value) = data.get(&field.name) else { continue };
            if is_empty_value(value) {
                continue;
            }
            let upload = match self.store_one(ctx, field, value).await {
                Ok(u) => u,
                Err(e) => {
                    self.discard_uploads(&stored).await;
                    return Err(e);
                }
            };
            let envelope = match encode_single(&upload) {
                Ok(v) => v,
                Err(e) => {
                    stored.push(upload);
                    self.discard_uploads(&stored).await;
                    return Err(e.into());
                }
            };
            data.insert(field.name.clone(), envelope);
            stored.push(upload);
        }
        Ok(stored)
    }

    async fn store_one(&self, ctx: &RequestContext, field: &FieldDefinition, value: &Value) -> Result<UploadResult, AppError> {
        let payload = decode_payload(value)?;
        let content_type = payload.content_type.as_deref().or(ctx.content_type.as_deref());
        self.uploads
            .store(&self.entity.name, &payload.bytes, field, content_type)
            .await
    }

    /// Best-effort removal of files stored for a write that did not happen.
    async fn discard_uploads(&self, uploads: &[UploadResult]) {
        for upload in uploads {
            if let Err(e) = self.uploads.storage().delete(upload).await {
                tracing::warn!(entity = %self.entity.name, file = %upload.file, error = %e, "could not discard orphaned upload");
            }
        }
    }

    fn strip_protected(&self, mut data: Map<String, Value>) -> Map<String, Value> {
        data.retain(|k, _| !self.entity.is_protected(k));
        data
    }

    /// Guard pinning the owner read from `record`.
    fn owner_guard(&self, record: &Value) -> Vec<Guard> {
        self.entity
            .owner_column
            .iter()
            .map(|col| Guard::new(col.clone(), record.get(col).cloned().unwrap_or(Value::Null)))
            .collect()
    }

    fn check_queryable(&self, column: &str) -> Result<(), AppError> {
        if self.entity.table.column(column).is_none() || self.entity.hidden_fields.contains(column) {
            return Err(AppError::BadRequest(format!("unknown column: {}", column)));
        }
        Ok(())
    }

    fn conflict(&self, id: &Value) -> AppError {
        AppError::Conflict(format!("{} {} changed concurrently", self.entity.name, id))
    }
}
