//! Shared application state: one model, store and file storage for every entity controller.

use crate::config::{resolve, FullConfig, ResolvedModel};
use crate::error::{AppError, ConfigError};
use crate::schema::{FieldRegistry, ModelFieldRegistry};
use crate::service::EntityController;
use crate::settings::Settings;
use crate::store::{PgRecordStore, RecordStore};
use crate::upload::{FileStorage, LocalFileStorage, S3FileStorage, UploadProcessor};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub model: Arc<ResolvedModel>,
    pub store: Arc<dyn RecordStore>,
    pub registry: Arc<dyn FieldRegistry>,
    pub uploads: UploadProcessor,
    /// Public base URL, ends with '/'.
    pub base_url: String,
}

impl AppState {
    /// Wire a model to a store and file storage. Field lookups answer from the model.
    pub fn new(
        model: Arc<ResolvedModel>,
        store: Arc<dyn RecordStore>,
        storage: Arc<dyn FileStorage>,
        settings: &Settings,
    ) -> Self {
        let registry = Arc::new(ModelFieldRegistry::new(model.clone(), storage.clone()));
        AppState {
            model,
            store,
            registry,
            uploads: UploadProcessor::new(storage, settings.temp_dir()),
            base_url: settings.base_url.clone(),
        }
    }

    /// Resolve `config`, connect to `DATABASE_URL` and pick S3 or local file storage.
    pub async fn connect(settings: &Settings, config: &FullConfig) -> Result<Self, AppError> {
        let model = resolve(config, &settings.default_schema)?;
        let database_url = settings
            .database_url
            .as_deref()
            .ok_or_else(|| ConfigError::Settings("DATABASE_URL is required".into()))?;
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        let storage: Arc<dyn FileStorage> = match &settings.s3_bucket {
            Some(bucket) => {
                tracing::info!(bucket = %bucket, "using s3 file storage");
                Arc::new(S3FileStorage::from_env(bucket.clone()).await)
            }
            None => {
                tracing::info!(dir = %settings.upload_dir.display(), "using local file storage");
                Arc::new(LocalFileStorage::new(settings.upload_dir.clone()))
            }
        };
        Ok(Self::new(Arc::new(model), Arc::new(PgRecordStore::new(pool)), storage, settings))
    }

    /// Controller bound to one entity type.
    pub fn controller(&self, entity: &str) -> Result<EntityController, AppError> {
        let resolved = self
            .model
            .entity(entity)
            .ok_or_else(|| AppError::NotFound(format!("entity type: {}", entity)))?;
        Ok(EntityController::new(
            resolved.clone(),
            self.store.clone(),
            self.registry.clone(),
            self.uploads.clone(),
            self.base_url.clone(),
        ))
    }
}
