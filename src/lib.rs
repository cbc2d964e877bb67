//! Resource SDK: configuration-driven entity CRUD with ownership checks and typed upload fields.

pub mod access;
pub mod codec;
pub mod config;
pub mod error;
pub mod extractors;
pub mod identity;
pub mod migration;
pub mod request;
pub mod schema;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod store;
pub mod upload;

pub use codec::UploadResult;
pub use config::{load_from_path, parse_entities, resolve, FullConfig, ResolvedEntity, ResolvedModel};
pub use error::{AppError, ConfigError};
pub use identity::{CallerIdentity, IdentityProvider, MemberId};
pub use migration::apply_migrations;
pub use request::{DeleteRequest, ListQuery, OrderBy, RequestContext, UpdateRequest};
pub use schema::{FieldDefinition, FieldRegistry, FieldType, ModelFieldRegistry};
pub use service::{EntityController, UpdateOutcome};
pub use settings::Settings;
pub use state::AppState;
pub use store::{Guard, InMemoryRecordStore, PgRecordStore, RecordStore};
pub use upload::{FileStorage, FileStorageError, LocalFileStorage, S3FileStorage, UploadProcessor};

/// Install a `tracing` subscriber filtered by `RUST_LOG`, falling back to `default_filter`.
/// Does nothing if a subscriber is already set.
pub fn init_tracing(default_filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .try_init();
}
