//! Field schema: definitions, types, and the registry seam.

mod field;
mod registry;

pub use field::{FieldDefinition, FieldOptions, FieldType, UploadKind, DEFAULT_THUMBNAIL_VARIANT};
pub use registry::{FieldRegistry, ModelFieldRegistry};
