//! Entity configuration: raw serde types, validation, and the resolved runtime model.

mod loader;
mod resolved;
mod types;
mod validator;

pub use loader::{load_from_path, parse_entities, resolve};
pub use resolved::{ColumnInfo, PkType, ResolvedEntity, ResolvedModel, TableRef};
pub use types::{EntityConfig, FieldConfig, FieldKindConfig, FullConfig, PkTypeConfig};
pub use validator::{check_identifier, check_sql_type, validate};
