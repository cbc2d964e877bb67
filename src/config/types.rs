//! Raw entity config types matching the JSON config files.

use serde::{Deserialize, Serialize};

/// Field kind as written in config. Resolved into [`crate::schema::FieldType`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKindConfig {
    Scalar,
    Image,
    Pictures,
    Storage,
}

impl Default for FieldKindConfig {
    fn default() -> Self {
        FieldKindConfig::Scalar
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: FieldKindConfig,
    #[serde(default)]
    pub required: bool,
    /// PostgreSQL type used for DDL and parameter casts (e.g. "text", "bigint"). Upload fields are always text.
    #[serde(default)]
    pub sql_type: Option<String>,
    /// Thumbnail variant returned in upload URLs. Defaults to "thumbnail".
    #[serde(default)]
    pub thumbnail: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PkTypeConfig {
    BigInt,
    Int,
    Uuid,
    Text,
}

impl Default for PkTypeConfig {
    fn default() -> Self {
        PkTypeConfig::BigInt
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityConfig {
    pub name: String,
    pub table: String,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    #[serde(default)]
    pub pk_type: PkTypeConfig,
    /// Column holding the owner identity. `null` disables ownership (every mutation is forbidden).
    #[serde(default = "default_owner_column")]
    pub owner_column: Option<String>,
    /// Columns never exposed in list/get output.
    #[serde(default)]
    pub hidden_fields: Vec<String>,
    /// Columns silently dropped from insert/update payloads.
    #[serde(default)]
    pub protected_fields: Vec<String>,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

fn default_primary_key() -> String {
    "id".into()
}

fn default_owner_column() -> Option<String> {
    Some("member_id".into())
}

/// All entity configs in one struct for in-memory loading.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FullConfig {
    pub entities: Vec<EntityConfig>,
}
