//! Resolved entity model: config validated and flattened for runtime use.

use crate::error::AppError;
use crate::schema::FieldDefinition;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Primary key type for parsing path ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PkType {
    Uuid,
    BigInt,
    Int,
    Text,
}

impl PkType {
    pub fn sql_type(self) -> &'static str {
        match self {
            PkType::Uuid => "uuid",
            PkType::BigInt => "bigint",
            PkType::Int => "integer",
            PkType::Text => "text",
        }
    }

    /// Parse a path id into the JSON value bound to queries.
    pub fn parse_id(self, id_str: &str) -> Result<Value, AppError> {
        Ok(match self {
            PkType::Uuid => {
                let u = uuid::Uuid::parse_str(id_str).map_err(|_| AppError::BadRequest("invalid uuid".into()))?;
                Value::String(u.to_string())
            }
            PkType::BigInt | PkType::Int => {
                let n: i64 = id_str.parse().map_err(|_| AppError::BadRequest("invalid id".into()))?;
                Value::Number(n.into())
            }
            PkType::Text => Value::String(id_str.to_string()),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    /// PostgreSQL type name for SQL casts when binding values.
    pub sql_type: Option<String>,
}

/// Physical table addressed by the storage engine.
#[derive(Clone, Debug)]
pub struct TableRef {
    pub schema_name: String,
    pub table_name: String,
    pub primary_key: String,
    pub columns: Vec<ColumnInfo>,
}

impl TableRef {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedEntity {
    pub name: String,
    pub table: TableRef,
    pub pk_type: PkType,
    pub owner_column: Option<String>,
    /// Declared fields in config order.
    pub fields: Vec<FieldDefinition>,
    /// Stripped from every list/get result.
    pub hidden_fields: HashSet<String>,
    /// Dropped from insert/update payloads; reset is forbidden.
    pub protected_fields: HashSet<String>,
}

impl ResolvedEntity {
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_protected(&self, name: &str) -> bool {
        self.protected_fields.contains(name)
    }

    /// Remove hidden fields from one record (no-op for non-objects).
    pub fn strip_hidden(&self, record: &mut Value) {
        if let Value::Object(map) = record {
            for name in &self.hidden_fields {
                map.remove(name);
            }
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedModel {
    pub entities: Vec<Arc<ResolvedEntity>>,
    pub entity_by_name: HashMap<String, Arc<ResolvedEntity>>,
}

impl ResolvedModel {
    pub fn entity(&self, name: &str) -> Option<&Arc<ResolvedEntity>> {
        self.entity_by_name.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_id_by_pk_type() {
        assert_eq!(PkType::BigInt.parse_id("42").unwrap(), json!(42));
        assert_eq!(PkType::Text.parse_id("abc").unwrap(), json!("abc"));
        assert!(matches!(PkType::Int.parse_id("x"), Err(AppError::BadRequest(_))));
        assert!(matches!(PkType::Uuid.parse_id("nope"), Err(AppError::BadRequest(_))));
        let u = uuid::Uuid::new_v4();
        assert_eq!(PkType::Uuid.parse_id(&u.to_string()).unwrap(), json!(u.to_string()));
    }
}
