//! Build the resolved model from in-memory config or from an `entities.json` file.

use crate::config::resolved::{ColumnInfo, PkType, ResolvedEntity, ResolvedModel, TableRef};
use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use crate::schema::{FieldDefinition, FieldOptions, FieldType};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

/// Build resolved model from full config. Entities without a schema use `default_schema`.
pub fn resolve(config: &FullConfig, default_schema: &str) -> Result<ResolvedModel, ConfigError> {
    validate(config)?;

    let mut entities = Vec::with_capacity(config.entities.len());
    let mut entity_by_name = HashMap::new();

    for e in &config.entities {
        let pk_type = match e.pk_type {
            PkTypeConfig::BigInt => PkType::BigInt,
            PkTypeConfig::Int => PkType::Int,
            PkTypeConfig::Uuid => PkType::Uuid,
            PkTypeConfig::Text => PkType::Text,
        };

        let fields: Vec<FieldDefinition> = e.fields.iter().map(resolve_field).collect();

        let mut columns = vec![ColumnInfo {
            name: e.primary_key.clone(),
            sql_type: Some(pk_type.sql_type().to_string()),
        }];
        if let Some(owner) = &e.owner_column {
            columns.push(ColumnInfo {
                name: owner.clone(),
                sql_type: Some("bigint".into()),
            });
        }
        columns.extend(fields.iter().map(|f| ColumnInfo {
            name: f.name.clone(),
            sql_type: f.sql_type.clone(),
        }));

        let entity = Arc::new(ResolvedEntity {
            name: e.name.clone(),
            table: TableRef {
                schema_name: e.schema.clone().unwrap_or_else(|| default_schema.to_string()),
                table_name: e.table.clone(),
                primary_key: e.primary_key.clone(),
                columns,
            },
            pk_type,
            owner_column: e.owner_column.clone(),
            fields,
            hidden_fields: e.hidden_fields.iter().cloned().collect::<HashSet<_>>(),
            protected_fields: e.protected_fields.iter().cloned().collect::<HashSet<_>>(),
        });
        entity_by_name.insert(e.name.clone(), entity.clone());
        entities.push(entity);
    }

    Ok(ResolvedModel {
        entities,
        entity_by_name,
    })
}

fn resolve_field(f: &FieldConfig) -> FieldDefinition {
    let field_type = FieldType::from(f.kind);
    let sql_type = if field_type.is_upload() {
        Some("text".to_string())
    } else {
        f.sql_type.clone()
    };
    FieldDefinition {
        name: f.name.clone(),
        field_type,
        required: f.required,
        sql_type,
        options: FieldOptions {
            thumbnail_variant: f.thumbnail.clone(),
        },
    }
}

/// Parse entity configs from a JSON array (`[{"name": ..., "table": ..., "fields": [...]}]`).
pub fn parse_entities(json: &str) -> Result<FullConfig, ConfigError> {
    let entities: Vec<EntityConfig> =
        serde_json::from_str(json).map_err(|e| ConfigError::Load(format!("invalid entities config: {}", e)))?;
    Ok(FullConfig { entities })
}

/// Load entity configs from a file.
pub async fn load_from_path(path: impl AsRef<Path>) -> Result<FullConfig, ConfigError> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    let config = parse_entities(&content)?;
    tracing::info!(path = %path.display(), entities = config.entities.len(), "loaded entity config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GALLERY: &str = r#"[
        {
            "name": "gallery",
            "table": "galleries",
            "hidden_fields": ["secret"],
            "protected_fields": ["member_id"],
            "fields": [
                {"name": "title", "required": true, "sql_type": "text"},
                {"name": "secret"},
                {"name": "cover", "type": "image", "thumbnail": "large"},
                {"name": "photos", "type": "pictures"}
            ]
        }
    ]"#;

    #[test]
    fn resolves_entity_with_defaults() {
        let config = parse_entities(GALLERY).unwrap();
        let model = resolve(&config, "public").unwrap();
        let gallery = model.entity("gallery").unwrap();

        assert_eq!(gallery.table.schema_name, "public");
        assert_eq!(gallery.table.primary_key, "id");
        assert_eq!(gallery.pk_type, PkType::BigInt);
        assert_eq!(gallery.owner_column.as_deref(), Some("member_id"));
        assert!(gallery.hidden_fields.contains("secret"));
        assert!(gallery.is_protected("member_id"));

        let cover = gallery.field("cover").unwrap();
        assert_eq!(cover.field_type, FieldType::Image);
        assert_eq!(cover.thumbnail_variant(), "large");
        assert_eq!(cover.sql_type.as_deref(), Some("text"));
        assert!(gallery.field("title").unwrap().required);

        let names: Vec<&str> = gallery.table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "member_id", "title", "secret", "cover", "photos"]);
    }

    #[test]
    fn null_owner_column_disables_ownership() {
        let json = r#"[{"name": "page", "table": "pages", "owner_column": null, "fields": []}]"#;
        let model = resolve(&parse_entities(json).unwrap(), "public").unwrap();
        assert!(model.entity("page").unwrap().owner_column.is_none());
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(matches!(parse_entities("{"), Err(ConfigError::Load(_))));
    }

    #[tokio::test]
    async fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entities.json");
        tokio::fs::write(&path, GALLERY).await.unwrap();
        let config = load_from_path(&path).await.unwrap();
        assert_eq!(config.entities.len(), 1);
        assert!(load_from_path(dir.path().join("missing.json")).await.is_err());
    }
}
