//! Config validation: identifiers, duplicates, and hidden/protected references.

use crate::config::FullConfig;
use crate::error::ConfigError;
use regex::Regex;
use std::collections::HashSet;

const IDENTIFIER_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]{0,62}$";
const SQL_TYPE_PATTERN: &str = r"^[A-Za-z][A-Za-z0-9_ ]*(\(\d+(,\s*\d+)?\))?(\[\])?$";

/// Identifiers end up quoted in SQL; still only plain names are accepted.
pub fn check_identifier(s: &str) -> Result<(), ConfigError> {
    let re = Regex::new(IDENTIFIER_PATTERN).map_err(|e| ConfigError::Load(e.to_string()))?;
    if re.is_match(s) {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentifier(s.to_string()))
    }
}

/// Column types are spliced into casts and DDL, so only plain type names pass.
pub fn check_sql_type(s: &str) -> Result<(), ConfigError> {
    let re = Regex::new(SQL_TYPE_PATTERN).map_err(|e| ConfigError::Load(e.to_string()))?;
    if re.is_match(s.trim()) {
        Ok(())
    } else {
        Err(ConfigError::Load(format!("invalid sql_type: {}", s)))
    }
}

pub fn validate(config: &FullConfig) -> Result<(), ConfigError> {
    let mut names = HashSet::new();
    for e in &config.entities {
        if !names.insert(e.name.as_str()) {
            return Err(ConfigError::DuplicateEntity(e.name.clone()));
        }
        check_identifier(&e.table)?;
        check_identifier(&e.primary_key)?;
        if let Some(schema) = &e.schema {
            check_identifier(schema)?;
        }
        if let Some(owner) = &e.owner_column {
            check_identifier(owner)?;
        }

        let mut columns: HashSet<&str> = HashSet::new();
        columns.insert(e.primary_key.as_str());
        if let Some(owner) = &e.owner_column {
            columns.insert(owner.as_str());
        }
        for f in &e.fields {
            check_identifier(&f.name)?;
            if f.name == e.primary_key || !columns.insert(f.name.as_str()) {
                return Err(ConfigError::DuplicateField {
                    entity: e.name.clone(),
                    field: f.name.clone(),
                });
            }
            if let Some(t) = &f.sql_type {
                check_sql_type(t)?;
            }
            if let Some(variant) = &f.thumbnail {
                check_identifier(variant)?;
            }
        }

        for (list, cols) in [("hidden_fields", &e.hidden_fields), ("protected_fields", &e.protected_fields)] {
            for c in cols {
                if !columns.contains(c.as_str()) {
                    return Err(ConfigError::UnknownColumn {
                        entity: e.name.clone(),
                        list,
                        column: c.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EntityConfig, FieldConfig, FieldKindConfig, PkTypeConfig};

    fn entity(name: &str) -> EntityConfig {
        EntityConfig {
            name: name.into(),
            table: format!("{}s", name),
            schema: None,
            primary_key: "id".into(),
            pk_type: PkTypeConfig::BigInt,
            owner_column: Some("member_id".into()),
            hidden_fields: vec![],
            protected_fields: vec![],
            fields: vec![FieldConfig {
                name: "title".into(),
                kind: FieldKindConfig::Scalar,
                required: false,
                sql_type: None,
                thumbnail: None,
            }],
        }
    }

    #[test]
    fn accepts_owner_column_in_protected_fields() {
        let mut e = entity("listing");
        e.protected_fields = vec!["member_id".into()];
        assert!(validate(&FullConfig { entities: vec![e] }).is_ok());
    }

    #[test]
    fn rejects_duplicate_entities() {
        let cfg = FullConfig {
            entities: vec![entity("listing"), entity("listing")],
        };
        assert!(matches!(validate(&cfg), Err(ConfigError::DuplicateEntity(_))));
    }

    #[test]
    fn rejects_hidden_field_not_in_columns() {
        let mut e = entity("listing");
        e.hidden_fields = vec!["password".into()];
        assert!(matches!(
            validate(&FullConfig { entities: vec![e] }),
            Err(ConfigError::UnknownColumn { list: "hidden_fields", .. })
        ));
    }

    #[test]
    fn rejects_quoted_identifiers() {
        let mut e = entity("listing");
        e.table = "listings\"; drop".into();
        assert!(matches!(
            validate(&FullConfig { entities: vec![e] }),
            Err(ConfigError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn rejects_field_shadowing_primary_key() {
        let mut e = entity("listing");
        e.fields[0].name = "id".into();
        assert!(matches!(
            validate(&FullConfig { entities: vec![e] }),
            Err(ConfigError::DuplicateField { .. })
        ));
    }

    #[test]
    fn sql_types_must_be_plain() {
        for ok in ["text", "bigint", "varchar(200)", "numeric(10, 2)", "timestamp with time zone", "text[]"] {
            assert!(check_sql_type(ok).is_ok(), "{}", ok);
        }
        for bad in ["text; drop table x", "int)--", "(text)"] {
            assert!(check_sql_type(bad).is_err(), "{}", bad);
        }
    }
}
