//! Apply the entity model to the database: CREATE SCHEMA, CREATE TABLE, owner index.
//! Idempotent (IF NOT EXISTS throughout); existing tables are never altered.

use crate::config::{PkType, ResolvedEntity, ResolvedModel};
use crate::error::AppError;
use sqlx::PgPool;

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn pk_column_type(pk: PkType) -> &'static str {
    match pk {
        PkType::BigInt => "BIGSERIAL",
        PkType::Int => "SERIAL",
        PkType::Uuid => "UUID DEFAULT gen_random_uuid()",
        PkType::Text => "TEXT",
    }
}

/// DDL statements for one entity, in execution order.
pub fn entity_ddl(entity: &ResolvedEntity) -> Vec<String> {
    let t = &entity.table;
    let full_name = format!("{}.{}", quote(&t.schema_name), quote(&t.table_name));
    let mut col_defs = vec![format!(
        "{} {} PRIMARY KEY",
        quote(&t.primary_key),
        pk_column_type(entity.pk_type)
    )];
    for c in t.columns.iter().filter(|c| c.name != t.primary_key) {
        let typ = c.sql_type.as_deref().unwrap_or("text").to_uppercase();
        col_defs.push(format!("{} {}", quote(&c.name), typ));
    }

    let mut out = vec![
        format!("CREATE SCHEMA IF NOT EXISTS {}", quote(&t.schema_name)),
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
            full_name,
            col_defs.join(",\n  ")
        ),
    ];
    if let Some(owner) = &entity.owner_column {
        out.push(format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
            quote(&format!("{}_{}_idx", t.table_name, owner)),
            full_name,
            quote(owner)
        ));
    }
    out
}

pub async fn apply_migrations(pool: &PgPool, model: &ResolvedModel) -> Result<(), AppError> {
    for entity in &model.entities {
        for sql in entity_ddl(entity) {
            tracing::debug!(entity = %entity.name, sql = %sql, "migration");
            sqlx::query(&sql).execute(pool).await?;
        }
        tracing::info!(entity = %entity.name, table = %entity.table.table_name, "table ready");
    }
    Ok(())
}
