//! PostgreSQL record store on a sqlx pool.

use super::{Guard, RecordStore};
use crate::config::TableRef;
use crate::error::AppError;
use crate::request::ListQuery;
use crate::sql::{self, PgBindValue, QueryBuf};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{Arguments, PgPool, Row};

#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        PgRecordStore { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn arguments(q: &QueryBuf) -> Result<PgArguments, AppError> {
    let mut args = PgArguments::default();
    for p in &q.params {
        args.add(PgBindValue::from_json(p))
            .map_err(|e| AppError::Internal(format!("bind: {}", e)))?;
    }
    Ok(args)
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn all(&self, table: &TableRef, query: &ListQuery) -> Result<Vec<Value>, AppError> {
        let q = sql::select_list(table, query);
        tracing::debug!(sql = %q.sql, "list");
        let rows = sqlx::query_with(&q.sql, arguments(&q)?)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_json).collect()
    }

    async fn row(&self, table: &TableRef, id: &Value) -> Result<Option<Value>, AppError> {
        let q = sql::select_by_id(table, id);
        tracing::debug!(sql = %q.sql, "row");
        let row = sqlx::query_with(&q.sql, arguments(&q)?)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_json).transpose()
    }

    async fn one(&self, table: &TableRef, column: &str, id: &Value) -> Result<Option<Value>, AppError> {
        let q = sql::select_column_by_id(table, column, id);
        tracing::debug!(sql = %q.sql, "one");
        let row = sqlx::query_with(&q.sql, arguments(&q)?)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| cell_to_value(&r, column)).transpose()
    }

    async fn insert(&self, table: &TableRef, data: &Map<String, Value>) -> Result<Value, AppError> {
        let q = sql::insert(table, data);
        tracing::debug!(sql = %q.sql, "insert");
        let row = sqlx::query_with(&q.sql, arguments(&q)?)
            .fetch_one(&self.pool)
            .await?;
        cell_to_value(&row, &table.primary_key)
    }

    async fn update(
        &self,
        table: &TableRef,
        id: &Value,
        data: &Map<String, Value>,
        guard: &[Guard],
    ) -> Result<u64, AppError> {
        let q = sql::update(table, id, data, guard);
        tracing::debug!(sql = %q.sql, "update");
        if q.sql.starts_with("SELECT") {
            let count: i64 = sqlx::query_with(&q.sql, arguments(&q)?)
                .fetch_one(&self.pool)
                .await?
                .try_get(0)?;
            return Ok(count.max(0) as u64);
        }
        let res = sqlx::query_with(&q.sql, arguments(&q)?)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }

    async fn delete(&self, table: &TableRef, id: &Value, guard: &[Guard]) -> Result<u64, AppError> {
        let q = sql::delete(table, id, guard);
        tracing::debug!(sql = %q.sql, "delete");
        let res = sqlx::query_with(&q.sql, arguments(&q)?)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }
}

fn row_to_json(row: &PgRow) -> Result<Value, AppError> {
    use sqlx::Column;
    let mut map = Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name)?);
    }
    Ok(Value::Object(map))
}

/// Decode one cell by trying the column types the engine produces, most specific first.
/// SQL NULL is `Value::Null`; a non-null cell no decoder accepts is an error, never a silent NULL.
fn cell_to_value(row: &PgRow, name: &str) -> Result<Value, AppError> {
    use sqlx::ValueRef;
    if row.try_get_raw(name)?.is_null() {
        return Ok(Value::Null);
    }
    if let Ok(n) = row.try_get::<i16, _>(name) {
        return Ok(Value::Number(n.into()));
    }
    if let Ok(n) = row.try_get::<i32, _>(name) {
        return Ok(Value::Number(n.into()));
    }
    if let Ok(n) = row.try_get::<i64, _>(name) {
        return Ok(Value::Number(n.into()));
    }
    // NaN and infinities have no JSON form
    if let Ok(n) = row.try_get::<f32, _>(name) {
        return Ok(serde_json::Number::from_f64(n as f64).map_or(Value::Null, Value::Number));
    }
    if let Ok(n) = row.try_get::<f64, _>(name) {
        return Ok(serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number));
    }
    if let Ok(b) = row.try_get::<bool, _>(name) {
        return Ok(Value::Bool(b));
    }
    if let Ok(u) = row.try_get::<uuid::Uuid, _>(name) {
        return Ok(Value::String(u.to_string()));
    }
    if let Ok(d) = row.try_get::<chrono::DateTime<chrono::Utc>, _>(name) {
        return Ok(Value::String(d.to_rfc3339()));
    }
    if let Ok(d) = row.try_get::<chrono::NaiveDateTime, _>(name) {
        return Ok(Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string()));
    }
    if let Ok(d) = row.try_get::<chrono::NaiveDate, _>(name) {
        return Ok(Value::String(d.format("%Y-%m-%d").to_string()));
    }
    if let Ok(s) = row.try_get::<String, _>(name) {
        return Ok(Value::String(s));
    }
    if let Ok(j) = row.try_get::<Value, _>(name) {
        return Ok(j);
    }
    let type_name = row.try_get_raw(name)?.type_info().to_string();
    tracing::error!(column = name, sql_type = %type_name, "no decoder for column type");
    Err(AppError::Internal(format!(
        "unsupported type {} for column {}",
        type_name, name
    )))
}
