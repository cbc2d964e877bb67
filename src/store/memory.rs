//! In-memory record store for tests and development.

use super::{values_match, Guard, RecordStore};
use crate::config::TableRef;
use crate::error::AppError;
use crate::request::ListQuery;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Default)]
struct MemTable {
    rows: Vec<Map<String, Value>>,
    next_id: i64,
}

/// Tables keyed by `schema.table`; rows kept in insertion order.
/// Integer primary keys are assigned from a per-table sequence when absent.
#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    tables: Arc<RwLock<HashMap<String, MemTable>>>,
}

fn table_key(table: &TableRef) -> String {
    format!("{}.{}", table.schema_name, table.table_name)
}

fn lock_err(e: impl std::fmt::Display) -> AppError {
    AppError::Internal(format!("record store lock poisoned: {}", e))
}

fn matches_id(row: &Map<String, Value>, table: &TableRef, id: &Value) -> bool {
    row.get(&table.primary_key).is_some_and(|v| values_match(v, id))
}

fn guard_holds(row: &Map<String, Value>, guard: &[Guard]) -> bool {
    guard
        .iter()
        .all(|g| values_match(row.get(&g.column).unwrap_or(&Value::Null), &g.expected))
}

/// Null sorts first, then numbers, then everything else by its JSON text.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a row as-is, bypassing column filtering. Meant for fixtures.
    pub fn seed(&self, table: &TableRef, row: Value) -> Result<(), AppError> {
        let Value::Object(row) = row else {
            return Err(AppError::BadRequest("seed row must be an object".into()));
        };
        let mut tables = self.tables.write().map_err(lock_err)?;
        let t = tables.entry(table_key(table)).or_default();
        if let Some(n) = row.get(&table.primary_key).and_then(Value::as_i64) {
            t.next_id = t.next_id.max(n);
        }
        t.rows.push(row);
        Ok(())
    }

    /// Clone of every stored row of a table, hidden columns included.
    pub fn dump(&self, table: &TableRef) -> Result<Vec<Value>, AppError> {
        let tables = self.tables.read().map_err(lock_err)?;
        Ok(tables
            .get(&table_key(table))
            .map(|t| t.rows.iter().cloned().map(Value::Object).collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn all(&self, table: &TableRef, query: &ListQuery) -> Result<Vec<Value>, AppError> {
        let tables = self.tables.read().map_err(lock_err)?;
        let Some(t) = tables.get(&table_key(table)) else {
            return Ok(Vec::new());
        };
        let filters: Vec<&(String, Value)> = query
            .filters
            .iter()
            .filter(|(col, _)| table.column(col).is_some())
            .collect();
        let mut rows: Vec<&Map<String, Value>> = t
            .rows
            .iter()
            .filter(|row| {
                filters
                    .iter()
                    .all(|(col, val)| values_match(row.get(col).unwrap_or(&Value::Null), val))
            })
            .collect();

        let pk = &table.primary_key;
        let order = query.order.as_ref().filter(|o| table.column(&o.column).is_some());
        rows.sort_by(|a, b| {
            let by_pk = compare_values(a.get(pk).unwrap_or(&Value::Null), b.get(pk).unwrap_or(&Value::Null));
            match order {
                Some(o) => {
                    let ord = compare_values(
                        a.get(&o.column).unwrap_or(&Value::Null),
                        b.get(&o.column).unwrap_or(&Value::Null),
                    );
                    let ord = if o.descending { ord.reverse() } else { ord };
                    ord.then(by_pk)
                }
                None => by_pk,
            }
        });

        Ok(rows
            .into_iter()
            .skip(query.effective_offset() as usize)
            .take(query.effective_limit() as usize)
            .map(|r| Value::Object(r.clone()))
            .collect())
    }

    async fn row(&self, table: &TableRef, id: &Value) -> Result<Option<Value>, AppError> {
        let tables = self.tables.read().map_err(lock_err)?;
        Ok(tables.get(&table_key(table)).and_then(|t| {
            t.rows
                .iter()
                .find(|r| matches_id(r, table, id))
                .map(|r| Value::Object(r.clone()))
        }))
    }

    async fn one(&self, table: &TableRef, column: &str, id: &Value) -> Result<Option<Value>, AppError> {
        let tables = self.tables.read().map_err(lock_err)?;
        Ok(tables.get(&table_key(table)).and_then(|t| {
            t.rows
                .iter()
                .find(|r| matches_id(r, table, id))
                .map(|r| r.get(column).cloned().unwrap_or(Value::Null))
        }))
    }

    async fn insert(&self, table: &TableRef, data: &Map<String, Value>) -> Result<Value, AppError> {
        let mut tables = self.tables.write().map_err(lock_err)?;
        let t = tables.entry(table_key(table)).or_default();
        let mut row: Map<String, Value> = data
            .iter()
            .filter(|(k, _)| table.column(k).is_some())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let given = row.get(&table.primary_key).filter(|v| !v.is_null()).cloned();
        let id = match given {
            Some(id) => {
                if t.rows.iter().any(|r| matches_id(r, table, &id)) {
                    return Err(AppError::Conflict(format!("duplicate key: {}", id)));
                }
                id
            }
            None => {
                t.next_id += 1;
                let id = Value::Number(t.next_id.into());
                row.insert(table.primary_key.clone(), id.clone());
                id
            }
        };
        for c in &table.columns {
            row.entry(c.name.clone()).or_insert(Value::Null);
        }
        t.rows.push(row);
        Ok(id)
    }

    async fn update(
        &self,
        table: &TableRef,
        id: &Value,
        data: &Map<String, Value>,
        guard: &[Guard],
    ) -> Result<u64, AppError> {
        let mut tables = self.tables.write().map_err(lock_err)?;
        let Some(t) = tables.get_mut(&table_key(table)) else {
            return Ok(0);
        };
        let Some(row) = t
            .rows
            .iter_mut()
            .find(|r| matches_id(r, table, id) && guard_holds(r, guard))
        else {
            return Ok(0);
        };
        for (k, v) in data {
            if *k != table.primary_key && table.column(k).is_some() {
                row.insert(k.clone(), v.clone());
            }
        }
        Ok(1)
    }

    async fn delete(&self, table: &TableRef, id: &Value, guard: &[Guard]) -> Result<u64, AppError> {
        let mut tables = self.tables.write().map_err(lock_err)?;
        let Some(t) = tables.get_mut(&table_key(table)) else {
            return Ok(0);
        };
        let before = t.rows.len();
        t.rows.retain(|r| !(matches_id(r, table, id) && guard_holds(r, guard)));
        Ok((before - t.rows.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnInfo;
    use crate::request::OrderBy;
    use serde_json::json;

    fn table() -> TableRef {
        TableRef {
            schema_name: "public".into(),
            table_name: "notes".into(),
            primary_key: "id".into(),
            columns: ["id", "member_id", "title"]
                .iter()
                .map(|n| ColumnInfo {
                    name: n.to_string(),
                    sql_type: None,
                })
                .collect(),
        }
    }

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn insert_assigns_ids_and_drops_unknown_columns() {
        let store = InMemoryRecordStore::new();
        let t = table();
        let id = store
            .insert(&t, &obj(json!({"title": "a", "member_id": 5, "junk": true})))
            .await
            .unwrap();
        assert_eq!(id, json!(1));
        let row = store.row(&t, &json!(1)).await.unwrap().unwrap();
        assert_eq!(row, json!({"id": 1, "member_id": 5, "title": "a"}));
        assert_eq!(store.insert(&t, &obj(json!({"title": "b"}))).await.unwrap(), json!(2));
    }

    #[tokio::test]
    async fn guarded_writes_miss_when_guard_fails() {
        let store = InMemoryRecordStore::new();
        let t = table();
        store.seed(&t, json!({"id": 42, "member_id": 5, "title": "x"})).unwrap();

        let n = store
            .update(&t, &json!(42), &obj(json!({"title": "y"})), &[Guard::new("member_id", json!(6))])
            .await
            .unwrap();
        assert_eq!(n, 0);
        let n = store
            .update(&t, &json!(42), &obj(json!({"title": "y"})), &[Guard::new("member_id", json!(5))])
            .await
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(store.one(&t, "title", &json!(42)).await.unwrap(), Some(json!("y")));

        assert_eq!(store.delete(&t, &json!(42), &[Guard::new("title", json!("x"))]).await.unwrap(), 0);
        assert_eq!(store.delete(&t, &json!(42), &[]).await.unwrap(), 1);
        assert_eq!(store.row(&t, &json!(42)).await.unwrap(), None);
        assert_eq!(store.one(&t, "title", &json!(42)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_filters_orders_and_pages() {
        let store = InMemoryRecordStore::new();
        let t = table();
        for (id, owner, title) in [(1, 5, "c"), (2, 6, "a"), (3, 5, "b"), (4, 5, "a")] {
            store
                .seed(&t, json!({"id": id, "member_id": owner, "title": title}))
                .unwrap();
        }
        let query = ListQuery {
            filters: vec![("member_id".into(), json!(5))],
            order: Some(OrderBy::parse("title").unwrap()),
            ..Default::default()
        };
        let ids: Vec<Value> = store
            .all(&t, &query)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r["id"].clone())
            .collect();
        assert_eq!(ids, vec![json!(4), json!(3), json!(1)]);

        let paged = ListQuery {
            offset: Some(1),
            limit: Some(2),
            ..Default::default()
        };
        let ids: Vec<Value> = store
            .all(&t, &paged)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r["id"].clone())
            .collect();
        assert_eq!(ids, vec![json!(2), json!(3)]);
    }
}
