//! Builds parameterized SELECT, INSERT, UPDATE, DELETE for a configured table.

use crate::config::TableRef;
use crate::request::ListQuery;
use crate::store::Guard;
use serde_json::{Map, Value};

/// Quote identifier for PostgreSQL (safe: only from config).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn qualified_table(table: &TableRef) -> String {
    format!("{}.{}", quoted(&table.schema_name), quoted(&table.table_name))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Push a parameter and return its placeholder, cast when the column type is known.
    fn placeholder(&mut self, v: Value, sql_type: Option<&str>) -> String {
        self.params.push(v);
        let n = self.params.len();
        match sql_type {
            Some(t) => format!("${}::{}", n, t),
            None => format!("${}", n),
        }
    }
}

fn column_type<'a>(table: &'a TableRef, column: &str) -> Option<&'a str> {
    table.column(column).and_then(|c| c.sql_type.as_deref())
}

/// Types the row decoder reads directly. Anything else (numeric, time, interval, bytea, arrays)
/// is selected as text.
fn natively_decoded(sql_type: &str) -> bool {
    let t = sql_type.trim().to_lowercase();
    if t.ends_with("[]") {
        return false;
    }
    let base = t.split('(').next().unwrap_or("").trim();
    matches!(
        base,
        "smallint"
            | "int2"
            | "int"
            | "int4"
            | "integer"
            | "serial"
            | "bigint"
            | "int8"
            | "bigserial"
            | "real"
            | "float4"
            | "double precision"
            | "float8"
            | "bool"
            | "boolean"
            | "uuid"
            | "timestamp"
            | "timestamptz"
            | "timestamp with time zone"
            | "timestamp without time zone"
            | "date"
            | "text"
            | "varchar"
            | "character varying"
            | "char"
            | "character"
            | "json"
            | "jsonb"
    )
}

fn projected(column: &str, sql_type: Option<&str>) -> String {
    let q = quoted(column);
    match sql_type {
        Some(t) if !natively_decoded(t) => format!("{}::text AS {}", q, q),
        _ => q,
    }
}

/// Configured columns, with types the decoder cannot read cast to text.
fn select_column_list(table: &TableRef) -> String {
    table
        .columns
        .iter()
        .map(|c| projected(&c.name, c.sql_type.as_deref()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn pk_condition(q: &mut QueryBuf, table: &TableRef, id: &Value) -> String {
    let ph = q.placeholder(id.clone(), column_type(table, &table.primary_key));
    format!("{} = {}", quoted(&table.primary_key), ph)
}

fn guard_conditions(q: &mut QueryBuf, table: &TableRef, guard: &[Guard]) -> Vec<String> {
    guard
        .iter()
        .map(|g| {
            let ph = q.placeholder(g.expected.clone(), column_type(table, &g.column));
            format!("{} IS NOT DISTINCT FROM {}", quoted(&g.column), ph)
        })
        .collect()
}

/// SELECT with exact-match filters, ORDER BY (pk by default), LIMIT/OFFSET.
/// Filters and order on columns outside the table are skipped.
pub fn select_list(table: &TableRef, query: &ListQuery) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut where_parts = Vec::new();
    for (col, val) in &query.filters {
        let Some(c) = table.column(col) else { continue };
        let ph = q.placeholder(val.clone(), c.sql_type.as_deref());
        where_parts.push(format!("{} = {}", quoted(col), ph));
    }
    let where_clause = if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    };
    let order_clause = match &query.order {
        Some(o) if table.column(&o.column).is_some() => format!(
            " ORDER BY {} {}, {}",
            quoted(&o.column),
            if o.descending { "DESC" } else { "ASC" },
            quoted(&table.primary_key)
        ),
        _ => format!(" ORDER BY {}", quoted(&table.primary_key)),
    };
    q.sql = format!(
        "SELECT {} FROM {}{}{} LIMIT {} OFFSET {}",
        select_column_list(table),
        qualified_table(table),
        where_clause,
        order_clause,
        query.effective_limit(),
        query.effective_offset()
    );
    q
}

/// SELECT one row by primary key.
pub fn select_by_id(table: &TableRef, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let cond = pk_condition(&mut q, table, id);
    q.sql = format!(
        "SELECT {} FROM {} WHERE {}",
        select_column_list(table),
        qualified_table(table),
        cond
    );
    q
}

/// SELECT a single column by primary key.
pub fn select_column_by_id(table: &TableRef, column: &str, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let cond = pk_condition(&mut q, table, id);
    let expr = projected(column, column_type(table, column));
    q.sql = format!("SELECT {} FROM {} WHERE {}", expr, qualified_table(table), cond);
    q
}

/// INSERT the configured columns present in `data`; the database fills the rest. Returns the pk.
pub fn insert(table: &TableRef, data: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in &table.columns {
        let Some(val) = data.get(&c.name) else { continue };
        placeholders.push(q.placeholder(val.clone(), c.sql_type.as_deref()));
        cols.push(quoted(&c.name));
    }
    let pk = quoted(&table.primary_key);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", qualified_table(table), pk)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            qualified_table(table),
            cols.join(", "),
            placeholders.join(", "),
            pk
        )
    };
    q
}

/// UPDATE by id, SET only configured non-pk columns present in `data`, guarded by `guard`.
/// With nothing to set, counts the rows the update would have matched instead.
pub fn update(table: &TableRef, id: &Value, data: &Map<String, Value>, guard: &[Guard]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for (k, v) in data {
        if *k == table.primary_key {
            continue;
        }
        let Some(c) = table.column(k) else { continue };
        let ph = q.placeholder(v.clone(), c.sql_type.as_deref());
        sets.push(format!("{} = {}", quoted(k), ph));
    }
    let mut conds = vec![pk_condition(&mut q, table, id)];
    conds.extend(guard_conditions(&mut q, table, guard));
    let where_clause = conds.join(" AND ");
    q.sql = if sets.is_empty() {
        format!("SELECT COUNT(*) FROM {} WHERE {}", qualified_table(table), where_clause)
    } else {
        format!(
            "UPDATE {} SET {} WHERE {}",
            qualified_table(table),
            sets.join(", "),
            where_clause
        )
    };
    q
}

/// DELETE by id, guarded by `guard`.
pub fn delete(table: &TableRef, id: &Value, guard: &[Guard]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut conds = vec![pk_condition(&mut q, table, id)];
    conds.extend(guard_conditions(&mut q, table, guard));
    q.sql = format!("DELETE FROM {} WHERE {}", qualified_table(table), conds.join(" AND "));
    q
}
