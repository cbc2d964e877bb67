//! Record storage engine: the persistence seam under every controller.

mod memory;
mod postgres;

pub use memory::InMemoryRecordStore;
pub use postgres::PgRecordStore;

use crate::config::TableRef;
use crate::error::AppError;
use crate::request::ListQuery;
use async_trait::async_trait;
use serde_json::{Map, Number, Value};

/// A column value that must still hold for a guarded write to apply.
#[derive(Clone, Debug, PartialEq)]
pub struct Guard {
    pub column: String,
    /// `Value::Null` matches a NULL column.
    pub expected: Value,
}

impl Guard {
    pub fn new(column: impl Into<String>, expected: Value) -> Self {
        Guard {
            column: column.into(),
            expected,
        }
    }
}

/// Records are JSON objects keyed by column name. Writes only touch configured columns.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn all(&self, table: &TableRef, query: &ListQuery) -> Result<Vec<Value>, AppError>;

    async fn row(&self, table: &TableRef, id: &Value) -> Result<Option<Value>, AppError>;

    /// One column of one record. `None` when the record does not exist.
    async fn one(&self, table: &TableRef, column: &str, id: &Value) -> Result<Option<Value>, AppError>;

    /// Insert and return the new primary key.
    async fn insert(&self, table: &TableRef, data: &Map<String, Value>) -> Result<Value, AppError>;

    /// Update by id where every guard holds. Returns the number of rows matched.
    async fn update(
        &self,
        table: &TableRef,
        id: &Value,
        data: &Map<String, Value>,
        guard: &[Guard],
    ) -> Result<u64, AppError>;

    /// Delete by id where every guard holds. Returns the number of rows removed.
    async fn delete(&self, table: &TableRef, id: &Value, guard: &[Guard]) -> Result<u64, AppError>;
}

/// Loose JSON equality: numbers compare by value, numeric strings match numbers. Integers are
/// compared exactly; only non-integers go through f64.
pub(crate) fn values_match(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (integer(x), integer(y)) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            let s = s.trim();
            match (integer(n), s.parse::<i128>()) {
                (Some(n), Ok(parsed)) => n == parsed,
                _ => s.parse::<f64>().ok() == n.as_f64(),
            }
        }
        _ => a == b,
    }
}

fn integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}
