//! Ownership checks for mutating operations.

use crate::identity::MemberId;
use serde_json::Value;

/// True iff `record[owner_column]` exists and equals `caller`. Missing owner column, missing value,
/// or no caller all deny.
pub fn check_ownership(record: &Value, owner_column: Option<&str>, caller: Option<MemberId>) -> bool {
    let (Some(column), Some(caller)) = (owner_column, caller) else {
        return false;
    };
    record
        .get(column)
        .map(|owner| owner_matches(owner, caller))
        .unwrap_or(false)
}

/// Owner values come back as numbers from Postgres and sometimes as strings from other stores.
fn owner_matches(owner: &Value, caller: MemberId) -> bool {
    match owner {
        Value::Number(n) => n.as_i64() == Some(caller),
        Value::String(s) => s.trim().parse::<MemberId>().ok() == Some(caller),
        _ => false,
    }
}
