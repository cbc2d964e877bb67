//! Inputs to controller operations, built by the routing layer.

use crate::error::AppError;
use crate::identity::{IdentityProvider, MemberId};
use serde_json::Value;

/// Per-request data threaded into every operation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub caller: Option<MemberId>,
    /// Request media type; used for upload file extensions when the payload does not carry one.
    pub content_type: Option<String>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        RequestContext::default()
    }

    pub fn member(id: MemberId) -> Self {
        RequestContext {
            caller: Some(id),
            content_type: None,
        }
    }

    pub fn from_provider(provider: &dyn IdentityProvider) -> Self {
        RequestContext {
            caller: provider.caller_id(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

impl OrderBy {
    /// Parse `column`, `column asc` or `column desc` (also `-column` for descending).
    pub fn parse(s: &str) -> Result<Self, AppError> {
        let s = s.trim();
        if let Some(col) = s.strip_prefix('-') {
            return Ok(OrderBy {
                column: col.trim().to_string(),
                descending: true,
            });
        }
        let mut parts = s.split_whitespace();
        let column = parts
            .next()
            .ok_or_else(|| AppError::BadRequest("empty order".into()))?
            .to_string();
        let descending = match parts.next().map(|d| d.to_ascii_lowercase()) {
            None => false,
            Some(d) if d == "asc" => false,
            Some(d) if d == "desc" => true,
            Some(d) => return Err(AppError::BadRequest(format!("invalid order direction: {}", d))),
        };
        if parts.next().is_some() {
            return Err(AppError::BadRequest(format!("invalid order: {}", s)));
        }
        Ok(OrderBy { column, descending })
    }
}

/// Pagination, exact-match filters and ordering for `list`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListQuery {
    pub offset: Option<u32>,
    pub limit: Option<u32>,
    pub filters: Vec<(String, Value)>,
    pub order: Option<OrderBy>,
}

pub const DEFAULT_LIMIT: u32 = 100;
pub const MAX_LIMIT: u32 = 1000;

impl ListQuery {
    pub fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT)
    }

    pub fn effective_offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }
}

/// Whole-record vs single-field update.
#[derive(Clone, Debug, PartialEq)]
pub enum UpdateRequest {
    /// Body as received. It must be an object, checked after the record and its owner are.
    WholeRecord(Value),
    SingleField { field: String, content: Value },
}

impl UpdateRequest {
    /// Exactly one extra path parameter addresses a single field; any other count the whole record.
    pub fn from_path_params(params: &[String], data: Value) -> Self {
        match params {
            [field] => UpdateRequest::SingleField {
                field: field.clone(),
                content: data,
            },
            _ => UpdateRequest::WholeRecord(data),
        }
    }
}

/// Whole-record delete vs single-field reset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeleteRequest {
    WholeRecord,
    SingleField { field: String },
}

impl DeleteRequest {
    /// Same arity rule as [`UpdateRequest::from_path_params`].
    pub fn from_path_params(params: &[String]) -> Self {
        match params {
            [field] => DeleteRequest::SingleField { field: field.clone() },
            _ => DeleteRequest::WholeRecord,
        }
    }
}
