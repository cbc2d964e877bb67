//! Axum extractors.

mod context;
pub use context::CONTENT_TYPE_HEADER;
