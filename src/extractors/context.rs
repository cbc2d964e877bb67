//! Build a [`RequestContext`] from the request: caller from the authentication extension,
//! media type from the `Content-Type` header.

use crate::identity::CallerIdentity;
use crate::request::RequestContext;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

pub const CONTENT_TYPE_HEADER: &str = "content-type";

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let caller = parts.extensions.get::<CallerIdentity>().copied();
        let content_type = parts
            .headers
            .get(CONTENT_TYPE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Ok(RequestContext {
            caller: caller.map(|c| c.0),
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn reads_identity_and_content_type() {
        let mut req = Request::builder()
            .header("Content-Type", "image/png")
            .body(())
            .unwrap();
        req.extensions_mut().insert(CallerIdentity(5));
        let (mut parts, _) = req.into_parts();
        let ctx = RequestContext::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ctx, RequestContext::member(5).with_content_type("image/png"));
    }

    #[tokio::test]
    async fn anonymous_without_extension() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        let ctx = RequestContext::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ctx, RequestContext::anonymous());
    }
}
