//! Caller identity as resolved by the authentication layer.

/// Member id of an authenticated caller.
pub type MemberId = i64;

/// Request extension inserted by authentication middleware for authenticated callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallerIdentity(pub MemberId);

/// Source of the acting principal. Consulted once per request to build a [`crate::RequestContext`].
pub trait IdentityProvider: Send + Sync {
    fn has_caller_identity(&self) -> bool {
        self.caller_id().is_some()
    }

    fn caller_id(&self) -> Option<MemberId>;
}

impl IdentityProvider for Option<CallerIdentity> {
    fn caller_id(&self) -> Option<MemberId> {
        self.map(|c| c.0)
    }
}

impl IdentityProvider for CallerIdentity {
    fn caller_id(&self) -> Option<MemberId> {
        Some(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_for_optional_identity() {
        let none: Option<CallerIdentity> = None;
        assert!(!none.has_caller_identity());
        assert_eq!(Some(CallerIdentity(5)).caller_id(), Some(5));
        assert!(CallerIdentity(7).has_caller_identity());
    }
}
