//! # Request Context
//!
//! Per-request state handed into every facade call. The user identity comes
//! from the authentication layer and is trusted as-is.

use tracing::Span;
use uuid::Uuid;

/// Identity and correlation data for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    user_id: String,
    request_id: String,
}

impl RequestContext {
    /// Creates a context with a fresh request id.
    pub fn new(user_id: impl Into<String>) -> Self {
        RequestContext {
            user_id: user_id.into(),
            request_id: Uuid::new_v4().to_string(),
        }
    }

    /// Uses a request id supplied by the caller (e.g. an upstream header).
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Span carrying the request's correlation fields.
    pub fn span(&self, operation: &'static str) -> Span {
        tracing::info_span!(
            "storefront_request",
            operation,
            request_id = %self.request_id,
            user_id = %self.user_id,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_ids_are_unique() {
        let a = RequestContext::new("user-1");
        let b = RequestContext::new("user-1");
        assert_eq!(a.user_id(), b.user_id());
        assert_ne!(a.request_id(), b.request_id());
    }

    #[test]
    fn test_with_request_id() {
        let ctx = RequestContext::new("user-1").with_request_id("req-42");
        assert_eq!(ctx.request_id(), "req-42");
    }
}
