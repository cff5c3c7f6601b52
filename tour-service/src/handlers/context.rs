//! Per-request context extractor
//!
//! [`RequestContext`] bundles the caller's [`Authentication`] (attached by the
//! auth middleware) with the matched path parameters. Handlers receive it
//! read-only instead of reaching into request extensions.

use std::collections::HashMap;

use axum::extract::{FromRequestParts, RawPathParams};
use axum::http::request::Parts;

use super::error::AppError;
use crate::middleware::{Access, Authentication, Principal};

/// Immutable view of who is calling and which path parameters matched
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub authentication: Authentication,
    params: HashMap<String, String>,
}

impl RequestContext {
    pub fn new(authentication: Authentication) -> Self {
        Self {
            authentication,
            params: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.authentication.principal()
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn authorize(&self, access: &Access) -> Result<Option<&Principal>, AppError> {
        self.authentication.authorize(access)
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let authentication = parts
            .extensions
            .get::<Authentication>()
            .cloned()
            .unwrap_or_default();

        let params = match RawPathParams::from_request_parts(parts, state).await {
            Ok(raw) => raw
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            Err(rejection) => {
                tracing::debug!(error = %rejection, "No path parameters for request");
                HashMap::new()
            }
        };

        Ok(Self {
            authentication,
            params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::Role;
    use axum::http::Request;

    #[tokio::test]
    async fn test_extracts_authentication_from_extensions() {
        let principal = Principal {
            id: "user_1".into(),
            role: Role::Guide,
        };
        let mut request = Request::builder().uri("/api/v1/tours").body(()).unwrap();
        request
            .extensions_mut()
            .insert(Authentication::Authenticated(principal.clone()));
        let (mut parts, ()) = request.into_parts();

        let context = RequestContext::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(context.principal(), Some(&principal));
        assert_eq!(context.param("id"), None);
    }

    #[tokio::test]
    async fn test_missing_authentication_is_anonymous() {
        let (mut parts, ()) = Request::builder().body(()).unwrap().into_parts();
        let context = RequestContext::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(context.authentication, Authentication::Anonymous);
        assert!(context.authorize(&Access::Authenticated).is_err());
    }

    #[test]
    fn test_with_param() {
        let context = RequestContext::default().with_param("tour_id", "tour_1");
        assert_eq!(context.param("tour_id"), Some("tour_1"));
    }
}
