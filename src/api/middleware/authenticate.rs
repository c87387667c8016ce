//! The auth gate: verifies the bearer token, resolves the live principal
//! from the matching credential store, and enforces role equality.

use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use http::HeaderMap;
use http::header::AUTHORIZATION;
use http::request::Parts;
use tracing::instrument;

use crate::api::server::{AppState, RouteError};
use crate::auth::AuthError;
use crate::db::models::{Principal, PrincipalKind};
use crate::db::prelude::{CredentialRepository, UserRepository, VendorRepository};

/// Extractor for the principal resolved by [`authenticate`].
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Principal);

/// Extractor for routes behind [`authenticate_optional`]; `None` means the
/// request proceeds anonymously.
#[derive(Debug, Clone)]
pub struct MaybePrincipal(pub Option<Principal>);

/// Strict auth: a missing, invalid, or dangling token fails the request
/// before the handler runs. On success the resolved [`Principal`] is placed
/// in request extensions.
#[instrument(skip_all, fields(uri = %req.uri()))]
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, RouteError> {
    let principal = resolve_bearer(&state, req.headers()).await?;
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

/// Lenient auth for read endpoints that enrich output when a principal is
/// present: every failure in the strict path degrades to anonymous.
#[instrument(skip_all, fields(uri = %req.uri()))]
pub async fn authenticate_optional(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let maybe = match resolve_bearer(&state, req.headers()).await {
        Ok(principal) => Some(principal),
        Err(e) => {
            tracing::debug!(error = %e, "optional auth degraded to anonymous");
            None
        }
    };

    req.extensions_mut().insert(MaybePrincipal(maybe));
    next.run(req).await
}

async fn resolve_bearer(state: &AppState, headers: &HeaderMap) -> Result<Principal, RouteError> {
    let token = bearer_token(headers).ok_or(AuthError::MissingToken)?;

    let claims = state.tokens.verify_access(token).map_err(|e| {
        // expired vs malformed matters here, but not to the client
        tracing::debug!(error = %e, "access token rejected");
        AuthError::InvalidToken
    })?;

    // the claimed kind picks the store; an id never resolves cross-kind
    let principal = match claims.kind {
        PrincipalKind::User => UserRepository::new(state.db_pool)
            .get_by_id(&claims.sub.into())
            .await?
            .map(Principal::User),
        PrincipalKind::Vendor => VendorRepository::new(state.db_pool)
            .get_by_id(&claims.sub.into())
            .await?
            .map(Principal::Vendor),
    };

    principal.ok_or_else(|| AuthError::PrincipalNotFound.into())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Strict kind equality. A user is never a vendor and vice versa; there is
/// no role hierarchy.
pub fn require_role(principal: &Principal, kind: PrincipalKind) -> Result<(), AuthError> {
    if principal.kind() == kind {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

pub async fn require_user(req: Request, next: Next) -> Result<Response, RouteError> {
    let principal = req
        .extensions()
        .get::<Principal>()
        .ok_or(AuthError::MissingToken)?;
    require_role(principal, PrincipalKind::User)?;

    Ok(next.run(req).await)
}

pub async fn require_vendor(req: Request, next: Next) -> Result<Response, RouteError> {
    let principal = req
        .extensions()
        .get::<Principal>()
        .ok_or(AuthError::MissingToken)?;
    require_role(principal, PrincipalKind::Vendor)?;

    Ok(next.run(req).await)
}

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = RouteError;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(CurrentPrincipal)
            .ok_or_else(|| AuthError::MissingToken.into())
    }
}

impl<S> FromRequestParts<S> for MaybePrincipal
where
    S: Send + Sync,
{
    type Rejection = RouteError;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<MaybePrincipal>()
            .cloned()
            .unwrap_or(MaybePrincipal(None)))
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;

    use super::*;
    use crate::db::models::user::{User, UserId};
    use crate::db::models::vendor::{Vendor, VendorId};

    fn test_user() -> Principal {
        let now = Utc::now().naive_utc();
        Principal::User(User {
            user_id: UserId(1),
            name: "ada".into(),
            email: "ada@example.com".into(),
            password: "$2b$04$stub".into(),
            points: 25.0,
            is_guest: false,
            registration_date: now,
            created_at: now,
            updated_at: now,
        })
    }

    fn test_vendor() -> Principal {
        let now = Utc::now().naive_utc();
        Principal::Vendor(Vendor {
            vendor_id: VendorId(1),
            name: "green grocer".into(),
            email: "shop@example.com".into(),
            password: "$2b$04$stub".into(),
            store_name: Some("Green Grocer".into()),
            store_description: None,
            store_address: None,
            store_hours: None,
            logo_url: None,
            banner_url: None,
            sustainability_score: 0.0,
            registration_date: now,
            created_at: now,
            updated_at: now,
        })
    }

    #[test]
    fn role_check_is_strict_equality() {
        assert!(require_role(&test_user(), PrincipalKind::User).is_ok());
        assert!(require_role(&test_vendor(), PrincipalKind::Vendor).is_ok());

        assert_eq!(
            require_role(&test_user(), PrincipalKind::Vendor),
            Err(AuthError::Forbidden)
        );
        assert_eq!(
            require_role(&test_vendor(), PrincipalKind::User),
            Err(AuthError::Forbidden)
        );
    }

    #[test]
    fn bearer_extraction_requires_scheme_prefix() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());

        headers.insert(AUTHORIZATION, "token-without-scheme".parse().unwrap());
        assert!(bearer_token(&headers).is_none());

        headers.insert(AUTHORIZATION, "Bearer abc.def.ghi".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }
}
