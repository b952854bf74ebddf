//! Request-scoped principal resolution.
//!
//! Runs before every handler: resolves the Authorization header to an
//! [`authz::Principal`] and stores it as a request extension. A missing
//! header yields the anonymous principal so read-only endpoints keep
//! working; a present-but-invalid credential is rejected outright.

use authz::{Action, Policy, Principal, Resource};
use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};
use user::{token, TokenKind, UserStore};

use crate::error::ApiError;
use crate::AppState;

/// Resolve the request's principal and attach it as an extension.
pub async fn principal_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let bearer = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .map(str::to_string);

    let principal = match bearer {
        None => Principal::anonymous(),
        Some(token_str) => {
            let user_id = match token::verify(&state.tokens, &token_str, TokenKind::Access) {
                Ok(user_id) => user_id,
                Err(e) => {
                    debug!("Rejected bearer token: {}", e);
                    return Ok(ApiError::Unauthorized.into_response());
                }
            };
            match UserStore::new(&state.db).get_by_id(&user_id).await {
                Ok(user) => user.principal(),
                Err(e) => {
                    // A signed token for a vanished account.
                    warn!("Bearer token for unknown user {}: {}", user_id, e);
                    return Ok(ApiError::Unauthorized.into_response());
                }
            }
        }
    };

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Map a deny to the boundary outcome: 401 for the anonymous visitor,
/// 403 for an authenticated principal lacking the capability.
pub fn denial(principal: &Principal) -> ApiError {
    if principal.authenticated {
        ApiError::Forbidden
    } else {
        ApiError::Unauthorized
    }
}

/// Evaluate the endpoint's policy list; Err is the mapped denial.
pub fn ensure_allowed(
    policies: &[&dyn Policy],
    principal: &Principal,
    action: Action,
    target: Option<&Resource>,
) -> Result<(), ApiError> {
    if authz::is_authorized(policies, principal, action, target) {
        Ok(())
    } else {
        warn!(
            "Access denied for {} ({:?} on {:?})",
            principal.id, action, target
        );
        Err(denial(principal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authz::{AuthenticatedOrReadOnly, AuthorOrManager, Role, SuperuserOrReadOnly};

    #[test]
    fn test_denial_maps_by_authentication() {
        assert!(matches!(
            denial(&Principal::anonymous()),
            ApiError::Unauthorized
        ));
        assert!(matches!(
            denial(&Principal::authenticated("u", Role::User)),
            ApiError::Forbidden
        ));
    }

    #[test]
    fn test_ensure_allowed_outcomes() {
        let policies: [&dyn Policy; 1] = [&SuperuserOrReadOnly];

        assert!(ensure_allowed(&policies, &Principal::anonymous(), Action::List, None).is_ok());
        assert!(matches!(
            ensure_allowed(&policies, &Principal::anonymous(), Action::Create, None),
            Err(ApiError::Unauthorized)
        ));
        assert!(matches!(
            ensure_allowed(
                &policies,
                &Principal::authenticated("u", Role::User),
                Action::Create,
                None
            ),
            Err(ApiError::Forbidden)
        ));
    }

    #[test]
    fn test_review_policy_scenarios() {
        let policies: [&dyn Policy; 2] = [&AuthenticatedOrReadOnly, &AuthorOrManager];
        let review = Resource::authored("1", "review", "author");
        let stranger = Principal::authenticated("stranger", Role::User);

        // Reading someone else's review is allowed, editing it is not.
        assert!(ensure_allowed(&policies, &stranger, Action::Retrieve, Some(&review)).is_ok());
        assert!(matches!(
            ensure_allowed(&policies, &stranger, Action::PartialUpdate, Some(&review)),
            Err(ApiError::Forbidden)
        ));
    }
}
