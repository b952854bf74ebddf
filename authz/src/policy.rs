//! Composable permission policies.
//!
//! Each policy is a pure predicate over (principal, action, optional target
//! object). Endpoints compose them as an ordered list evaluated with
//! short-circuit AND; the cheap collection-level gates come first so an
//! object never has to be loaded for a request that fails authentication.

use crate::types::{Action, Principal, Resource};

/// A single permission rule. No I/O, no side effects; a denial is a
/// decision, not a fault.
pub trait Policy {
    fn allows(&self, principal: &Principal, action: Action, target: Option<&Resource>) -> bool;
}

/// Allow only admins (by role) or staff accounts. The presence of a target
/// object changes nothing.
pub struct AdminOnly;

impl Policy for AdminOnly {
    fn allows(&self, principal: &Principal, _action: Action, _target: Option<&Resource>) -> bool {
        principal.authenticated && (principal.is_admin() || principal.is_staff)
    }
}

/// Safe methods for everyone; mutations only for superusers.
pub struct SuperuserOrReadOnly;

impl Policy for SuperuserOrReadOnly {
    fn allows(&self, principal: &Principal, action: Action, _target: Option<&Resource>) -> bool {
        if action.is_safe() {
            return true;
        }
        principal.is_superuser
    }
}

/// Safe methods for everyone; mutations require authentication. Composed
/// before [`AuthorOrManager`] so the object-level check never runs for an
/// anonymous principal.
pub struct AuthenticatedOrReadOnly;

impl Policy for AuthenticatedOrReadOnly {
    fn allows(&self, principal: &Principal, action: Action, _target: Option<&Resource>) -> bool {
        if action.is_safe() {
            return true;
        }
        principal.authenticated
    }
}

/// Safe methods for everyone; mutating an existing object requires being its
/// author, an admin or a moderator.
///
/// Without a target (creation, or a collection-level pre-check) there is no
/// author to compare against, so the rule passes and leaves the gate to
/// [`AuthenticatedOrReadOnly`]. Authorship is established server-side at
/// creation time, which is what makes this check meaningful on updates.
pub struct AuthorOrManager;

impl Policy for AuthorOrManager {
    fn allows(&self, principal: &Principal, action: Action, target: Option<&Resource>) -> bool {
        if action.is_safe() {
            return true;
        }
        let Some(resource) = target else {
            return true;
        };
        principal.authenticated
            && (resource.author.as_deref() == Some(principal.id.as_str())
                || principal.is_admin()
                || principal.is_moderator())
    }
}

/// Evaluate an ordered policy list with short-circuit AND.
pub fn is_authorized(
    policies: &[&dyn Policy],
    principal: &Principal,
    action: Action,
    target: Option<&Resource>,
) -> bool {
    policies
        .iter()
        .all(|policy| policy.allows(principal, action, target))
}
