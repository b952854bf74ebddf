//! Authorization engine for the Folio API.
//!
//! This crate defines the role model and the permission policies the HTTP
//! layer composes per endpoint. The authorization flow follows this pattern:
//!
//! 1. **Request arrives** at the API layer
//! 2. **Authentication** resolves the bearer token to a [`types::Principal`]
//!    (or the anonymous principal)
//! 3. The endpoint's ordered policy list is evaluated with
//!    [`policy::is_authorized`] — collection-level gates first, then the
//!    object-level rule once the target row is loaded
//! 4. **Decision** is Allow or Deny; a deny maps to 401 or 403 at the
//!    boundary depending on whether the principal is authenticated
//!
//! Every policy is a pure function over its inputs. Nothing in this crate
//! performs I/O, and a denial is an ordinary decision value, never an error.

pub mod policy;
pub mod types;

pub use policy::{
    is_authorized, AdminOnly, AuthenticatedOrReadOnly, AuthorOrManager, Policy,
    SuperuserOrReadOnly,
};
pub use types::{Action, Principal, Resource, Role};
