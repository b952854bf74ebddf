//! Accounts and registration for the Folio API.
//!
//! This crate owns the user table, the email confirmation-code handshake
//! and signed credential pairs. Authorization rules live in the `authz`
//! crate; this crate only turns a stored account into a principal.

pub mod error;
pub mod handshake;
pub mod mailer;
pub mod model;
pub mod store;
pub mod token;

pub use error::{Result as UserResult, UserError};
pub use handshake::{ExchangeRequest, Handshake};
pub use mailer::{Mailer, MailerConfig};
pub use model::{ConfirmationCode, NewUser, User, UserPatch};
pub use store::UserStore;
pub use token::{TokenConfig, TokenKind, TokenPair};
