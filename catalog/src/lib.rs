//! Catalog domain for the Folio API: titles, categories, genres, reviews
//! and comments.
//!
//! Stores are thin typed wrappers over the shared pool. The interesting
//! rules live on the review write path (one review per author per title,
//! score bounds) and the title read path (mean rating computed per read).

pub mod error;
pub mod models;
pub mod reviews;
pub mod tags;
pub mod titles;

pub use error::{CatalogError, Result};
pub use models::{
    validate_score, validate_year, Comment, NewTitle, Review, Tag, Title, TitleFilter, TitlePatch,
};
pub use reviews::{CommentStore, ReviewStore};
pub use tags::{NewTag, TagStore};
pub use titles::TitleStore;
