use catalog::{Comment, Review, Tag, Title};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use user::{TokenPair, User};
use utoipa::ToSchema;

/// Default and maximum page sizes for list endpoints.
pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Pagination parameters
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl PaginationParams {
    /// Resolve to (limit, offset) with defaults and the page-size cap.
    pub fn limits(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let page_size = self
            .page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        (page_size, (page - 1) * page_size)
    }
}

/// Query parameters for the titles list: pagination plus filters.
#[derive(Debug, Default, Deserialize)]
pub struct TitleListParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub genre: Option<String>,
    pub year: Option<i64>,
}

/// Query parameters for tag lists: pagination plus exact-name search.
#[derive(Debug, Default, Deserialize)]
pub struct TagListParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub search: Option<String>,
}

/// Query parameters for the users list.
#[derive(Debug, Default, Deserialize)]
pub struct UserListParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub search: Option<String>,
}

// ============================================================================
// Auth payloads
// ============================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenRequest {
    pub username: String,
    pub email: String,
    pub confirmation_code: String,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub access: String,
    pub refresh: String,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access: pair.access,
            refresh: pair.refresh,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================================================
// Catalog payloads
// ============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct TagResponse {
    pub name: String,
    pub slug: String,
}

impl From<Tag> for TagResponse {
    fn from(tag: Tag) -> Self {
        Self {
            name: tag.name,
            slug: tag.slug,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TagRequest {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TitleResponse {
    pub id: i64,
    pub name: String,
    pub year: i64,
    pub description: Option<String>,
    pub category: Option<TagResponse>,
    pub genre: Vec<TagResponse>,
    /// Mean review score; null when the title has no reviews.
    pub rating: Option<f64>,
}

impl From<Title> for TitleResponse {
    fn from(title: Title) -> Self {
        Self {
            id: title.id,
            name: title.name,
            year: title.year,
            description: title.description,
            category: title.category.map(TagResponse::from),
            genre: title.genre.into_iter().map(TagResponse::from).collect(),
            rating: title.rating,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TitleCreateRequest {
    pub name: String,
    pub year: i64,
    pub description: Option<String>,
    /// Category slug.
    pub category: Option<String>,
    /// Genre slugs.
    #[serde(default)]
    pub genre: Vec<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TitleUpdateRequest {
    pub name: Option<String>,
    pub year: Option<i64>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub genre: Option<Vec<String>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewResponse {
    pub id: i64,
    pub title_id: i64,
    /// Author username.
    pub author: String,
    pub text: String,
    pub score: i64,
    pub pub_date: DateTime<Utc>,
}

impl From<Review> for ReviewResponse {
    fn from(review: Review) -> Self {
        Self {
            id: review.id,
            title_id: review.title_id,
            author: review.author,
            text: review.text,
            score: review.score,
            pub_date: review.pub_date,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewCreateRequest {
    pub text: String,
    pub score: i64,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReviewUpdateRequest {
    pub text: Option<String>,
    pub score: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CommentResponse {
    pub id: i64,
    pub review_id: i64,
    /// Author username; null when the account was removed.
    pub author: Option<String>,
    pub text: String,
    pub pub_date: DateTime<Utc>,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            review_id: comment.review_id,
            author: comment.author,
            text: comment.text,
            pub_date: comment.pub_date,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CommentRequest {
    pub text: String,
}

// ============================================================================
// User payloads
// ============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub role: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            bio: user.bio,
            role: user.role_str,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UserCreateRequest {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub bio: String,
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UserUpdateRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: Option<String>,
}

/// Self-profile update. `role` is deliberately absent: accounts cannot
/// change their own role, that is an admin operation.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct MeUpdateRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
}

/// Health check response
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: DatabaseHealth,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DatabaseHealth {
    pub connected: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let params = PaginationParams::default();
        assert_eq!(params.limits(), (DEFAULT_PAGE_SIZE, 0));
    }

    #[test]
    fn test_pagination_offset_and_cap() {
        let params = PaginationParams {
            page: Some(3),
            page_size: Some(10),
        };
        assert_eq!(params.limits(), (10, 20));

        let oversized = PaginationParams {
            page: Some(1),
            page_size: Some(10_000),
        };
        assert_eq!(oversized.limits(), (MAX_PAGE_SIZE, 0));

        let nonsense = PaginationParams {
            page: Some(0),
            page_size: Some(0),
        };
        assert_eq!(nonsense.limits(), (1, 0));
    }
}
