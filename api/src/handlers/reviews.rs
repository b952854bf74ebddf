//! Review endpoints, nested under their title.
//!
//! Author and title are always taken from the request context (token and
//! path), never from the payload. The one-review-per-author-per-title rule
//! and the score bounds are enforced by the catalog store before anything
//! is persisted.

use authz::{Action, AuthenticatedOrReadOnly, AuthorOrManager, Policy, Principal, Resource};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use catalog::{Review, ReviewStore};
use tracing::info;

use crate::{
    error::ApiResult,
    middleware::ensure_allowed,
    models::{PaginationParams, ReviewCreateRequest, ReviewResponse, ReviewUpdateRequest},
    AppState,
};

const POLICIES: [&dyn Policy; 2] = [&AuthenticatedOrReadOnly, &AuthorOrManager];

fn as_resource(review: &Review) -> Resource {
    Resource::authored(review.id.to_string(), "review", review.author_id.clone())
}

/// GET /api/v1/titles/{title_id}/reviews
pub async fn list_reviews(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(title_id): Path<i64>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<impl IntoResponse> {
    ensure_allowed(&POLICIES, &principal, Action::List, None)?;

    let (limit, offset) = pagination.limits();
    let reviews = ReviewStore::new(&state.db)
        .list(title_id, limit, offset)
        .await?;

    let response: Vec<ReviewResponse> = reviews.into_iter().map(ReviewResponse::from).collect();
    Ok(Json(response))
}

/// POST /api/v1/titles/{title_id}/reviews
pub async fn create_review(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(title_id): Path<i64>,
    Json(req): Json<ReviewCreateRequest>,
) -> ApiResult<impl IntoResponse> {
    // Creation has no object to check yet; authorship is established here.
    ensure_allowed(&POLICIES, &principal, Action::Create, None)?;

    let review = ReviewStore::new(&state.db)
        .create(title_id, &principal.id, &req.text, req.score)
        .await?;

    info!("Review {} created by {}", review.id, principal.id);

    Ok((StatusCode::CREATED, Json(ReviewResponse::from(review))))
}

/// GET /api/v1/titles/{title_id}/reviews/{review_id}
pub async fn get_review(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((title_id, review_id)): Path<(i64, i64)>,
) -> ApiResult<impl IntoResponse> {
    let review = ReviewStore::new(&state.db).get(title_id, review_id).await?;
    ensure_allowed(
        &POLICIES,
        &principal,
        Action::Retrieve,
        Some(&as_resource(&review)),
    )?;

    Ok(Json(ReviewResponse::from(review)))
}

/// PATCH /api/v1/titles/{title_id}/reviews/{review_id}
pub async fn update_review(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((title_id, review_id)): Path<(i64, i64)>,
    Json(req): Json<ReviewUpdateRequest>,
) -> ApiResult<impl IntoResponse> {
    let store = ReviewStore::new(&state.db);
    let review = store.get(title_id, review_id).await?;
    ensure_allowed(
        &POLICIES,
        &principal,
        Action::PartialUpdate,
        Some(&as_resource(&review)),
    )?;

    let updated = store
        .update(title_id, review_id, req.text.as_deref(), req.score)
        .await?;

    Ok(Json(ReviewResponse::from(updated)))
}

/// DELETE /api/v1/titles/{title_id}/reviews/{review_id}
pub async fn delete_review(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((title_id, review_id)): Path<(i64, i64)>,
) -> ApiResult<impl IntoResponse> {
    let store = ReviewStore::new(&state.db);
    let review = store.get(title_id, review_id).await?;
    ensure_allowed(
        &POLICIES,
        &principal,
        Action::Delete,
        Some(&as_resource(&review)),
    )?;

    store.delete(title_id, review_id).await?;

    info!("Review {} deleted by {}", review_id, principal.id);

    Ok(StatusCode::NO_CONTENT)
}
