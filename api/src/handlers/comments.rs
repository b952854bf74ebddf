//! Comment endpoints, nested under a review which is itself addressed
//! through its title. The owning review is resolved from the path and the
//! author from the token, mirroring the review handlers.

use authz::{Action, AuthenticatedOrReadOnly, AuthorOrManager, Policy, Principal, Resource};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use catalog::{Comment, CommentStore};
use tracing::info;

use crate::{
    error::ApiResult,
    middleware::ensure_allowed,
    models::{CommentRequest, CommentResponse, PaginationParams},
    AppState,
};

const POLICIES: [&dyn Policy; 2] = [&AuthenticatedOrReadOnly, &AuthorOrManager];

fn as_resource(comment: &Comment) -> Resource {
    let mut resource = Resource::new(comment.id.to_string(), "comment");
    resource.author = comment.author_id.clone();
    resource
}

/// GET /api/v1/titles/{title_id}/reviews/{review_id}/comments
pub async fn list_comments(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((title_id, review_id)): Path<(i64, i64)>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<impl IntoResponse> {
    ensure_allowed(&POLICIES, &principal, Action::List, None)?;

    let (limit, offset) = pagination.limits();
    let comments = CommentStore::new(&state.db)
        .list(title_id, review_id, limit, offset)
        .await?;

    let response: Vec<CommentResponse> = comments.into_iter().map(CommentResponse::from).collect();
    Ok(Json(response))
}

/// POST /api/v1/titles/{title_id}/reviews/{review_id}/comments
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((title_id, review_id)): Path<(i64, i64)>,
    Json(req): Json<CommentRequest>,
) -> ApiResult<impl IntoResponse> {
    ensure_allowed(&POLICIES, &principal, Action::Create, None)?;

    let comment = CommentStore::new(&state.db)
        .create(title_id, review_id, &principal.id, &req.text)
        .await?;

    info!("Comment {} created by {}", comment.id, principal.id);

    Ok((StatusCode::CREATED, Json(CommentResponse::from(comment))))
}

/// GET /api/v1/titles/{title_id}/reviews/{review_id}/comments/{comment_id}
pub async fn get_comment(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
) -> ApiResult<impl IntoResponse> {
    let comment = CommentStore::new(&state.db)
        .get(title_id, review_id, comment_id)
        .await?;
    ensure_allowed(
        &POLICIES,
        &principal,
        Action::Retrieve,
        Some(&as_resource(&comment)),
    )?;

    Ok(Json(CommentResponse::from(comment)))
}

/// PATCH /api/v1/titles/{title_id}/reviews/{review_id}/comments/{comment_id}
pub async fn update_comment(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
    Json(req): Json<CommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let store = CommentStore::new(&state.db);
    let comment = store.get(title_id, review_id, comment_id).await?;
    ensure_allowed(
        &POLICIES,
        &principal,
        Action::PartialUpdate,
        Some(&as_resource(&comment)),
    )?;

    let updated = store
        .update(title_id, review_id, comment_id, &req.text)
        .await?;

    Ok(Json(CommentResponse::from(updated)))
}

/// DELETE /api/v1/titles/{title_id}/reviews/{review_id}/comments/{comment_id}
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
) -> ApiResult<impl IntoResponse> {
    let store = CommentStore::new(&state.db);
    let comment = store.get(title_id, review_id, comment_id).await?;
    ensure_allowed(
        &POLICIES,
        &principal,
        Action::Delete,
        Some(&as_resource(&comment)),
    )?;

    store.delete(title_id, review_id, comment_id).await?;

    info!("Comment {} deleted by {}", comment_id, principal.id);

    Ok(StatusCode::NO_CONTENT)
}
