//! Category and genre endpoints: list/create/destroy, slug-keyed.

use authz::{Action, Policy, Principal, SuperuserOrReadOnly};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use catalog::{NewTag, TagStore};
use tracing::info;

use crate::{
    error::{ApiErrorResponse, ApiResult},
    middleware::ensure_allowed,
    models::{PaginationParams, TagListParams, TagRequest, TagResponse},
    AppState,
};

const POLICIES: [&dyn Policy; 1] = [&SuperuserOrReadOnly];

async fn list_tags(
    store: TagStore<'_>,
    principal: &Principal,
    params: TagListParams,
) -> ApiResult<Json<Vec<TagResponse>>> {
    ensure_allowed(&POLICIES, principal, Action::List, None)?;

    let pagination = PaginationParams {
        page: params.page,
        page_size: params.page_size,
    };
    let (limit, offset) = pagination.limits();

    let tags = store.list(params.search.as_deref(), limit, offset).await?;
    Ok(Json(tags.into_iter().map(TagResponse::from).collect()))
}

async fn create_tag(
    store: TagStore<'_>,
    principal: &Principal,
    req: TagRequest,
) -> ApiResult<(StatusCode, Json<TagResponse>)> {
    ensure_allowed(&POLICIES, principal, Action::Create, None)?;

    let tag = store
        .create(NewTag {
            name: req.name,
            slug: req.slug,
        })
        .await?;

    info!("Tag {} created by {}", tag.slug, principal.id);

    Ok((StatusCode::CREATED, Json(TagResponse::from(tag))))
}

async fn delete_tag(
    store: TagStore<'_>,
    principal: &Principal,
    slug: &str,
) -> ApiResult<StatusCode> {
    ensure_allowed(&POLICIES, principal, Action::Delete, None)?;

    store.delete_by_slug(slug).await?;

    info!("Tag {} deleted by {}", slug, principal.id);

    Ok(StatusCode::NO_CONTENT)
}

/// List categories
///
/// GET /api/v1/categories
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    params(
        ("page" = Option<i64>, Query, description = "Page number (default: 1)"),
        ("page_size" = Option<i64>, Query, description = "Items per page (default: 20)"),
        ("search" = Option<String>, Query, description = "Exact name match")
    ),
    responses(
        (status = 200, description = "Categories listed successfully", body = Vec<TagResponse>)
    ),
    tag = "categories"
)]
pub async fn list_categories(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<TagListParams>,
) -> ApiResult<impl IntoResponse> {
    list_tags(TagStore::categories(&state.db), &principal, params).await
}

/// Create a category
///
/// POST /api/v1/categories
#[utoipa::path(
    post,
    path = "/api/v1/categories",
    request_body = TagRequest,
    responses(
        (status = 201, description = "Category created successfully", body = TagResponse),
        (status = 400, description = "Invalid payload", body = ApiErrorResponse),
        (status = 403, description = "Not a superuser", body = ApiErrorResponse)
    ),
    tag = "categories"
)]
pub async fn create_category(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<TagRequest>,
) -> ApiResult<impl IntoResponse> {
    create_tag(TagStore::categories(&state.db), &principal, req).await
}

/// Delete a category by slug (titles keep running with a null category)
///
/// DELETE /api/v1/categories/{slug}
#[utoipa::path(
    delete,
    path = "/api/v1/categories/{slug}",
    params(("slug" = String, Path, description = "Category slug")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 404, description = "Category not found", body = ApiErrorResponse)
    ),
    tag = "categories"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(slug): Path<String>,
) -> ApiResult<impl IntoResponse> {
    delete_tag(TagStore::categories(&state.db), &principal, &slug).await
}

/// List genres
///
/// GET /api/v1/genres
#[utoipa::path(
    get,
    path = "/api/v1/genres",
    params(
        ("page" = Option<i64>, Query, description = "Page number (default: 1)"),
        ("page_size" = Option<i64>, Query, description = "Items per page (default: 20)"),
        ("search" = Option<String>, Query, description = "Exact name match")
    ),
    responses(
        (status = 200, description = "Genres listed successfully", body = Vec<TagResponse>)
    ),
    tag = "genres"
)]
pub async fn list_genres(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<TagListParams>,
) -> ApiResult<impl IntoResponse> {
    list_tags(TagStore::genres(&state.db), &principal, params).await
}

/// Create a genre
///
/// POST /api/v1/genres
#[utoipa::path(
    post,
    path = "/api/v1/genres",
    request_body = TagRequest,
    responses(
        (status = 201, description = "Genre created successfully", body = TagResponse),
        (status = 400, description = "Invalid payload", body = ApiErrorResponse),
        (status = 403, description = "Not a superuser", body = ApiErrorResponse)
    ),
    tag = "genres"
)]
pub async fn create_genre(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<TagRequest>,
) -> ApiResult<impl IntoResponse> {
    create_tag(TagStore::genres(&state.db), &principal, req).await
}

/// Delete a genre by slug
///
/// DELETE /api/v1/genres/{slug}
#[utoipa::path(
    delete,
    path = "/api/v1/genres/{slug}",
    params(("slug" = String, Path, description = "Genre slug")),
    responses(
        (status = 204, description = "Genre deleted"),
        (status = 404, description = "Genre not found", body = ApiErrorResponse)
    ),
    tag = "genres"
)]
pub async fn delete_genre(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(slug): Path<String>,
) -> ApiResult<impl IntoResponse> {
    delete_tag(TagStore::genres(&state.db), &principal, &slug).await
}
