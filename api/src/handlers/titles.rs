use authz::{Action, Policy, Principal, SuperuserOrReadOnly};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use catalog::{NewTitle, TitleFilter, TitlePatch, TitleStore};
use tracing::info;

use crate::{
    error::{ApiErrorResponse, ApiResult},
    middleware::ensure_allowed,
    models::{
        PaginationParams, TitleCreateRequest, TitleListParams, TitleResponse, TitleUpdateRequest,
    },
    AppState,
};

const POLICIES: [&dyn Policy; 1] = [&SuperuserOrReadOnly];

/// List titles with filters, newest year first
///
/// GET /api/v1/titles
#[utoipa::path(
    get,
    path = "/api/v1/titles",
    params(
        ("page" = Option<i64>, Query, description = "Page number (default: 1)"),
        ("page_size" = Option<i64>, Query, description = "Items per page (default: 20)"),
        ("name" = Option<String>, Query, description = "Substring match on the name"),
        ("category" = Option<String>, Query, description = "Category slug"),
        ("genre" = Option<String>, Query, description = "Genre slug"),
        ("year" = Option<i64>, Query, description = "Exact year")
    ),
    responses(
        (status = 200, description = "Titles listed successfully", body = Vec<TitleResponse>)
    ),
    tag = "titles"
)]
pub async fn list_titles(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<TitleListParams>,
) -> ApiResult<impl IntoResponse> {
    ensure_allowed(&POLICIES, &principal, Action::List, None)?;

    let pagination = PaginationParams {
        page: params.page,
        page_size: params.page_size,
    };
    let (limit, offset) = pagination.limits();
    let filter = TitleFilter {
        name: params.name,
        category: params.category,
        genre: params.genre,
        year: params.year,
    };

    let titles = TitleStore::new(&state.db).list(&filter, limit, offset).await?;
    let response: Vec<TitleResponse> = titles.into_iter().map(TitleResponse::from).collect();

    Ok(Json(response))
}

/// Read a single title with its computed rating
///
/// GET /api/v1/titles/{title_id}
#[utoipa::path(
    get,
    path = "/api/v1/titles/{title_id}",
    params(("title_id" = i64, Path, description = "Title id")),
    responses(
        (status = 200, description = "Title retrieved successfully", body = TitleResponse),
        (status = 404, description = "Title not found", body = ApiErrorResponse)
    ),
    tag = "titles"
)]
pub async fn get_title(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(title_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    ensure_allowed(&POLICIES, &principal, Action::Retrieve, None)?;

    let title = TitleStore::new(&state.db).get(title_id).await?;
    Ok(Json(TitleResponse::from(title)))
}

/// Create a title
///
/// POST /api/v1/titles
#[utoipa::path(
    post,
    path = "/api/v1/titles",
    request_body = TitleCreateRequest,
    responses(
        (status = 201, description = "Title created successfully", body = TitleResponse),
        (status = 400, description = "Invalid payload", body = ApiErrorResponse),
        (status = 403, description = "Not a superuser", body = ApiErrorResponse)
    ),
    tag = "titles"
)]
pub async fn create_title(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<TitleCreateRequest>,
) -> ApiResult<impl IntoResponse> {
    ensure_allowed(&POLICIES, &principal, Action::Create, None)?;

    let title = TitleStore::new(&state.db)
        .create(NewTitle {
            name: req.name,
            year: req.year,
            description: req.description,
            category: req.category,
            genre: req.genre,
        })
        .await?;

    info!("Title {} created by {}", title.id, principal.id);

    Ok((StatusCode::CREATED, Json(TitleResponse::from(title))))
}

/// Partially update a title
///
/// PATCH /api/v1/titles/{title_id}
#[utoipa::path(
    patch,
    path = "/api/v1/titles/{title_id}",
    params(("title_id" = i64, Path, description = "Title id")),
    request_body = TitleUpdateRequest,
    responses(
        (status = 200, description = "Title updated successfully", body = TitleResponse),
        (status = 404, description = "Title not found", body = ApiErrorResponse),
        (status = 403, description = "Not a superuser", body = ApiErrorResponse)
    ),
    tag = "titles"
)]
pub async fn update_title(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(title_id): Path<i64>,
    Json(req): Json<TitleUpdateRequest>,
) -> ApiResult<impl IntoResponse> {
    ensure_allowed(&POLICIES, &principal, Action::PartialUpdate, None)?;

    let title = TitleStore::new(&state.db)
        .update(
            title_id,
            TitlePatch {
                name: req.name,
                year: req.year,
                description: req.description,
                category: req.category,
                genre: req.genre,
            },
        )
        .await?;

    Ok(Json(TitleResponse::from(title)))
}

/// Delete a title (reviews and their comments cascade)
///
/// DELETE /api/v1/titles/{title_id}
#[utoipa::path(
    delete,
    path = "/api/v1/titles/{title_id}",
    params(("title_id" = i64, Path, description = "Title id")),
    responses(
        (status = 204, description = "Title deleted"),
        (status = 404, description = "Title not found", body = ApiErrorResponse),
        (status = 403, description = "Not a superuser", body = ApiErrorResponse)
    ),
    tag = "titles"
)]
pub async fn delete_title(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(title_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    ensure_allowed(&POLICIES, &principal, Action::Delete, None)?;

    TitleStore::new(&state.db).delete(title_id).await?;

    info!("Title {} deleted by {}", title_id, principal.id);

    Ok(StatusCode::NO_CONTENT)
}
