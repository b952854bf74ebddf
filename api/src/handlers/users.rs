//! User administration (AdminOnly) and the self-profile surface.

use authz::{Action, AdminOnly, Policy, Principal, Role};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use tracing::info;
use user::{NewUser, UserPatch, UserStore};

use crate::{
    error::{ApiError, ApiResult},
    middleware::{denial, ensure_allowed},
    models::{
        MeUpdateRequest, PaginationParams, UserCreateRequest, UserListParams, UserResponse,
        UserUpdateRequest,
    },
    AppState,
};

const POLICIES: [&dyn Policy; 1] = [&AdminOnly];

fn parse_role(value: Option<String>) -> ApiResult<Option<Role>> {
    match value {
        None => Ok(None),
        Some(raw) => Role::parse(&raw)
            .map(Some)
            .ok_or_else(|| ApiError::Validation(format!("'{raw}' is not a valid role."))),
    }
}

/// GET /api/v1/users
pub async fn list_users(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<UserListParams>,
) -> ApiResult<impl IntoResponse> {
    ensure_allowed(&POLICIES, &principal, Action::List, None)?;

    let pagination = PaginationParams {
        page: params.page,
        page_size: params.page_size,
    };
    let (limit, offset) = pagination.limits();

    let users = UserStore::new(&state.db)
        .list(params.search.as_deref(), limit, offset)
        .await?;

    let response: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();
    Ok(Json(response))
}

/// POST /api/v1/users
pub async fn create_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<UserCreateRequest>,
) -> ApiResult<impl IntoResponse> {
    ensure_allowed(&POLICIES, &principal, Action::Create, None)?;

    let role = parse_role(req.role)?.unwrap_or_default();
    let user = UserStore::new(&state.db)
        .create(NewUser {
            username: req.username,
            email: req.email,
            password: None,
            role,
            bio: req.bio,
            first_name: req.first_name,
            last_name: req.last_name,
        })
        .await?;

    info!("User {} provisioned by {}", user.username, principal.id);

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// GET /api/v1/users/{username}
pub async fn get_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(username): Path<String>,
) -> ApiResult<impl IntoResponse> {
    ensure_allowed(&POLICIES, &principal, Action::Retrieve, None)?;

    let user = UserStore::new(&state.db).get_by_username(&username).await?;
    Ok(Json(UserResponse::from(user)))
}

/// PATCH /api/v1/users/{username}
pub async fn update_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(username): Path<String>,
    Json(req): Json<UserUpdateRequest>,
) -> ApiResult<impl IntoResponse> {
    ensure_allowed(&POLICIES, &principal, Action::PartialUpdate, None)?;

    let user = UserStore::new(&state.db)
        .update(
            &username,
            UserPatch {
                username: req.username,
                email: req.email,
                first_name: req.first_name,
                last_name: req.last_name,
                bio: req.bio,
                role: parse_role(req.role)?,
            },
        )
        .await?;

    Ok(Json(UserResponse::from(user)))
}

/// DELETE /api/v1/users/{username}
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(username): Path<String>,
) -> ApiResult<impl IntoResponse> {
    ensure_allowed(&POLICIES, &principal, Action::Delete, None)?;

    UserStore::new(&state.db).delete(&username).await?;

    info!("User {} deleted by {}", username, principal.id);

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/users/me
pub async fn get_me(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<impl IntoResponse> {
    if !principal.authenticated {
        return Err(denial(&principal));
    }

    let user = UserStore::new(&state.db).get_by_id(&principal.id).await?;
    Ok(Json(UserResponse::from(user)))
}

/// PATCH /api/v1/users/me
///
/// The editable set excludes `role`: promoting an account is an admin
/// operation, not a self-edit.
pub async fn update_me(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<MeUpdateRequest>,
) -> ApiResult<impl IntoResponse> {
    if !principal.authenticated {
        return Err(denial(&principal));
    }

    let store = UserStore::new(&state.db);
    let me = store.get_by_id(&principal.id).await?;
    let updated = store
        .update(
            &me.username,
            UserPatch {
                username: req.username,
                email: req.email,
                first_name: req.first_name,
                last_name: req.last_name,
                bio: req.bio,
                role: None,
            },
        )
        .await?;

    Ok(Json(UserResponse::from(updated)))
}
