use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod server;


// Re-export server functions for convenience
pub use server::{spawn_server, start_server, ApiConfig};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<database::Database>,
    pub tokens: user::TokenConfig,
    pub mailer: user::Mailer,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::titles::list_titles,
        handlers::titles::get_title,
        handlers::titles::create_title,
        handlers::titles::update_title,
        handlers::titles::delete_title,
        handlers::tags::list_categories,
        handlers::tags::create_category,
        handlers::tags::delete_category,
        handlers::tags::list_genres,
        handlers::tags::create_genre,
        handlers::tags::delete_genre,
        handlers::health::health_check,
    ),
    components(
        schemas(
            models::TitleResponse,
            models::TitleCreateRequest,
            models::TitleUpdateRequest,
            models::TagResponse,
            models::TagRequest,
            models::HealthResponse,
            models::DatabaseHealth,
            error::ApiErrorResponse,
            error::ErrorDetail,
        )
    ),
    tags(
        (name = "titles", description = "Title catalog operations"),
        (name = "categories", description = "Category operations"),
        (name = "genres", description = "Genre operations"),
        (name = "health", description = "Health check endpoints"),
    ),
    info(
        title = "Folio API",
        version = "1.0.0",
        description = "Content cataloguing and review API",
    ),
)]
pub struct ApiDoc;

/// Create the main API router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    // API v1 routes
    let api_v1 = Router::new()
        // Registration and tokens
        .route("/auth/email", post(handlers::auth::request_code))
        .route("/auth/token", post(handlers::auth::obtain_token))
        .route("/token/refresh", post(handlers::auth::refresh_token))
        // Title catalog
        .route(
            "/titles",
            get(handlers::titles::list_titles).post(handlers::titles::create_title),
        )
        .route(
            "/titles/:title_id",
            get(handlers::titles::get_title)
                .patch(handlers::titles::update_title)
                .delete(handlers::titles::delete_title),
        )
        // Reviews, nested under their title
        .route(
            "/titles/:title_id/reviews",
            get(handlers::reviews::list_reviews).post(handlers::reviews::create_review),
        )
        .route(
            "/titles/:title_id/reviews/:review_id",
            get(handlers::reviews::get_review)
                .patch(handlers::reviews::update_review)
                .delete(handlers::reviews::delete_review),
        )
        // Comments, nested under their review
        .route(
            "/titles/:title_id/reviews/:review_id/comments",
            get(handlers::comments::list_comments).post(handlers::comments::create_comment),
        )
        .route(
            "/titles/:title_id/reviews/:review_id/comments/:comment_id",
            get(handlers::comments::get_comment)
                .patch(handlers::comments::update_comment)
                .delete(handlers::comments::delete_comment),
        )
        // Tagging entities
        .route(
            "/categories",
            get(handlers::tags::list_categories).post(handlers::tags::create_category),
        )
        .route("/categories/:slug", delete(handlers::tags::delete_category))
        .route(
            "/genres",
            get(handlers::tags::list_genres).post(handlers::tags::create_genre),
        )
        .route("/genres/:slug", delete(handlers::tags::delete_genre))
        // Self profile before the username catch-all
        .route(
            "/users/me",
            get(handlers::users::get_me).patch(handlers::users::update_me),
        )
        // User administration
        .route(
            "/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            "/users/:username",
            get(handlers::users::get_user)
                .patch(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        // Health check
        .route("/health", get(handlers::health::health_check))
        // Every request gets a resolved principal
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::principal_middleware,
        ));

    // Main router
    Router::new()
        .nest("/api/v1", api_v1)
        .merge(SwaggerUi::new("/api/v1/swagger").url("/api/v1/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
