//! Registration and token handlers.
//!
//! These endpoints are open by design: they are the mechanism that
//! produces an authenticated principal in the first place.

use axum::{extract::State, response::Json};
use tracing::{debug, info};
use user::{token, ExchangeRequest, Handshake, TokenKind, UserStore};

use crate::{
    error::ApiError,
    models::{EmailRequest, MessageResponse, RefreshRequest, TokenRequest, TokenResponse},
    AppState,
};

/// Request a confirmation code for an email address
/// POST /api/v1/auth/email
pub async fn request_code(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    debug!("Confirmation code requested for {}", req.email);

    let handshake = Handshake::new(&state.db);
    let message = handshake.request_code(&state.mailer, &req.email).await?;

    Ok(Json(MessageResponse { message }))
}

/// Exchange a confirmation code for a credential pair
/// POST /api/v1/auth/token
pub async fn obtain_token(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let handshake = Handshake::new(&state.db);
    let (user, pair) = handshake
        .exchange(
            &state.tokens,
            ExchangeRequest {
                username: req.username,
                email: req.email,
                confirmation_code: req.confirmation_code,
                password: req.password,
            },
        )
        .await?;

    info!("Token pair issued for {}", user.username);

    Ok(Json(pair.into()))
}

/// Trade a refresh token for a fresh credential pair
/// POST /api/v1/token/refresh
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user_id = token::verify(&state.tokens, &req.refresh, TokenKind::Refresh)?;

    // The account may have been removed since the refresh token was minted.
    let user = UserStore::new(&state.db)
        .get_by_id(&user_id)
        .await
        .map_err(|_| ApiError::Unauthorized)?;

    let pair = token::issue_pair(&state.tokens, &user.id)?;
    debug!("Refreshed credential pair for {}", user.username);

    Ok(Json(pair.into()))
}
