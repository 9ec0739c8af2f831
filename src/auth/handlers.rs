use axum::{
    extract::{FromRef, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            CompleteResetRequest, LoginRequest, LoginResponse, MessageResponse, PublicAccount,
            RefreshRequest, RegisterRequest, RegisterResponse, ResetRequest, TokenPair,
            VerifyEmailRequest,
        },
        error::{AuthError, AuthResult},
        extractors::AuthUser,
        jwt::JwtKeys,
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/verify_email", get(verify_email_query).post(verify_email_body))
        .route("/users/login", post(login))
        .route(
            "/users/reset-password",
            post(request_password_reset).put(complete_password_reset),
        )
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AuthResult<(StatusCode, Json<RegisterResponse>)> {
    let registration = state
        .accounts
        .register(
            &payload.email,
            &payload.password,
            payload.first_name,
            payload.last_name,
        )
        .await?;

    let account = registration.account;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: account.id,
            email: account.email,
            first_name: account.first_name,
            verification_token: (!state.config.is_production())
                .then_some(registration.verification_token),
        }),
    ))
}

#[instrument(skip(state, params))]
pub async fn verify_email_query(
    State(state): State<AppState>,
    Query(params): Query<VerifyEmailRequest>,
) -> AuthResult<Json<MessageResponse>> {
    state.accounts.verify_email(&params.email, &params.token).await?;
    Ok(Json(MessageResponse::new("email verified")))
}

#[instrument(skip(state, payload))]
pub async fn verify_email_body(
    State(state): State<AppState>,
    Json(payload): Json<VerifyEmailRequest>,
) -> AuthResult<Json<MessageResponse>> {
    state
        .accounts
        .verify_email(&payload.email, &payload.token)
        .await?;
    Ok(Json(MessageResponse::new("email verified")))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AuthResult<Json<LoginResponse>> {
    let user = state
        .accounts
        .login(&payload.email, &payload.password)
        .await?;

    let keys = JwtKeys::from_ref(&state);
    Ok(Json(LoginResponse {
        access_token: keys.sign_access(user.id)?,
        refresh_token: keys.sign_refresh(user.id)?,
        user,
    }))
}

#[instrument(skip(state, payload))]
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(payload): Json<ResetRequest>,
) -> AuthResult<Json<MessageResponse>> {
    let token = state.accounts.request_password_reset(&payload.email).await?;

    let mut response = MessageResponse::new("if account exists, reset instructions sent");
    if !state.config.is_production() {
        response.token = token;
    }
    Ok(Json(response))
}

#[instrument(skip(state, payload))]
pub async fn complete_password_reset(
    State(state): State<AppState>,
    Json(payload): Json<CompleteResetRequest>,
) -> AuthResult<Json<MessageResponse>> {
    state
        .accounts
        .complete_password_reset(&payload.email, &payload.token, &payload.password)
        .await?;
    Ok(Json(MessageResponse::new("password reset successfully")))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AuthResult<Json<TokenPair>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|_| AuthError::InvalidToken)?;

    // refuse tokens of accounts that no longer exist
    state.accounts.find_public(claims.sub).await?;

    Ok(Json(TokenPair {
        access_token: keys.sign_access(claims.sub)?,
        refresh_token: keys.sign_refresh(claims.sub)?,
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AuthResult<Json<PublicAccount>> {
    Ok(Json(state.accounts.find_public(user_id).await?))
}
