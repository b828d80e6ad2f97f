//! Registration, sessions and password reset.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum_extra::extract::cookie::CookieJar;

use crate::infra::http::error::ApiError;
use crate::infra::http::identity::{Identity, cleared_session_cookie, session_cookie};
use crate::infra::http::models::{
    ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
};
use crate::infra::http::state::HttpState;

pub async fn register(
    State(state): State<HttpState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.auth.register(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<HttpState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.auth.login(&payload.login, &payload.password).await?;
    let jar = jar.add(session_cookie(outcome.token.clone(), state.cookie_secure));
    Ok((jar, Json(outcome)))
}

pub async fn logout(
    State(state): State<HttpState>,
    identity: Identity,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    state
        .auth
        .logout(&identity.principal, &identity.token)
        .await?;
    Ok((jar.remove(cleared_session_cookie()), StatusCode::NO_CONTENT))
}

pub async fn me(
    State(state): State<HttpState>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.auth.me(&identity.principal).await?))
}

pub async fn forgot_password(
    State(state): State<HttpState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.auth.forgot_password(&payload.email).await?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn reset_password(
    State(state): State<HttpState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .auth
        .reset_password(&payload.token, &payload.password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
