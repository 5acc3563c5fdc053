//! Authentication handlers.

use actix_web::{HttpResponse, web};

use quill_core::services::{REGISTERED_MESSAGE, RegisterInput};
use quill_shared::ApiResponse;
use quill_shared::dto::{AuthResponse, LoginRequest, RegisterRequest};

use super::user_response;
use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// POST /api/auth/register
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let user = state
        .accounts
        .register(RegisterInput {
            username: req.username,
            email: req.email,
            password1: req.password1,
            password2: req.password2,
        })
        .await?;

    Ok(HttpResponse::Created()
        .json(ApiResponse::ok_with_message(user_response(&user), REGISTERED_MESSAGE)))
}

/// POST /api/auth/login
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let outcome = state.accounts.login(&req.username, &req.password).await?;
    tracing::info!(user_id = %outcome.user.id, "User logged in");

    Ok(HttpResponse::Ok().json(AuthResponse {
        access_token: outcome.access_token,
        token_type: "Bearer".to_string(),
        expires_in: outcome.expires_in.max(0) as u64,
    }))
}

/// GET /api/auth/me - Protected route
pub async fn me(identity: Identity, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let view = state.accounts.profile(identity.user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(user_response(&view.user))))
}
