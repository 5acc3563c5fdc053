//! Profile page handlers.

use actix_web::{HttpResponse, web};

use quill_core::services::{AvatarUpload, PROFILE_UPDATED_MESSAGE, ProfileUpdate, ProfileView};
use quill_shared::ApiResponse;
use quill_shared::dto::{ProfileResponse, ProfileUpdateRequest};

use super::user_response;
use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

fn profile_response(view: ProfileView) -> ProfileResponse {
    ProfileResponse {
        user: user_response(&view.user),
        image: view.profile.image,
        image_url: view.image_url,
    }
}

/// GET /api/profile
pub async fn show(identity: Identity, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let view = state.accounts.profile(identity.user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(profile_response(view))))
}

/// PUT /api/profile
pub async fn update(
    identity: Identity,
    state: web::Data<AppState>,
    body: web::Json<ProfileUpdateRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let view = state
        .accounts
        .update_profile(
            identity.user_id,
            ProfileUpdate {
                username: req.username,
                email: req.email,
                image: req.image.map(|image| AvatarUpload {
                    content_type: image.content_type,
                    data: image.data,
                }),
            },
        )
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(
        profile_response(view),
        PROFILE_UPDATED_MESSAGE,
    )))
}
