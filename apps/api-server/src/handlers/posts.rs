//! Post handlers: listings, detail, and author-only writes.

use actix_web::{HttpResponse, http::header, web};
use serde::Deserialize;
use uuid::Uuid;

use quill_core::services::PostInput;
use quill_shared::ApiResponse;
use quill_shared::dto::{DeleteResponse, PostRequest};

use super::{page_response, post_response};
use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    /// Page number, or `last`.
    pub page: Option<String>,
}

fn post_input(req: PostRequest) -> PostInput {
    PostInput {
        title: req.title,
        content: req.content,
    }
}

/// GET /api/posts?page=
pub async fn list(
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let page = state.posts.list(query.page.as_deref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(page_response(page))))
}

/// GET /api/users/{username}/posts?page=
pub async fn user_posts(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let page = state
        .posts
        .list_by_author(&path.into_inner(), query.page.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(page_response(page))))
}

/// GET /api/posts/{id}
pub async fn detail(state: web::Data<AppState>, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let view = state.posts.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(post_response(view))))
}

/// POST /api/posts
pub async fn create(
    identity: Identity,
    state: web::Data<AppState>,
    body: web::Json<PostRequest>,
) -> AppResult<HttpResponse> {
    let view = state
        .posts
        .create(identity.user_id, post_input(body.into_inner()))
        .await?;

    let location = view.post.absolute_url();
    Ok(HttpResponse::Created()
        .insert_header((header::LOCATION, location))
        .json(ApiResponse::ok(post_response(view))))
}

/// PUT /api/posts/{id}
pub async fn update(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<PostRequest>,
) -> AppResult<HttpResponse> {
    let view = state
        .posts
        .update(identity.user_id, path.into_inner(), post_input(body.into_inner()))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(post_response(view))))
}

/// DELETE /api/posts/{id}
pub async fn delete(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state
        .posts
        .delete(identity.user_id, path.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(
        DeleteResponse {
            redirect: "/".to_string(),
        },
        "Post deleted.",
    )))
}
