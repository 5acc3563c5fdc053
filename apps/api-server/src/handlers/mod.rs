//! HTTP handlers and route configuration.

mod auth;
mod health;
mod pages;
mod posts;
mod profile;

#[cfg(test)]
mod tests;

use actix_web::web;

use quill_core::Page;
use quill_core::domain::User;
use quill_core::services::PostView;
use quill_shared::dto::{PageResponse, PostResponse, UserResponse};

use crate::middleware::error::{json_error_handler, path_error_handler, query_error_handler};
use crate::state::AppState;

#[cfg(feature = "rate-limit")]
use crate::middleware::rate_limit::RateLimitMiddleware;

/// Register shared data, extractor configs and every route.
pub fn configure(cfg: &mut web::ServiceConfig, state: &AppState, json_limit: usize) {
    cfg.app_data(web::Data::new(state.clone()))
        .app_data(web::Data::new(state.tokens.clone()))
        .app_data(
            web::JsonConfig::default()
                .limit(json_limit)
                .error_handler(json_error_handler),
        )
        .app_data(web::PathConfig::default().error_handler(path_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler));

    configure_routes(cfg, state);
    cfg.default_service(web::to(pages::not_found));
}

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig, state: &AppState) {
    let auth_routes = web::scope("/auth")
        .route("/register", web::post().to(auth::register))
        .route("/login", web::post().to(auth::login));

    #[cfg(feature = "rate-limit")]
    let auth_routes = auth_routes.wrap(RateLimitMiddleware::new(
        state.auth_limiter.clone(),
        state.trust_proxy,
    ));
    #[cfg(not(feature = "rate-limit"))]
    let _ = state;

    cfg.service(
        web::scope("/api")
            // Public routes
            .route("/health", web::get().to(health::health_check))
            .route("/about", web::get().to(pages::about))
            // Auth routes; `/auth/me` is outside the limited scope and must come first
            .route("/auth/me", web::get().to(auth::me))
            .service(auth_routes)
            // Posts
            .service(
                web::resource("/posts")
                    .route(web::get().to(posts::list))
                    .route(web::post().to(posts::create)),
            )
            .service(
                web::resource("/posts/{id}")
                    .route(web::get().to(posts::detail))
                    .route(web::put().to(posts::update))
                    .route(web::delete().to(posts::delete)),
            )
            .route("/users/{username}/posts", web::get().to(posts::user_posts))
            // Profile
            .service(
                web::resource("/profile")
                    .route(web::get().to(profile::show))
                    .route(web::put().to(profile::update)),
            ),
    );
}

pub(crate) fn user_response(user: &User) -> UserResponse {
    UserResponse {
        id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        date_joined: user.created_at,
    }
}

pub(crate) fn post_response(view: PostView) -> PostResponse {
    let url = view.post.absolute_url();
    PostResponse {
        id: view.post.id,
        title: view.post.title,
        content: view.post.content,
        author: view.author,
        date_posted: view.post.date_posted,
        updated_at: view.post.updated_at,
        url,
    }
}

pub(crate) fn page_response(page: Page<PostView>) -> PageResponse<PostResponse> {
    let page = page.map(post_response);
    PageResponse {
        items: page.items,
        page: page.number,
        num_pages: page.num_pages,
        per_page: page.per_page,
        total_items: page.total_items,
        has_next: page.has_next,
        has_previous: page.has_previous,
        next_page: page.next_page_number,
        previous_page: page.previous_page_number,
    }
}
