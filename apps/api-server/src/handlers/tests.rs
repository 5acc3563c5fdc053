use actix_web::http::{StatusCode, header};
use actix_web::{App, HttpResponse, test, web};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use tempfile::TempDir;

use crate::config::AppConfig;
use crate::middleware::error::{AppError, error_handlers};
use crate::observability::{REQUEST_ID_HEADER, RequestIdMiddleware};
use crate::state::AppState;

const PASSWORD: &str = "correct-horse-battery";

struct TestEnv {
    state: AppState,
    json_limit: usize,
    media: TempDir,
}

fn test_env() -> TestEnv {
    test_env_with(|_| {})
}

fn test_env_with(adjust: impl FnOnce(&mut AppConfig)) -> TestEnv {
    let media = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.media.root = media.path().to_path_buf();
    adjust(&mut config);

    TestEnv {
        state: AppState::in_memory(&config),
        json_limit: config.json_limit(),
        media,
    }
}

macro_rules! init_app {
    ($env:expr) => {
        test::init_service(
            App::new()
                .wrap(error_handlers())
                .wrap(RequestIdMiddleware)
                .configure(|cfg| super::configure(cfg, &$env.state, $env.json_limit)),
        )
        .await
    };
}

/// Registers `$username` and returns a bearer token for it.
macro_rules! login {
    ($app:expr, $username:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(register_body($username))
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "username": $username, "password": PASSWORD }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&$app, req).await;
        format!("Bearer {}", body["access_token"].as_str().unwrap())
    }};
}

macro_rules! create_post {
    ($app:expr, $token:expr, $title:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/posts")
            .insert_header((header::AUTHORIZATION, $token.as_str()))
            .set_json(json!({ "title": $title, "content": "Some content" }))
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        body["data"]["id"].as_str().unwrap().to_string()
    }};
}

fn register_body(username: &str) -> Value {
    json!({
        "username": username,
        "email": format!("{username}@example.com"),
        "password1": PASSWORD,
        "password2": PASSWORD,
    })
}

#[actix_web::test]
async fn test_health_and_about() {
    let env = test_env();
    let app = init_app!(env);

    let req = test::TestRequest::get().uri("/api/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "ok");

    let req = test::TestRequest::get().uri("/api/about").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["title"], "About");
}

#[actix_web::test]
async fn test_register_login_and_me() {
    let env = test_env();
    let app = init_app!(env);

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(register_body("jane"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body["message"],
        "Your account has been created. You are now able to log in."
    );
    assert_eq!(body["data"]["username"], "jane");
    assert!(body["data"].get("password_hash").is_none());

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "username": "jane", "password": PASSWORD }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["token_type"], "Bearer");
    let token = format!("Bearer {}", body["access_token"].as_str().unwrap());

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header((header::AUTHORIZATION, token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["username"], "jane");
    assert_eq!(body["data"]["email"], "jane@example.com");
}

#[actix_web::test]
async fn test_register_reports_field_errors() {
    let env = test_env();
    let app = init_app!(env);

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "username": "jane",
            "email": "jane@example.com",
            "password1": PASSWORD,
            "password2": "something-else-entirely",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = test::read_body_json(resp).await;
    assert!(body["errors"]["password2"].is_array());
}

#[actix_web::test]
async fn test_login_rejects_bad_password() {
    let env = test_env();
    let app = init_app!(env);
    login!(app, "jane");

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "username": "jane", "password": "wrong-password" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_create_requires_login() {
    let env = test_env();
    let app = init_app!(env);

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .set_json(json!({ "title": "Hello", "content": "World" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_create_and_read_post() {
    let env = test_env();
    let app = init_app!(env);
    let token = login!(app, "jane");

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .insert_header((header::AUTHORIZATION, token.as_str()))
        .set_json(json!({ "title": "Hello", "content": "World" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let location = resp
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["url"], location.as_str());

    let req = test::TestRequest::get().uri(&location).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["title"], "Hello");
    assert_eq!(body["data"]["author"], "jane");
}

#[actix_web::test]
async fn test_blank_title_is_rejected() {
    let env = test_env();
    let app = init_app!(env);
    let token = login!(app, "jane");

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .insert_header((header::AUTHORIZATION, token.as_str()))
        .set_json(json!({ "title": "", "content": "World" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = test::read_body_json(resp).await;
    assert!(body["errors"]["title"].is_array());
}

#[actix_web::test]
async fn test_only_author_may_edit_or_delete() {
    let env = test_env();
    let app = init_app!(env);
    let jane = login!(app, "jane");
    let bob = login!(app, "bob");
    let id = create_post!(app, jane, "Mine");
    let uri = format!("/api/posts/{id}");

    let req = test::TestRequest::put()
        .uri(&uri)
        .insert_header((header::AUTHORIZATION, bob.as_str()))
        .set_json(json!({ "title": "Hijacked", "content": "x" }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );

    let req = test::TestRequest::delete()
        .uri(&uri)
        .insert_header((header::AUTHORIZATION, bob.as_str()))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );

    let req = test::TestRequest::put()
        .uri(&uri)
        .insert_header((header::AUTHORIZATION, jane.as_str()))
        .set_json(json!({ "title": "Edited", "content": "New content" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["title"], "Edited");

    let req = test::TestRequest::delete()
        .uri(&uri)
        .insert_header((header::AUTHORIZATION, jane.as_str()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["redirect"], "/");

    let req = test::TestRequest::get().uri(&uri).to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[actix_web::test]
async fn test_post_list_pagination() {
    let env = test_env();
    let app = init_app!(env);
    let token = login!(app, "jane");
    for i in 0..6 {
        create_post!(app, token, format!("Post {i}"));
    }

    let req = test::TestRequest::get().uri("/api/posts").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let page = &body["data"];
    assert_eq!(page["items"].as_array().unwrap().len(), 5);
    assert_eq!(page["items"][0]["title"], "Post 5");
    assert_eq!(page["num_pages"], 2);
    assert_eq!(page["has_next"], true);
    assert_eq!(page["next_page"], 2);

    let req = test::TestRequest::get()
        .uri("/api/posts?page=last")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["page"], 2);
    assert_eq!(body["data"]["items"][0]["title"], "Post 0");
    assert_eq!(body["data"]["has_previous"], true);

    for bad in ["3", "0", "abc"] {
        let req = test::TestRequest::get()
            .uri(&format!("/api/posts?page={bad}"))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND,
            "page={bad}"
        );
    }
}

#[actix_web::test]
async fn test_empty_list_has_one_page() {
    let env = test_env();
    let app = init_app!(env);

    let req = test::TestRequest::get().uri("/api/posts").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 0);
    assert_eq!(body["data"]["page"], 1);
}

#[actix_web::test]
async fn test_user_posts_filters_by_author() {
    let env = test_env();
    let app = init_app!(env);
    let jane = login!(app, "jane");
    let bob = login!(app, "bob");
    create_post!(app, jane, "By jane");
    create_post!(app, bob, "By bob");

    let req = test::TestRequest::get()
        .uri("/api/users/bob/posts")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["author"], "bob");

    let req = test::TestRequest::get()
        .uri("/api/users/nobody/posts")
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[actix_web::test]
async fn test_unknown_route_returns_problem_json() {
    let env = test_env();
    let app = init_app!(env);

    let req = test::TestRequest::get()
        .uri("/api/nothing-here")
        .insert_header((REQUEST_ID_HEADER, "trace-me-42"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        resp.headers().get(REQUEST_ID_HEADER).unwrap(),
        "trace-me-42"
    );

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], 404);
    assert_eq!(body["instance"], "/api/nothing-here");
    assert_eq!(body["request_id"], "trace-me-42");
}

#[actix_web::test]
async fn test_malformed_post_id_is_not_found() {
    let env = test_env();
    let app = init_app!(env);

    let req = test::TestRequest::get()
        .uri("/api/posts/not-a-uuid")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(resp.headers().contains_key(REQUEST_ID_HEADER));
}

#[actix_web::test]
async fn test_profile_update_with_avatar() {
    let env = test_env();
    let app = init_app!(env);
    let token = login!(app, "jane");

    let req = test::TestRequest::get()
        .uri("/api/profile")
        .insert_header((header::AUTHORIZATION, token.as_str()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["image"], "default.jpg");

    let png = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01";
    let req = test::TestRequest::put()
        .uri("/api/profile")
        .insert_header((header::AUTHORIZATION, token.as_str()))
        .set_json(json!({
            "username": "jane",
            "email": "jane@blog.example",
            "image": {
                "content_type": "image/png",
                "data": format!("data:image/png;base64,{}", STANDARD.encode(png)),
            },
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Your account has been updated!");
    assert_eq!(body["data"]["user"]["email"], "jane@blog.example");

    let image = body["data"]["image"].as_str().unwrap();
    assert!(image.starts_with("profile_pics/"), "{image}");
    assert!(env.media.path().join(image).exists());
}

#[actix_web::test]
async fn test_profile_requires_login() {
    let env = test_env();
    let app = init_app!(env);

    let req = test::TestRequest::get().uri("/api/profile").to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[actix_web::test]
async fn test_every_not_found_carries_request_id() {
    let env = test_env();
    let app = init_app!(env);

    let missing_post = format!("/api/posts/{}", uuid::Uuid::new_v4());
    for uri in [
        missing_post.as_str(),
        "/api/posts/not-a-uuid",
        "/api/posts?page=9",
        "/api/users/nobody/posts",
    ] {
        let req = test::TestRequest::get()
            .uri(uri)
            .insert_header((REQUEST_ID_HEADER, "trace-me-43"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["request_id"], "trace-me-43", "{uri}");
        assert_eq!(body["status"], 404, "{uri}");
    }

    let req = test::TestRequest::get().uri(&missing_post).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["detail"].as_str().unwrap().contains("post"));
    assert_eq!(body["instance"], missing_post.as_str());
}

#[actix_web::test]
async fn test_internal_error_hides_details() {
    let app = test::init_service(
        App::new()
            .wrap(error_handlers())
            .wrap(RequestIdMiddleware)
            .route(
                "/boom",
                web::get().to(|| async {
                    Err::<HttpResponse, _>(AppError::Internal(
                        "connection refused by 10.0.0.5".to_string(),
                    ))
                }),
            ),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/boom")
        .insert_header((REQUEST_ID_HEADER, "trace-me-500"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let bytes = test::read_body(resp).await;
    assert!(!String::from_utf8_lossy(&bytes).contains("10.0.0.5"));

    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], 500);
    assert_eq!(body["request_id"], "trace-me-500");
    assert_eq!(body["instance"], "/boom");
    assert!(body.get("detail").is_none());
}

#[cfg(feature = "rate-limit")]
#[actix_web::test]
async fn test_auth_rate_limit_keys_on_peer_address() {
    let env = test_env_with(|config| {
        config.rate_limit.max_requests = 2;
        config.rate_limit.window = std::time::Duration::from_secs(60);
    });
    let app = init_app!(env);
    let peer: std::net::SocketAddr = "203.0.113.9:41000".parse().unwrap();

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .peer_addr(peer)
        .set_json(register_body("jane"))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::CREATED
    );

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .peer_addr(peer)
        .insert_header(("X-Forwarded-For", "198.51.100.1"))
        .set_json(json!({ "username": "jane", "password": PASSWORD }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let token = format!("Bearer {}", body["access_token"].as_str().unwrap());

    // A fresh forwarded address does not buy a fresh budget.
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .peer_addr(peer)
        .insert_header(("X-Forwarded-For", "198.51.100.2"))
        .set_json(json!({ "username": "jane", "password": PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = resp
        .headers()
        .get(header::RETRY_AFTER)
        .unwrap()
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after >= 1);

    // Reading the current user is not limited.
    for _ in 0..3 {
        let req = test::TestRequest::get()
            .uri("/api/auth/me")
            .peer_addr(peer)
            .insert_header((header::AUTHORIZATION, token.as_str()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    // Another client still gets through.
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .peer_addr("203.0.113.10:41000".parse().unwrap())
        .set_json(json!({ "username": "jane", "password": PASSWORD }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}
