//! Static pages and the fallback 404.

use actix_web::{HttpRequest, HttpResponse};

use quill_shared::ErrorResponse;
use quill_shared::dto::AboutResponse;

use crate::observability::RequestId;

/// GET /api/about
pub async fn about() -> HttpResponse {
    HttpResponse::Ok().json(AboutResponse {
        title: "About".to_string(),
    })
}

/// Fallback for every unmatched route.
pub async fn not_found(req: HttpRequest, request_id: RequestId) -> HttpResponse {
    tracing::debug!(method = %req.method(), path = %req.path(), "No route matched");

    HttpResponse::NotFound().json(
        ErrorResponse::not_found("The requested resource does not exist.")
            .with_instance(req.path())
            .with_request_id(request_id.as_str()),
    )
}
