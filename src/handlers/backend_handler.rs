//! handlers/backend_handler.rs
use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::backends::BackendRegistry;

/// GET /api/backends
pub async fn list_backends_endpoint(registry: web::Data<BackendRegistry>) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "backends": registry.kinds() }))
}

/// GET /api/backends/{kind}/form
pub async fn backend_form_endpoint(
    registry: web::Data<BackendRegistry>,
    path: web::Path<String>,
) -> HttpResponse {
    let kind = path.into_inner();

    match registry.form_for(&kind) {
        Ok(form) => HttpResponse::Ok().json(json!({
            "kind": kind,
            "fields": form.fields()
        })),
        Err(e) => HttpResponse::NotFound().json(json!({
            "error": "Backend not found",
            "details": e.to_string()
        })),
    }
}
