//! handlers/messaging_service_handler.rs
use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::{
    backends::{Backend, BackendRegistry},
    models::{
        alert_model::AlertRequest,
        messaging_service_model::{
            CreateMessagingServiceRequest, CreateMessagingServiceResponse, MessagingServiceConfig,
        },
    },
    services::{service_config_service::ServiceConfigService, task_runner::TaskRunner},
};

/// POST /api/messaging-services
pub async fn create_messaging_service_endpoint(
    body: web::Json<CreateMessagingServiceRequest>,
    config_service: web::Data<ServiceConfigService>,
    registry: web::Data<BackendRegistry>,
) -> HttpResponse {
    let req = body.into_inner();

    let form = match registry.form_for(&req.kind) {
        Ok(f) => f,
        Err(e) => {
            return HttpResponse::BadRequest().json(json!({
                "success": false,
                "error": e.to_string()
            }))
        }
    };

    let settings = match form.clean(&req.config) {
        Ok(s) => s,
        Err(e) => {
            return HttpResponse::BadRequest().json(json!({
                "success": false,
                "error": e.to_string()
            }))
        }
    };

    match config_service
        .create_config(&req.project_id, &req.display_name, &req.kind, &settings)
        .await
    {
        Ok(id) => HttpResponse::Created().json(CreateMessagingServiceResponse {
            id,
            message: "Messaging service created".to_string(),
        }),
        Err(e) => {
            log::error!("(create_messaging_service_endpoint) {:?}", e);
            HttpResponse::BadRequest().json(json!({
                "success": false,
                "error": format!("{:#}", e)
            }))
        }
    }
}

/// GET /api/messaging-services/{id}
pub async fn get_messaging_service_endpoint(
    config_service: web::Data<ServiceConfigService>,
    path: web::Path<String>,
) -> HttpResponse {
    let id = path.into_inner();

    match config_service.get_config(&id).await {
        Ok(Some(config)) => HttpResponse::Ok().json(json!({
            "service": config,
            "has_recent_failure": config.has_recent_failure()
        })),
        Ok(None) => not_found(&id),
        Err(e) => internal_error(e),
    }
}

/// GET /api/messaging-services/{id}/form
/// Campos del formulario del backend, precargados con la configuración guardada.
pub async fn get_messaging_service_form_endpoint(
    config_service: web::Data<ServiceConfigService>,
    registry: web::Data<BackendRegistry>,
    runner: web::Data<TaskRunner>,
    path: web::Path<String>,
) -> HttpResponse {
    let id = path.into_inner();

    let config = match load_config(&id, &config_service).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let backend = match build_backend(&config, &registry, &runner) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    let stored: serde_json::Value = match serde_json::from_str(&config.config) {
        Ok(v) => v,
        Err(e) => {
            log::error!("(get_messaging_service_form_endpoint) service_config_id={}: {}", id, e);
            return HttpResponse::UnprocessableEntity().json(json!({
                "success": false,
                "error": e.to_string()
            }));
        }
    };

    let form = backend.config_form();
    HttpResponse::Ok().json(json!({
        "service_config_id": id,
        "kind": backend.kind(),
        "fields": form.fields(),
        "initial": form.initial(&stored)
    }))
}

/// POST /api/messaging-services/{id}/test
pub async fn send_test_message_endpoint(
    config_service: web::Data<ServiceConfigService>,
    registry: web::Data<BackendRegistry>,
    runner: web::Data<TaskRunner>,
    path: web::Path<String>,
) -> HttpResponse {
    let id = path.into_inner();

    match load_backend(&id, &config_service, &registry, &runner).await {
        Ok(backend) => {
            backend.send_test_message();
            accepted(&id, "Test message queued")
        }
        Err(resp) => resp,
    }
}

/// POST /api/messaging-services/{id}/alerts
pub async fn send_alert_endpoint(
    config_service: web::Data<ServiceConfigService>,
    registry: web::Data<BackendRegistry>,
    runner: web::Data<TaskRunner>,
    path: web::Path<String>,
    body: web::Json<AlertRequest>,
) -> HttpResponse {
    let id = path.into_inner();

    match load_backend(&id, &config_service, &registry, &runner).await {
        Ok(backend) => {
            backend.send_alert(body.into_inner());
            accepted(&id, "Alert queued")
        }
        Err(resp) => resp,
    }
}

/// Lee la configuración y construye su backend; cualquier fallo ya sale como respuesta.
async fn load_backend(
    id: &str,
    config_service: &ServiceConfigService,
    registry: &BackendRegistry,
    runner: &TaskRunner,
) -> Result<Box<dyn Backend>, HttpResponse> {
    let config = load_config(id, config_service).await?;
    build_backend(&config, registry, runner)
}

async fn load_config(
    id: &str,
    config_service: &ServiceConfigService,
) -> Result<MessagingServiceConfig, HttpResponse> {
    match config_service.get_config(id).await {
        Ok(Some(c)) => Ok(c),
        Ok(None) => Err(not_found(id)),
        Err(e) => Err(internal_error(e)),
    }
}

fn build_backend(
    config: &MessagingServiceConfig,
    registry: &BackendRegistry,
    runner: &TaskRunner,
) -> Result<Box<dyn Backend>, HttpResponse> {
    registry.build(config, runner.clone()).map_err(|e| {
        log::error!("(build_backend) service_config_id={}: {}", config.id, e);
        HttpResponse::UnprocessableEntity().json(json!({
            "success": false,
            "error": e.to_string()
        }))
    })
}

fn accepted(id: &str, message: &str) -> HttpResponse {
    HttpResponse::Accepted().json(json!({
        "success": true,
        "service_config_id": id,
        "message": message
    }))
}

fn not_found(id: &str) -> HttpResponse {
    HttpResponse::NotFound().json(json!({
        "error": "Messaging service not found",
        "details": id
    }))
}

fn internal_error(e: anyhow::Error) -> HttpResponse {
    log::error!("Internal error: {:?}", e);
    HttpResponse::InternalServerError().json(json!({
        "error": "Internal server error",
        "details": format!("{:?}", e)
    }))
}
