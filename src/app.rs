//! app.rs
use crate::handlers::{backend_handler, messaging_service_handler};
use actix_web::web;

pub fn init_app(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(
                web::scope("/messaging-services")
                    .route(
                        "",
                        web::post().to(messaging_service_handler::create_messaging_service_endpoint),
                    )
                    .route(
                        "/{id}",
                        web::get().to(messaging_service_handler::get_messaging_service_endpoint),
                    )
                    .route(
                        "/{id}/form",
                        web::get().to(messaging_service_handler::get_messaging_service_form_endpoint),
                    )
                    .route(
                        "/{id}/test",
                        web::post().to(messaging_service_handler::send_test_message_endpoint),
                    )
                    .route(
                        "/{id}/alerts",
                        web::post().to(messaging_service_handler::send_alert_endpoint),
                    ),
            )
            .service(
                web::scope("/backends")
                    .route("", web::get().to(backend_handler::list_backends_endpoint))
                    .route(
                        "/{kind}/form",
                        web::get().to(backend_handler::backend_form_endpoint),
                    ),
            ),
    );
}
