//! tests/handler_tests.rs
//! Pruebas de los endpoints HTTP con `actix_web::test`.

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, web, App};
    use serde_json::{json, Value};

    use crate::app;
    use crate::backends::BackendRegistry;
    use crate::services::service_config_service::ServiceConfigService;
    use crate::tests::fixtures::{
        http_client, insert_project, insert_service_config, settings, test_db, unreachable_url,
    };

    #[actix_rt::test]
    async fn test_messaging_service_endpoints() {
        let db = test_db().await;
        let project = insert_project(&db.pool, "backend-api").await;
        let runner = crate::build_task_runner(db.pool.clone(), http_client(), settings());

        let srv = test::init_service(
            App::new()
                .app_data(web::Data::new(ServiceConfigService::new(db.pool.clone())))
                .app_data(web::Data::new(BackendRegistry::with_builtin()))
                .app_data(web::Data::new(runner.clone()))
                .configure(app::init_app),
        )
        .await;

        // Formulario inválido -> 400
        let req = test::TestRequest::post()
            .uri("/api/messaging-services")
            .set_json(json!({
                "project_id": project,
                "display_name": "Team chat",
                "kind": "discord",
                "config": { "webhook_url": "nope" }
            }))
            .to_request();
        let resp = test::call_service(&srv, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        // Backend desconocido -> 400
        let req = test::TestRequest::post()
            .uri("/api/messaging-services")
            .set_json(json!({
                "project_id": project,
                "display_name": "Team chat",
                "kind": "carrier-pigeon",
                "config": {}
            }))
            .to_request();
        let resp = test::call_service(&srv, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        // Alta válida -> 201
        let req = test::TestRequest::post()
            .uri("/api/messaging-services")
            .set_json(json!({
                "project_id": project,
                "display_name": "Team chat",
                "kind": "discord",
                "config": { "webhook_url": unreachable_url() }
            }))
            .to_request();
        let resp = test::call_service(&srv, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        let id = created["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::get()
            .uri(&format!("/api/messaging-services/{}", id))
            .to_request();
        let body: Value = test::call_and_read_body_json(&srv, req).await;
        assert_eq!(body["has_recent_failure"], false);
        assert_eq!(body["service"]["project_name"], "backend-api");

        // Mensaje de prueba -> 202; el envío falla en segundo plano
        let req = test::TestRequest::post()
            .uri(&format!("/api/messaging-services/{}/test", id))
            .to_request();
        let resp = test::call_service(&srv, req).await;
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        runner.drain().await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/messaging-services/{}", id))
            .to_request();
        let body: Value = test::call_and_read_body_json(&srv, req).await;
        assert_eq!(body["has_recent_failure"], true);
        assert_eq!(body["service"]["last_failure_error_type"], "ConnectionError");
        assert_eq!(body["service"]["last_failure_status_code"], Value::Null);

        // Alerta -> 202
        let req = test::TestRequest::post()
            .uri(&format!("/api/messaging-services/{}/alerts", id))
            .set_json(json!({
                "issue_id": "missing",
                "state_description": "new",
                "alert_article": "a",
                "alert_reason": "NEW"
            }))
            .to_request();
        let resp = test::call_service(&srv, req).await;
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        runner.drain().await;

        // Configuración inexistente -> 404
        let req = test::TestRequest::post()
            .uri("/api/messaging-services/does-not-exist/test")
            .to_request();
        let resp = test::call_service(&srv, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_rt::test]
    async fn test_backend_form_endpoint() {
        let srv = test::init_service(
            App::new()
                .app_data(web::Data::new(BackendRegistry::with_builtin()))
                .configure(app::init_app),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/backends/slack/form")
            .to_request();
        let body: Value = test::call_and_read_body_json(&srv, req).await;
        assert_eq!(body["fields"][0]["name"], "webhook_url");
        assert_eq!(body["fields"][0]["kind"], "url");

        let req = test::TestRequest::get()
            .uri("/api/backends/telegram/form")
            .to_request();
        let resp = test::call_service(&srv, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get().uri("/api/backends").to_request();
        let body: Value = test::call_and_read_body_json(&srv, req).await;
        assert_eq!(body["backends"], json!(["discord", "slack"]));
    }

    #[actix_rt::test]
    async fn test_messaging_service_form_endpoint() {
        let db = test_db().await;
        let project = insert_project(&db.pool, "backend-api").await;
        let id = insert_service_config(&db.pool, &project, "slack", "https://hooks.example.com/T1").await;
        let broken = ServiceConfigService::new(db.pool.clone())
            .create_config(&project, "Broken", "slack", &json!("not-an-object"))
            .await
            .unwrap();
        let runner = crate::build_task_runner(db.pool.clone(), http_client(), settings());

        let srv = test::init_service(
            App::new()
                .app_data(web::Data::new(ServiceConfigService::new(db.pool.clone())))
                .app_data(web::Data::new(BackendRegistry::with_builtin()))
                .app_data(web::Data::new(runner))
                .configure(app::init_app),
        )
        .await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/messaging-services/{}/form", id))
            .to_request();
        let body: Value = test::call_and_read_body_json(&srv, req).await;
        assert_eq!(body["kind"], "slack");
        assert_eq!(body["fields"][0]["name"], "webhook_url");
        assert_eq!(body["initial"]["webhook_url"], "https://hooks.example.com/T1");

        // Configuración guardada que el backend no sabe leer -> 422
        let req = test::TestRequest::get()
            .uri(&format!("/api/messaging-services/{}/form", broken))
            .to_request();
        let resp = test::call_service(&srv, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let req = test::TestRequest::get()
            .uri("/api/messaging-services/does-not-exist/form")
            .to_request();
        let resp = test::call_service(&srv, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
