//! tests/backend_tests.rs
//! Pruebas de punta a punta: registro de backends -> job asíncrono -> webhook -> estado.

#[cfg(test)]
mod tests {
    use actix_rt::test;
    use sqlx::{Pool, Sqlite};

    use crate::backends::{discord, slack, BackendError, BackendRegistry, COLOR_UNMUTED};
    use crate::models::alert_model::{AlertReason, AlertRequest};
    use crate::models::messaging_service_model::MessagingServiceConfig;
    use crate::services::service_config_service::ServiceConfigService;
    use crate::services::task_runner::{DeliveryJob, TaskRunner};
    use crate::tests::fixtures::{
        delete_service_config, http_client, insert_issue, insert_project, insert_service_config, settings,
        start_mock_webhook, test_db, unreachable_url,
    };

    fn runner(pool: &Pool<Sqlite>) -> TaskRunner {
        crate::build_task_runner(pool.clone(), http_client(), settings())
    }

    async fn load(pool: &Pool<Sqlite>, id: &str) -> MessagingServiceConfig {
        ServiceConfigService::new(pool.clone())
            .get_config(id)
            .await
            .unwrap()
            .expect("config should exist")
    }

    fn alert(issue_id: &str, reason: &str, unmute_reason: Option<&str>) -> AlertRequest {
        AlertRequest {
            issue_id: issue_id.to_string(),
            state_description: "new".to_string(),
            alert_article: "a".to_string(),
            alert_reason: AlertReason::from(reason),
            unmute_reason: unmute_reason.map(str::to_string),
        }
    }

    #[test]
    async fn test_registry_kinds_and_errors() {
        let db = test_db().await;
        let registry = BackendRegistry::with_builtin();
        assert_eq!(registry.kinds(), vec!["discord", "slack"]);
        assert!(matches!(
            registry.form_for("carrier-pigeon"),
            Err(BackendError::UnknownKind(_))
        ));

        let project = insert_project(&db.pool, "backend-api").await;
        let id = insert_service_config(&db.pool, &project, "discord", "https://x.example/").await;
        let mut config = load(&db.pool, &id).await;

        let backend = registry.build(&config, runner(&db.pool)).unwrap();
        assert_eq!(backend.kind(), "discord");
        assert_eq!(backend.config_form().fields()[0].name, "webhook_url");

        config.config = "not json".to_string();
        assert!(matches!(
            registry.build(&config, runner(&db.pool)),
            Err(BackendError::InvalidConfig { .. })
        ));

        config.kind = "carrier-pigeon".to_string();
        assert!(matches!(
            registry.build(&config, runner(&db.pool)),
            Err(BackendError::UnknownKind(_))
        ));
    }

    #[test]
    async fn test_discord_test_message_clears_previous_failure() {
        let db = test_db().await;
        let mock = start_mock_webhook(204, "").await;
        let project = insert_project(&db.pool, "backend-api").await;
        let id = insert_service_config(&db.pool, &project, "discord", &mock.url).await;

        // Fallo previo
        sqlx::query(
            "UPDATE messaging_service_configs SET last_failure_timestamp = ?2, last_failure_error_type = 'Timeout', last_failure_error_message = 'x' WHERE id = ?1",
        )
        .bind(&id)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&db.pool)
        .await
        .unwrap();
        assert!(load(&db.pool, &id).await.has_recent_failure());

        let runner = runner(&db.pool);
        let backend = BackendRegistry::with_builtin()
            .build(&load(&db.pool, &id).await, runner.clone())
            .unwrap();
        backend.send_test_message();
        runner.drain().await;

        let received = mock.received();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].body["content"], "**TEST issue**");
        assert_eq!(received[0].body["embeds"][0]["fields"][0]["value"], "backend-api");
        assert_eq!(received[0].body["embeds"][0]["fields"][1]["value"], "Team chat");

        assert!(load(&db.pool, &id).await.failure.is_cleared());
        mock.stop().await;
    }

    #[test]
    async fn test_discord_alert_rejected_records_failure() {
        let db = test_db().await;
        let mock = start_mock_webhook(400, r#"{"embeds": ["0"]}"#).await;
        let project = insert_project(&db.pool, "backend-api").await;
        let issue = insert_issue(&db.pool, &project, "ZeroDivisionError", "division by zero").await;
        let id = insert_service_config(&db.pool, &project, "discord", &mock.url).await;

        let runner = runner(&db.pool);
        let backend = BackendRegistry::with_builtin()
            .build(&load(&db.pool, &id).await, runner.clone())
            .unwrap();
        backend.send_alert(alert(&issue, "UNMUTED", Some("flaky")));
        runner.drain().await;

        let received = mock.received();
        assert_eq!(received.len(), 1);
        let body = &received[0].body;
        assert_eq!(body["content"], "**UNMUTED issue**");
        assert_eq!(body["embeds"][0]["title"], "ZeroDivisionError: division by zero");
        assert_eq!(body["embeds"][0]["color"], COLOR_UNMUTED);
        assert_eq!(body["embeds"][0]["description"], "flaky");

        let failure = load(&db.pool, &id).await.failure;
        assert_eq!(failure.last_failure_error_type.as_deref(), Some("HttpError"));
        assert_eq!(failure.last_failure_status_code, Some(400));
        assert_eq!(failure.last_failure_is_json, Some(true));
        mock.stop().await;
    }

    #[test]
    async fn test_alert_for_missing_issue_records_unexpected_failure() {
        let db = test_db().await;
        let mock = start_mock_webhook(204, "").await;
        let project = insert_project(&db.pool, "backend-api").await;
        let id = insert_service_config(&db.pool, &project, "discord", &mock.url).await;

        let runner = runner(&db.pool);
        let backend = BackendRegistry::with_builtin()
            .build(&load(&db.pool, &id).await, runner.clone())
            .unwrap();
        backend.send_alert(alert("no-such-issue", "NEW", None));
        runner.drain().await;

        assert!(mock.received().is_empty());
        let failure = load(&db.pool, &id).await.failure;
        assert_eq!(failure.last_failure_error_type.as_deref(), Some("IssueNotFound"));
        assert_eq!(failure.last_failure_status_code, None);
        assert_eq!(failure.last_failure_response_text, None);
        assert_eq!(failure.last_failure_is_json, None);
        mock.stop().await;
    }

    #[test]
    async fn test_config_deleted_before_job_runs() {
        let db = test_db().await;
        let project = insert_project(&db.pool, "backend-api").await;
        let id = insert_service_config(&db.pool, &project, "discord", &unreachable_url()).await;
        let config = load(&db.pool, &id).await;

        let runner = runner(&db.pool);
        let backend = BackendRegistry::with_builtin()
            .build(&config, runner.clone())
            .unwrap();
        delete_service_config(&db.pool, &id).await;

        backend.send_test_message();
        runner.drain().await;

        let gone = ServiceConfigService::new(db.pool.clone())
            .get_config(&id)
            .await
            .unwrap();
        assert!(gone.is_none());
    }

    #[test]
    async fn test_slack_alert_success() {
        let db = test_db().await;
        let mock = start_mock_webhook(200, "ok").await;
        let project = insert_project(&db.pool, "backend-api").await;
        let issue = insert_issue(&db.pool, &project, "KeyError", "'user_id'").await;
        let id = insert_service_config(&db.pool, &project, slack::KIND, &mock.url).await;

        let runner = runner(&db.pool);
        let backend = BackendRegistry::with_builtin()
            .build(&load(&db.pool, &id).await, runner.clone())
            .unwrap();
        assert_eq!(backend.kind(), "slack");
        backend.send_alert(alert(&issue, "REGRESSED", None));
        runner.drain().await;

        let received = mock.received();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].body["attachments"][0]["color"], "#e67e22");
        assert_eq!(
            received[0].body["text"],
            "REGRESSED issue: KeyError: 'user_id'"
        );
        assert!(load(&db.pool, &id).await.failure.is_cleared());
        mock.stop().await;
    }

    #[test]
    async fn test_delivery_job_serializes_to_primitives() {
        let job = DeliveryJob::Discord(discord::DiscordJob::Alert {
            webhook_url: "https://discord.example/api/webhooks/1/abc".to_string(),
            issue_id: "issue-1".to_string(),
            state_description: "new".to_string(),
            alert_article: "a".to_string(),
            alert_reason: AlertReason::New,
            service_config_id: "cfg-1".to_string(),
            unmute_reason: None,
        });

        let raw = serde_json::to_value(&job).unwrap();
        assert_eq!(raw["backend"], "discord");
        assert_eq!(raw["job"]["kind"], "alert");
        assert_eq!(raw["job"]["alert_reason"], "NEW");

        let back: DeliveryJob = serde_json::from_value(raw).unwrap();
        assert_eq!(back.service_config_id(), "cfg-1");
    }
}
