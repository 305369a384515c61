use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use uuid::Uuid;

use crate::models::messaging_service_model::{FailureStatus, MessagingServiceConfig};

#[derive(Clone, Debug)]
pub struct ServiceConfigService {
    db_pool: Pool<Sqlite>,
}

impl ServiceConfigService {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        ServiceConfigService { db_pool }
    }

    /// Inserta una configuración ya validada por el `ConfigForm` del backend.
    /// Arranca sin estado de fallo.
    pub async fn create_config(
        &self,
        project_id: &str,
        display_name: &str,
        kind: &str,
        settings: &serde_json::Value,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let config = serde_json::to_string(settings)?;

        sqlx::query(
            r#"
            INSERT INTO messaging_service_configs (
                id, project_id, display_name, kind, config, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&id)
        .bind(project_id)
        .bind(display_name)
        .bind(kind)
        .bind(config)
        .bind(now)
        .execute(&self.db_pool)
        .await
        .context("Error creando messaging_service_config")?;

        Ok(id)
    }

    /// `Ok(None)` si no existe.
    pub async fn get_config(&self, id: &str) -> Result<Option<MessagingServiceConfig>> {
        let row = sqlx::query(
            r#"
            SELECT c.id, c.project_id, p.name AS project_name, c.display_name,
                   c.kind, c.config, c.created_at,
                   c.last_failure_timestamp, c.last_failure_error_type,
                   c.last_failure_error_message, c.last_failure_status_code,
                   c.last_failure_response_text, c.last_failure_is_json
            FROM messaging_service_configs c
            JOIN projects p ON p.id = c.project_id
            WHERE c.id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db_pool)
        .await
        .context("Error leyendo messaging_service_config")?;

        row.map(|r| row_to_config(&r)).transpose()
    }
}

fn row_to_config(r: &SqliteRow) -> Result<MessagingServiceConfig> {
    let created_at: String = r.try_get("created_at")?;
    let last_failure_timestamp: Option<String> = r.try_get("last_failure_timestamp")?;

    Ok(MessagingServiceConfig {
        id: r.try_get("id")?,
        project_id: r.try_get("project_id")?,
        project_name: r.try_get("project_name")?,
        display_name: r.try_get("display_name")?,
        kind: r.try_get("kind")?,
        config: r.try_get("config")?,
        created_at: parse_timestamp(&created_at)?,
        failure: FailureStatus {
            last_failure_timestamp: last_failure_timestamp
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
            last_failure_error_type: r.try_get("last_failure_error_type")?,
            last_failure_error_message: r.try_get("last_failure_error_message")?,
            last_failure_status_code: r.try_get("last_failure_status_code")?,
            last_failure_response_text: r.try_get("last_failure_response_text")?,
            last_failure_is_json: r.try_get("last_failure_is_json")?,
        },
    })
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Timestamp inválido: {}", s))?
        .with_timezone(&Utc))
}
