//! services/status_recorder.rs
//! Guarda el resultado del último intento de envío en `messaging_service_configs`.
//!
//! Cada escritura corre dentro de un `BEGIN IMMEDIATE`: el lock de escritura se
//! toma al abrir la transacción, así dos envíos concurrentes sobre la misma
//! configuración nunca dejan una mezcla de campos (medio limpio, medio fallo).
//! La llamada HTTP ocurre antes, fuera de la transacción.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::pool::PoolConnection;
use sqlx::{Pool, Sqlite, SqliteConnection};

use crate::models::messaging_service_model::FailureStatus;
use crate::services::delivery_service::DeliveryError;

/// Tope de caracteres guardados del body de la respuesta.
pub const MAX_RESPONSE_TEXT_CHARS: usize = 2000;

#[derive(Clone, Debug)]
pub struct StatusRecorder {
    db_pool: Pool<Sqlite>,
}

impl StatusRecorder {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        StatusRecorder { db_pool }
    }

    /// Limpia los campos de fallo. Devuelve `false` si la fila ya no existe.
    pub async fn record_success(&self, service_config_id: &str) -> Result<bool> {
        self.write_in_immediate_tx(service_config_id, &FailureStatus::default())
            .await
    }

    /// Guarda el fallo. Devuelve `false` si la fila ya no existe.
    pub async fn record_failure(
        &self,
        service_config_id: &str,
        error: &DeliveryError,
    ) -> Result<bool> {
        let status = failure_status_for(error, Utc::now());
        self.write_in_immediate_tx(service_config_id, &status).await
    }

    async fn write_in_immediate_tx(
        &self,
        service_config_id: &str,
        status: &FailureStatus,
    ) -> Result<bool> {
        let mut tx = ImmediateTx::begin(&self.db_pool).await?;
        let conn = tx.conn()?;

        let result = match write_failure_status(&mut *conn, service_config_id, status).await {
            Ok(found) => sqlx::query("COMMIT")
                .execute(&mut *conn)
                .await
                .map(|_| found)
                .context("Fallo al hacer COMMIT"),
            Err(e) => Err(e),
        };

        if result.is_err() {
            if let Err(rb) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
                // Sin `release`: la conexión se descarta con la transacción
                log::error!("(write_in_immediate_tx) Fallo al hacer ROLLBACK: {:?}", rb);
                return result;
            }
        }

        tx.release();
        result
    }
}

/// Conexión del pool con un `BEGIN IMMEDIATE` abierto a mano (sqlx no lo ve
/// como transacción). Si se suelta sin `release` (future cancelado, ROLLBACK
/// fallido) la conexión sale del pool y se cierra; SQLite descarta la
/// transacción al cerrar.
pub(crate) struct ImmediateTx {
    conn: Option<PoolConnection<Sqlite>>,
}

impl ImmediateTx {
    pub(crate) async fn begin(db_pool: &Pool<Sqlite>) -> Result<Self> {
        let mut conn = db_pool
            .acquire()
            .await
            .context("No se pudo obtener conexión para registrar el estado")?;

        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut *conn)
            .await
            .context("No se pudo abrir la transacción IMMEDIATE")?;

        Ok(ImmediateTx { conn: Some(conn) })
    }

    pub(crate) fn conn(&mut self) -> Result<&mut SqliteConnection> {
        self.conn
            .as_deref_mut()
            .context("La transacción IMMEDIATE ya fue cerrada")
    }

    /// Después de COMMIT/ROLLBACK: la conexión vuelve limpia al pool.
    pub(crate) fn release(mut self) {
        self.conn.take();
    }
}

impl Drop for ImmediateTx {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            log::warn!("(ImmediateTx) Transacción sin cerrar; se descarta la conexión");
            drop(conn.detach());
        }
    }
}

/// get-by-id + update completo de los seis campos.
async fn write_failure_status(
    conn: &mut SqliteConnection,
    service_config_id: &str,
    status: &FailureStatus,
) -> Result<bool> {
    let found: Option<String> =
        sqlx::query_scalar("SELECT id FROM messaging_service_configs WHERE id = ?1")
            .bind(service_config_id)
            .fetch_optional(&mut *conn)
            .await
            .context("Error buscando messaging_service_config")?;

    if found.is_none() {
        return Ok(false);
    }

    sqlx::query(
        r#"
        UPDATE messaging_service_configs
        SET
            last_failure_timestamp = ?2,
            last_failure_error_type = ?3,
            last_failure_error_message = ?4,
            last_failure_status_code = ?5,
            last_failure_response_text = ?6,
            last_failure_is_json = ?7
        WHERE id = ?1
        "#,
    )
    .bind(service_config_id)
    .bind(status.last_failure_timestamp.map(|t| t.to_rfc3339()))
    .bind(status.last_failure_error_type.as_deref())
    .bind(status.last_failure_error_message.as_deref())
    .bind(status.last_failure_status_code)
    .bind(status.last_failure_response_text.as_deref())
    .bind(status.last_failure_is_json)
    .execute(&mut *conn)
    .await
    .context("Error actualizando estado de fallo")?;

    Ok(true)
}

/// Convierte un error de envío en el estado a persistir.
/// `is_json` se calcula sobre el body COMPLETO, no sobre la copia truncada.
pub fn failure_status_for(error: &DeliveryError, now: DateTime<Utc>) -> FailureStatus {
    let (status_code, response_text, is_json) = match error.response() {
        Some(resp) => (
            Some(i64::from(resp.status_code)),
            Some(truncate_response_text(&resp.text)),
            Some(serde_json::from_str::<serde_json::Value>(&resp.text).is_ok()),
        ),
        // Sin respuesta: se ponen a NULL explícitamente (nada del intento anterior)
        None => (None, None, None),
    };

    FailureStatus {
        last_failure_timestamp: Some(now),
        last_failure_error_type: Some(error.error_type().to_string()),
        last_failure_error_message: Some(error.to_string()),
        last_failure_status_code: status_code,
        last_failure_response_text: response_text,
        last_failure_is_json: is_json,
    }
}

pub fn truncate_response_text(text: &str) -> String {
    text.chars().take(MAX_RESPONSE_TEXT_CHARS).collect()
}
