use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuración guardada de un backend de mensajería (Discord, Slack...).
/// Los jobs asíncronos sólo reciben el `id`; la fila se relee dentro del job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingServiceConfig {
    pub id: String,
    pub project_id: String,
    pub project_name: String,
    pub display_name: String,
    pub kind: String,   // "discord", "slack", ...
    pub config: String, // JSON serializado, específico de cada backend
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub failure: FailureStatus,
}

impl MessagingServiceConfig {
    pub fn has_recent_failure(&self) -> bool {
        !self.failure.is_cleared()
    }
}

/// Estado del último intento fallido. Todo en `None` = último envío OK.
/// Los seis campos se escriben siempre juntos (ver `StatusRecorder`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FailureStatus {
    pub last_failure_timestamp: Option<DateTime<Utc>>,
    pub last_failure_error_type: Option<String>,
    pub last_failure_error_message: Option<String>,
    pub last_failure_status_code: Option<i64>,
    pub last_failure_response_text: Option<String>, // máx. 2000 caracteres
    pub last_failure_is_json: Option<bool>,
}

impl FailureStatus {
    pub fn is_cleared(&self) -> bool {
        *self == FailureStatus::default()
    }
}

/// POST /api/messaging-services
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMessagingServiceRequest {
    pub project_id: String,
    pub display_name: String,
    pub kind: String,
    /// Valores crudos del formulario; los valida el `ConfigForm` del backend
    pub config: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateMessagingServiceResponse {
    pub id: String,
    pub message: String,
}
