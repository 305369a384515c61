use serde::{Deserialize, Serialize};
use std::fmt;

/// Motivo de la alerta. Cualquier texto desconocido cae en `Other`,
/// así que la conversión desde `String` nunca falla.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AlertReason {
    New,
    Regressed,
    Unmuted,
    Other(String),
}

impl From<String> for AlertReason {
    fn from(s: String) -> Self {
        match s.as_str() {
            "NEW" => AlertReason::New,
            "REGRESSED" => AlertReason::Regressed,
            "UNMUTED" => AlertReason::Unmuted,
            _ => AlertReason::Other(s),
        }
    }
}

impl From<&str> for AlertReason {
    fn from(s: &str) -> Self {
        AlertReason::from(s.to_string())
    }
}

impl From<AlertReason> for String {
    fn from(r: AlertReason) -> Self {
        r.to_string()
    }
}

impl fmt::Display for AlertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertReason::New => write!(f, "NEW"),
            AlertReason::Regressed => write!(f, "REGRESSED"),
            AlertReason::Unmuted => write!(f, "UNMUTED"),
            AlertReason::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Datos de una alerta real. El issue viaja sólo por id y se relee en el job.
/// También es el body de POST /api/messaging-services/{id}/alerts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRequest {
    pub issue_id: String,
    pub state_description: String, // ej. "new", "regressed"
    pub alert_article: String,     // ej. "a", "an"
    pub alert_reason: AlertReason,
    #[serde(default)]
    pub unmute_reason: Option<String>,
}
