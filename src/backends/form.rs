//! backends/form.rs
//! Descriptor del formulario de configuración de cada backend: qué campos pide,
//! cómo se precargan y cómo se validan/normalizan antes de guardarse.

use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Url,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormField {
    pub name: &'static str,
    pub label: &'static str,
    pub required: bool,
    pub kind: FieldKind,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("El campo '{0}' es obligatorio")]
    MissingField(&'static str),

    #[error("El campo '{field}' no es una URL válida: {reason}")]
    InvalidUrl { field: &'static str, reason: String },
}

pub trait ConfigForm: Send + Sync {
    fn fields(&self) -> Vec<FormField>;

    /// Valores iniciales a partir de una configuración ya guardada.
    fn initial(&self, config: &serde_json::Value) -> HashMap<String, String> {
        self.fields()
            .iter()
            .map(|f| {
                let value = config
                    .get(f.name)
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                (f.name.to_string(), value)
            })
            .collect()
    }

    /// Valida la entrada y devuelve la configuración normalizada a guardar.
    fn clean(&self, input: &HashMap<String, String>) -> Result<serde_json::Value, FormError>;
}

/// Formulario de un solo campo `webhook_url` (Discord, Slack).
#[derive(Debug, Clone, Copy, Default)]
pub struct WebhookConfigForm;

impl ConfigForm for WebhookConfigForm {
    fn fields(&self) -> Vec<FormField> {
        vec![FormField {
            name: "webhook_url",
            label: "Webhook URL",
            required: true,
            kind: FieldKind::Url,
        }]
    }

    fn clean(&self, input: &HashMap<String, String>) -> Result<serde_json::Value, FormError> {
        let webhook_url = clean_url(input, "webhook_url")?;
        Ok(serde_json::json!({ "webhook_url": webhook_url }))
    }
}

/// URL absoluta http/https, sin espacios alrededor.
pub fn clean_url(
    input: &HashMap<String, String>,
    field: &'static str,
) -> Result<String, FormError> {
    let raw = input
        .get(field)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .ok_or(FormError::MissingField(field))?;

    let parsed = url::Url::parse(raw).map_err(|e| FormError::InvalidUrl {
        field,
        reason: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FormError::InvalidUrl {
            field,
            reason: format!("esquema no soportado '{}'", parsed.scheme()),
        });
    }
    if parsed.host_str().is_none() {
        return Err(FormError::InvalidUrl {
            field,
            reason: "falta el host".to_string(),
        });
    }

    Ok(raw.to_string())
}
