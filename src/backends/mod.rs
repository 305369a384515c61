//! backends/mod.rs
//! Backends de mensajería (uno por proveedor) y el registro que los construye.
//!
//! Cada backend sólo decide CÓMO se formatea el mensaje; el envío y el registro
//! del resultado son siempre `DeliveryService` + `StatusRecorder`.

pub mod discord;
pub mod form;
pub mod slack;

use std::collections::HashMap;
use thiserror::Error;

use crate::models::alert_model::{AlertReason, AlertRequest};
use crate::models::messaging_service_model::MessagingServiceConfig;
use crate::services::task_runner::TaskRunner;

pub use form::ConfigForm;

// Colores de acento (enteros RGB, formato Discord)
pub const COLOR_NEW: u32 = 15158332; // #e74c3c
pub const COLOR_REGRESSED: u32 = 15105570; // #e67e22
pub const COLOR_UNMUTED: u32 = 15844367; // #f1c40f
pub const COLOR_DEFAULT: u32 = 3447003; // #3498db

/// Tope del título del issue en los payloads.
pub const MAX_TITLE_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend desconocido: {0}")]
    UnknownKind(String),

    #[error("Configuración inválida para backend '{kind}': {source}")]
    InvalidConfig {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

pub trait Backend: Send + Sync {
    fn kind(&self) -> &'static str;

    fn config_form(&self) -> Box<dyn ConfigForm>;

    /// Encola un mensaje de prueba. No espera el resultado.
    fn send_test_message(&self);

    /// Encola una alerta real. El issue viaja por id, no como objeto.
    fn send_alert(&self, alert: AlertRequest);
}

type FormConstructor = fn() -> Box<dyn ConfigForm>;
type BackendConstructor =
    fn(&MessagingServiceConfig, TaskRunner) -> Result<Box<dyn Backend>, BackendError>;

#[derive(Clone, Copy)]
pub struct BackendRegistration {
    pub form: FormConstructor,
    pub build: BackendConstructor,
}

/// kind ("discord", "slack", ...) -> constructores.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    entries: HashMap<&'static str, BackendRegistration>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registro con los backends que trae el servicio.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(discord::KIND, discord::registration());
        registry.register(slack::KIND, slack::registration());
        registry
    }

    pub fn register(&mut self, kind: &'static str, registration: BackendRegistration) {
        if self.entries.insert(kind, registration).is_some() {
            log::warn!("(register) Backend '{}' registrado dos veces", kind);
        }
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<_> = self.entries.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }

    fn entry(&self, kind: &str) -> Result<&BackendRegistration, BackendError> {
        self.entries
            .get(kind)
            .ok_or_else(|| BackendError::UnknownKind(kind.to_string()))
    }

    pub fn form_for(&self, kind: &str) -> Result<Box<dyn ConfigForm>, BackendError> {
        Ok((self.entry(kind)?.form)())
    }

    /// Instancia el backend ligado a una configuración guardada.
    pub fn build(
        &self,
        config: &MessagingServiceConfig,
        runner: TaskRunner,
    ) -> Result<Box<dyn Backend>, BackendError> {
        (self.entry(&config.kind)?.build)(config, runner)
    }
}

/// Color por motivo de alerta; cualquier otro motivo usa el color neutro.
pub fn alert_color(reason: &AlertReason) -> u32 {
    match reason {
        AlertReason::New => COLOR_NEW,
        AlertReason::Regressed => COLOR_REGRESSED,
        AlertReason::Unmuted => COLOR_UNMUTED,
        AlertReason::Other(_) => COLOR_DEFAULT,
    }
}

/// Corta a `max` caracteres (code points) contando el "…" final.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Lee el JSON guardado en `config` con el struct tipado de cada backend.
pub(crate) fn parse_settings<T>(config: &MessagingServiceConfig) -> Result<T, BackendError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_str(&config.config).map_err(|source| BackendError::InvalidConfig {
        kind: config.kind.clone(),
        source,
    })
}
