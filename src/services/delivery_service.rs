//! services/delivery_service.rs
//! Envío de un payload ya armado al destino (webhook) y clasificación del resultado.
//! Cada llamada es UN intento: sin reintentos ni backoff.

use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::services::status_recorder::StatusRecorder;

/// Timeout fijo por request.
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Lo que se guarda de una respuesta no-2xx.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSnapshot {
    pub status_code: u16,
    pub text: String, // body completo, sin truncar
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Sin respuesta: se agotó el timeout
    #[error("Timeout enviando a {url}: {message}")]
    Timeout { url: String, message: String },

    /// Sin respuesta: DNS, conexión rechazada, TLS...
    #[error("Error de conexión con {url}: {message}")]
    Connection { url: String, message: String },

    /// El destino respondió, pero con un status no-2xx
    #[error("HTTP {status} para url: {url}", status = .response.status_code)]
    Rejected {
        url: String,
        response: ResponseSnapshot,
    },

    /// Cualquier otro error de reqwest (URL inválida, body, redirects...)
    #[error("Error en la request a {url}: {message}")]
    Request { url: String, message: String },

    /// Errores fuera de la llamada HTTP (issue inexistente, DB, ...)
    #[error("{message}")]
    Unexpected { kind: &'static str, message: String },
}

impl DeliveryError {
    pub fn unexpected(kind: &'static str, message: impl Into<String>) -> Self {
        DeliveryError::Unexpected {
            kind,
            message: message.into(),
        }
    }

    fn from_reqwest(url: &str, e: reqwest::Error) -> Self {
        let (is_timeout, is_connect) = (e.is_timeout(), e.is_connect());
        // "{:#}" incluye las causas (connection refused, etc.)
        let message = format!("{:#}", anyhow::Error::from(e));
        let url = url.to_string();
        if is_timeout {
            DeliveryError::Timeout { url, message }
        } else if is_connect {
            DeliveryError::Connection { url, message }
        } else {
            DeliveryError::Request { url, message }
        }
    }

    /// Etiqueta guardada en `last_failure_error_type`.
    pub fn error_type(&self) -> &'static str {
        match self {
            DeliveryError::Timeout { .. } => "Timeout",
            DeliveryError::Connection { .. } => "ConnectionError",
            DeliveryError::Rejected { .. } => "HttpError",
            DeliveryError::Request { .. } => "RequestError",
            DeliveryError::Unexpected { kind, .. } => *kind,
        }
    }

    /// Sólo hay respuesta cuando el destino contestó con no-2xx.
    pub fn response(&self) -> Option<&ResponseSnapshot> {
        match self {
            DeliveryError::Rejected { response, .. } => Some(response),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct DeliveryService {
    http_client: Client,
    recorder: StatusRecorder,
}

impl DeliveryService {
    pub fn new(http_client: Client, recorder: StatusRecorder) -> Self {
        Self {
            http_client,
            recorder,
        }
    }

    /// POST con JSON; OK sólo si el status es 2xx.
    pub async fn deliver<P>(&self, url: &str, payload: &P) -> Result<(), DeliveryError>
    where
        P: Serialize + ?Sized,
    {
        let resp = self
            .http_client
            .post(url)
            .timeout(DELIVERY_TIMEOUT)
            .json(payload)
            .send()
            .await
            .map_err(|e| DeliveryError::from_reqwest(url, e))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        // Si ni siquiera se puede leer el body, guardamos el status con body vacío
        let text = match resp.text().await {
            Ok(t) => t,
            Err(e) => {
                log::warn!(
                    "(deliver) No se pudo leer el body de la respuesta {} de {}: {}",
                    status,
                    url,
                    e
                );
                String::new()
            }
        };

        Err(DeliveryError::Rejected {
            url: url.to_string(),
            response: ResponseSnapshot {
                status_code: status.as_u16(),
                text,
            },
        })
    }

    /// Envía y registra el resultado (éxito o fallo) para esa configuración.
    pub async fn send_and_record<P>(&self, service_config_id: &str, url: &str, payload: &P)
    where
        P: Serialize + ?Sized,
    {
        let outcome = self.deliver(url, payload).await;
        self.record_outcome(service_config_id, outcome).await;
    }

    /// Exactamente una escritura por intento. Los errores de la DB se loguean
    /// y se tragan: el job siempre termina "bien" para el task runner.
    pub async fn record_outcome(
        &self,
        service_config_id: &str,
        outcome: Result<(), DeliveryError>,
    ) {
        let recorded = match &outcome {
            Ok(()) => {
                log::info!(
                    "(record_outcome) Envío OK para service_config_id={}",
                    service_config_id
                );
                self.recorder.record_success(service_config_id).await
            }
            Err(e) => {
                log::warn!(
                    "(record_outcome) Envío fallido para service_config_id={}: [{}] {}",
                    service_config_id,
                    e.error_type(),
                    e
                );
                self.recorder.record_failure(service_config_id, e).await
            }
        };

        match recorded {
            Ok(true) => {}
            Ok(false) => log::info!(
                "(record_outcome) service_config_id={} ya no existe; no se registra nada.",
                service_config_id
            ),
            Err(e) => log::error!(
                "(record_outcome) No se pudo registrar el resultado para service_config_id={}: {:?}",
                service_config_id,
                e
            ),
        }
    }
}
