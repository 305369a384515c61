//! config/app_config.rs
//! Configuración global del servicio (URL base, base de datos, puerto...).
//! Se lee de variables de entorno (o de un .env) al arrancar.

use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub base_url: String,   // ej. "https://errors.example.com" (sin '/' final)
    pub site_title: String, // nombre que aparece en el mensaje de prueba
    pub database_url: String,
    pub bind_addr: String,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            base_url: "http://localhost:8000".to_string(),
            site_title: "Alert Service".to_string(),
            database_url: "sqlite:./data/alerts.db".to_string(),
            bind_addr: "0.0.0.0".to_string(),
            port: 5022,
        }
    }
}

impl AppConfig {
    /// Lee BASE_URL, SITE_TITLE, DATABASE_URL, BIND_ADDR y PORT.
    /// Lo que no esté definido queda con el valor por defecto.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = AppConfig::default();

        let port = match env::var("PORT") {
            Ok(p) => p
                .parse::<u16>()
                .map_err(|e| anyhow::anyhow!("PORT inválido '{}': {}", p, e))?,
            Err(_) => defaults.port,
        };

        Ok(AppConfig {
            base_url: normalize_base_url(
                &env::var("BASE_URL").unwrap_or(defaults.base_url),
            ),
            site_title: env::var("SITE_TITLE").unwrap_or(defaults.site_title),
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port,
        })
    }
}

/// Las rutas de los issues empiezan con '/', así que la base no debe terminar en '/'.
pub fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

/// Lo único de la configuración global que necesitan los payload builders.
/// Se inyecta en los jobs; nadie lo lee de un global.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliverySettings {
    pub base_url: String,
    pub site_title: String,
}

impl DeliverySettings {
    /// URL absoluta: base + ruta relativa (que empieza con '/').
    pub fn absolute_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl From<&AppConfig> for DeliverySettings {
    fn from(cfg: &AppConfig) -> Self {
        DeliverySettings {
            base_url: normalize_base_url(&cfg.base_url),
            site_title: cfg.site_title.clone(),
        }
    }
}
