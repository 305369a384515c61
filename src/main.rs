use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use dotenv::dotenv;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use std::time::Duration;

use crate::backends::BackendRegistry;
use crate::config::app_config::{AppConfig, DeliverySettings};
use crate::logger::init_logger;
use crate::services::delivery_service::DeliveryService;
use crate::services::issue_service::IssueService;
use crate::services::service_config_service::ServiceConfigService;
use crate::services::status_recorder::StatusRecorder;
use crate::services::task_runner::{JobContext, TaskRunner};

mod app;
mod backends;
mod config;
mod handlers;
mod logger;
mod models;
mod services;

#[cfg(test)]
mod tests;

/// Abre el pool SQLite y corre las migraciones.
/// WAL + busy_timeout: los `BEGIN IMMEDIATE` concurrentes esperan en vez de fallar.
pub async fn setup_database(database_url: &str) -> Result<Pool<Sqlite>> {
    log::info!("Conectando a SQLite en {}", database_url);

    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("DATABASE_URL inválida: {}", database_url))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(10));

    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .context("No se pudo conectar a la base de datos SQLite.")?;

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .context("Fallo en migraciones")?;

    Ok(db_pool)
}

/// Arma el runner de jobs con todo lo que necesitan los envíos.
pub fn build_task_runner(
    db_pool: Pool<Sqlite>,
    http_client: reqwest::Client,
    settings: DeliverySettings,
) -> TaskRunner {
    let recorder = StatusRecorder::new(db_pool.clone());
    let delivery = DeliveryService::new(http_client, recorder);

    TaskRunner::new(JobContext {
        settings,
        delivery,
        issues: IssueService::new(db_pool),
    })
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok(); // Cargar .env al inicio
    init_logger();

    let app_config = AppConfig::from_env().expect("Configuración inválida");

    // Carpeta por defecto de la base
    std::fs::create_dir_all("data").expect("No se pudo crear directorio 'data'");

    let db_pool = setup_database(&app_config.database_url)
        .await
        .expect("No se pudo inicializar la base de datos");

    let config_service = ServiceConfigService::new(db_pool.clone());
    let registry = BackendRegistry::with_builtin();
    let runner = build_task_runner(
        db_pool.clone(),
        reqwest::Client::new(),
        DeliverySettings::from(&app_config),
    );

    log::info!("Backends registrados: {:?}", registry.kinds());

    // Levantar servidor
    log::info!(
        "Levantando servidor en {}:{}",
        app_config.bind_addr,
        app_config.port
    );
    let server_runner = runner.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(config_service.clone()))
            .app_data(web::Data::new(registry.clone()))
            .app_data(web::Data::new(server_runner.clone()))
            .configure(app::init_app)
    })
    .bind((app_config.bind_addr.as_str(), app_config.port))?
    .run()
    .await?;

    // Esperar los envíos en curso antes de salir
    log::info!(
        "Servidor detenido; esperando {} envíos en curso...",
        runner.in_flight()
    );
    runner.drain().await;
    db_pool.close().await;
    Ok(())
}
