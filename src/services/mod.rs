//! services/mod.rs
//! Módulo que agrupa distintos "servicios" o "capas de negocio" de la app.

pub mod delivery_service;
pub mod issue_service;
pub mod service_config_service;
pub mod status_recorder;
pub mod task_runner;
