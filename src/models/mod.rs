//! models/mod.rs
//! Módulo raíz para modelos/estructuras compartidas.

pub mod alert_model;
pub mod issue_model;
pub mod messaging_service_model;
