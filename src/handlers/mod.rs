//! handlers/mod.rs
//! Handlers HTTP: capa fina sobre los servicios y los backends.
pub mod backend_handler;
pub mod messaging_service_handler;
