//! tests/mod.rs
//! Pruebas del núcleo de alertas (payloads, envío, registro de estado, backends, handlers).

mod backend_tests;
mod handler_tests;
