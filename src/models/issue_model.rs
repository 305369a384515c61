use serde::{Deserialize, Serialize};

/// Ruta usada en los mensajes de prueba (no existe ningún issue real detrás).
pub const PLACEHOLDER_ISSUE_PATH: &str = "/issues/issue/00000000-0000-0000-0000-000000000000/";

/// Issue tal como lo ve el núcleo de alertas: sólo lectura.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub project_id: String,
    pub project_name: String,
    pub calculated_type: String,  // ej. "ValueError"
    pub calculated_value: String, // ej. "invalid literal for int()"
}

impl Issue {
    pub fn title(&self) -> String {
        match (
            self.calculated_type.is_empty(),
            self.calculated_value.is_empty(),
        ) {
            (false, false) => format!("{}: {}", self.calculated_type, self.calculated_value),
            (false, true) => self.calculated_type.clone(),
            _ => self.calculated_value.clone(),
        }
    }

    /// Ruta relativa; la URL completa es `base_url + absolute_path()`.
    pub fn absolute_path(&self) -> String {
        format!("/issues/issue/{}/", self.id)
    }
}
