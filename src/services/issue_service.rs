use anyhow::{Context, Result};
use sqlx::{Pool, Row, Sqlite};

use crate::models::issue_model::Issue;

/// Lectura de issues (el núcleo nunca los modifica).
#[derive(Clone, Debug)]
pub struct IssueService {
    db_pool: Pool<Sqlite>,
}

impl IssueService {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        IssueService { db_pool }
    }

    pub async fn get_issue(&self, issue_id: &str) -> Result<Option<Issue>> {
        let row = sqlx::query(
            r#"
            SELECT i.id, i.project_id, p.name AS project_name,
                   i.calculated_type, i.calculated_value
            FROM issues i
            JOIN projects p ON p.id = i.project_id
            WHERE i.id = ?1
            "#,
        )
        .bind(issue_id)
        .fetch_optional(&self.db_pool)
        .await
        .context("Error leyendo issue")?;

        let Some(r) = row else {
            return Ok(None);
        };

        Ok(Some(Issue {
            id: r.try_get("id")?,
            project_id: r.try_get("project_id")?,
            project_name: r.try_get("project_name")?,
            calculated_type: r.try_get("calculated_type")?,
            calculated_value: r.try_get("calculated_value")?,
        }))
    }
}
