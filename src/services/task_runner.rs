//! services/task_runner.rs
//! Ejecución asíncrona de los envíos. Los backends sólo encolan un
//! `DeliveryJob` (argumentos primitivos, serializable); el job relee lo que
//! necesite, arma el payload, envía y registra el resultado.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::task::TaskTracker;

use crate::backends::{discord::DiscordJob, slack::SlackJob};
use crate::config::app_config::DeliverySettings;
use crate::models::issue_model::Issue;
use crate::services::delivery_service::{DeliveryError, DeliveryService};
use crate::services::issue_service::IssueService;

/// Lo que un job necesita al ejecutarse. Se comparte entre jobs (Arc).
#[derive(Clone, Debug)]
pub struct JobContext {
    pub settings: DeliverySettings,
    pub delivery: DeliveryService,
    pub issues: IssueService,
}

impl JobContext {
    /// Relee el issue dentro del job. Si ya no existe (o falla la DB) se
    /// devuelve como `DeliveryError::Unexpected` para registrarlo como fallo.
    pub async fn load_issue(&self, issue_id: &str) -> Result<Issue, DeliveryError> {
        match self.issues.get_issue(issue_id).await {
            Ok(Some(issue)) => Ok(issue),
            Ok(None) => Err(DeliveryError::unexpected(
                "IssueNotFound",
                format!("Issue {} no existe", issue_id),
            )),
            Err(e) => Err(DeliveryError::unexpected(
                "DatabaseError",
                format!("{:#}", e),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", content = "job", rename_all = "snake_case")]
pub enum DeliveryJob {
    Discord(DiscordJob),
    Slack(SlackJob),
}

impl DeliveryJob {
    pub fn service_config_id(&self) -> &str {
        match self {
            DeliveryJob::Discord(job) => job.service_config_id(),
            DeliveryJob::Slack(job) => job.service_config_id(),
        }
    }

    pub async fn run(self, ctx: &JobContext) {
        match self {
            DeliveryJob::Discord(job) => job.run(ctx).await,
            DeliveryJob::Slack(job) => job.run(ctx).await,
        }
    }
}

/// Fire-and-forget: `schedule` vuelve enseguida, el resultado sólo queda
/// en el estado de fallo de la configuración.
#[derive(Clone)]
pub struct TaskRunner {
    ctx: Arc<JobContext>,
    tracker: TaskTracker,
}

impl TaskRunner {
    pub fn new(ctx: JobContext) -> Self {
        TaskRunner {
            ctx: Arc::new(ctx),
            tracker: TaskTracker::new(),
        }
    }

    pub fn schedule(&self, job: DeliveryJob) {
        log::info!(
            "(schedule) Encolando job para service_config_id={}",
            job.service_config_id()
        );
        if log::log_enabled!(log::Level::Debug) {
            if let Ok(raw) = serde_json::to_string(&job) {
                log::debug!("(schedule) job={}", raw);
            }
        }

        let ctx = Arc::clone(&self.ctx);
        self.tracker.spawn(async move {
            job.run(&ctx).await;
        });
    }

    /// Cantidad de jobs en curso.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Espera a que terminen los jobs en curso (shutdown y tests).
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}
