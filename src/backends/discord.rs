//! backends/discord.rs
//! Backend Discord: mensajes con "embeds" enviados a un webhook.

use serde::{Deserialize, Serialize};

use crate::backends::form::WebhookConfigForm;
use crate::backends::{
    alert_color, parse_settings, truncate_chars, Backend, BackendError, BackendRegistration,
    ConfigForm, COLOR_DEFAULT, MAX_TITLE_CHARS,
};
use crate::config::app_config::DeliverySettings;
use crate::models::alert_model::{AlertReason, AlertRequest};
use crate::models::issue_model::{Issue, PLACEHOLDER_ISSUE_PATH};
use crate::models::messaging_service_model::MessagingServiceConfig;
use crate::services::task_runner::{DeliveryJob, JobContext, TaskRunner};

pub const KIND: &str = "discord";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub webhook_url: String,
}

// ----------------------------------------------------------------
// Payload
// ----------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscordMessage {
    pub content: String,
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Embed {
    pub title: String,
    pub url: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    /// Sin motivo de unmute la clave no se emite (ni siquiera vacía)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl EmbedField {
    fn inline(name: &str, value: &str) -> Self {
        EmbedField {
            name: name.to_string(),
            value: value.to_string(),
            inline: true,
        }
    }
}

pub fn test_message_payload(
    settings: &DeliverySettings,
    project_name: &str,
    display_name: &str,
) -> DiscordMessage {
    DiscordMessage {
        content: "**TEST issue**".to_string(),
        embeds: vec![Embed {
            title: format!(
                "Test message by {} to test the webhook setup.",
                settings.site_title
            ),
            url: settings.absolute_url(PLACEHOLDER_ISSUE_PATH),
            color: COLOR_DEFAULT,
            fields: vec![
                EmbedField::inline("Project", project_name),
                EmbedField::inline("Message backend", display_name),
            ],
            description: None,
        }],
    }
}

pub fn alert_payload(
    settings: &DeliverySettings,
    issue: &Issue,
    alert_reason: &AlertReason,
    unmute_reason: Option<&str>,
) -> DiscordMessage {
    DiscordMessage {
        content: format!("**{} issue**", alert_reason),
        embeds: vec![Embed {
            title: truncate_chars(&issue.title(), MAX_TITLE_CHARS),
            url: settings.absolute_url(&issue.absolute_path()),
            color: alert_color(alert_reason),
            fields: vec![EmbedField::inline("Project", &issue.project_name)],
            description: unmute_reason
                .filter(|r| !r.is_empty())
                .map(str::to_string),
        }],
    }
}

// ----------------------------------------------------------------
// Jobs
// ----------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiscordJob {
    TestMessage {
        webhook_url: String,
        project_name: String,
        display_name: String,
        service_config_id: String,
    },
    Alert {
        webhook_url: String,
        issue_id: String,
        state_description: String,
        alert_article: String,
        alert_reason: AlertReason,
        service_config_id: String,
        unmute_reason: Option<String>,
    },
}

impl DiscordJob {
    pub fn service_config_id(&self) -> &str {
        match self {
            DiscordJob::TestMessage {
                service_config_id, ..
            }
            | DiscordJob::Alert {
                service_config_id, ..
            } => service_config_id,
        }
    }

    pub async fn run(self, ctx: &JobContext) {
        match self {
            DiscordJob::TestMessage {
                webhook_url,
                project_name,
                display_name,
                service_config_id,
            } => {
                let payload = test_message_payload(&ctx.settings, &project_name, &display_name);
                ctx.delivery
                    .send_and_record(&service_config_id, &webhook_url, &payload)
                    .await;
            }
            DiscordJob::Alert {
                webhook_url,
                issue_id,
                alert_reason,
                service_config_id,
                unmute_reason,
                ..
            } => match ctx.load_issue(&issue_id).await {
                Ok(issue) => {
                    let payload = alert_payload(
                        &ctx.settings,
                        &issue,
                        &alert_reason,
                        unmute_reason.as_deref(),
                    );
                    ctx.delivery
                        .send_and_record(&service_config_id, &webhook_url, &payload)
                        .await;
                }
                Err(e) => ctx.delivery.record_outcome(&service_config_id, Err(e)).await,
            },
        }
    }
}

// ----------------------------------------------------------------
// Backend
// ----------------------------------------------------------------

pub struct DiscordBackend {
    service_config_id: String,
    project_name: String,
    display_name: String,
    config: DiscordConfig,
    runner: TaskRunner,
}

impl DiscordBackend {
    pub fn new(
        service_config: &MessagingServiceConfig,
        runner: TaskRunner,
    ) -> Result<Self, BackendError> {
        Ok(DiscordBackend {
            service_config_id: service_config.id.clone(),
            project_name: service_config.project_name.clone(),
            display_name: service_config.display_name.clone(),
            config: parse_settings(service_config)?,
            runner,
        })
    }
}

impl Backend for DiscordBackend {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn config_form(&self) -> Box<dyn ConfigForm> {
        webhook_form()
    }

    fn send_test_message(&self) {
        self.runner
            .schedule(DeliveryJob::Discord(DiscordJob::TestMessage {
                webhook_url: self.config.webhook_url.clone(),
                project_name: self.project_name.clone(),
                display_name: self.display_name.clone(),
                service_config_id: self.service_config_id.clone(),
            }));
    }

    fn send_alert(&self, alert: AlertRequest) {
        self.runner.schedule(DeliveryJob::Discord(DiscordJob::Alert {
            webhook_url: self.config.webhook_url.clone(),
            issue_id: alert.issue_id,
            state_description: alert.state_description,
            alert_article: alert.alert_article,
            alert_reason: alert.alert_reason,
            service_config_id: self.service_config_id.clone(),
            unmute_reason: alert.unmute_reason,
        }));
    }
}

fn webhook_form() -> Box<dyn ConfigForm> {
    Box::new(WebhookConfigForm)
}

fn build(
    config: &MessagingServiceConfig,
    runner: TaskRunner,
) -> Result<Box<dyn Backend>, BackendError> {
    Ok(Box::new(DiscordBackend::new(config, runner)?))
}

pub fn registration() -> BackendRegistration {
    BackendRegistration {
        form: webhook_form,
        build,
    }
}
