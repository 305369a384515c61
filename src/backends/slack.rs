//! backends/slack.rs
//! Backend Slack (incoming webhooks): un attachment con color de acento y
//! bloques mrkdwn. El envío y el registro del resultado son los mismos que Discord.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

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

pub const KIND: &str = "slack";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackConfig {
    pub webhook_url: String,
}

/// Slack interpreta &, < y > dentro de mrkdwn.
fn escape_mrkdwn(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn hex_color(color: u32) -> String {
    format!("#{:06x}", color)
}

fn section(text: String) -> Value {
    json!({ "type": "section", "text": { "type": "mrkdwn", "text": text } })
}

fn project_context(project_name: &str) -> Value {
    json!({
        "type": "context",
        "elements": [
            { "type": "mrkdwn", "text": format!("*Project:* {}", escape_mrkdwn(project_name)) }
        ]
    })
}

pub fn test_message_payload(
    settings: &DeliverySettings,
    project_name: &str,
    display_name: &str,
) -> Value {
    let title = format!(
        "Test message by {} to test the webhook setup.",
        settings.site_title
    );
    let url = settings.absolute_url(PLACEHOLDER_ISSUE_PATH);

    json!({
        "text": format!("TEST issue: {}", title),
        "attachments": [{
            "color": hex_color(COLOR_DEFAULT),
            "blocks": [
                section("*TEST issue*".to_string()),
                section(format!("<{}|{}>", url, escape_mrkdwn(&title))),
                {
                    "type": "context",
                    "elements": [
                        { "type": "mrkdwn", "text": format!("*Project:* {}", escape_mrkdwn(project_name)) },
                        { "type": "mrkdwn", "text": format!("*Message backend:* {}", escape_mrkdwn(display_name)) }
                    ]
                }
            ]
        }]
    })
}

pub fn alert_payload(
    settings: &DeliverySettings,
    issue: &Issue,
    alert_reason: &AlertReason,
    unmute_reason: Option<&str>,
) -> Value {
    let title = truncate_chars(&issue.title(), MAX_TITLE_CHARS);
    let url = settings.absolute_url(&issue.absolute_path());

    let mut blocks = vec![
        section(format!("*{} issue*", alert_reason)),
        section(format!("<{}|{}>", url, escape_mrkdwn(&title))),
    ];
    if let Some(reason) = unmute_reason.filter(|r| !r.is_empty()) {
        blocks.push(section(escape_mrkdwn(reason)));
    }
    blocks.push(project_context(&issue.project_name));

    json!({
        "text": format!("{} issue: {}", alert_reason, title),
        "attachments": [{
            "color": hex_color(alert_color(alert_reason)),
            "blocks": blocks
        }]
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SlackJob {
    TestMessage {
        webhook_url: String,
        project_name: String,
        display_name: String,
        service_config_id: String,
    },
    Alert {
        webhook_url: String,
        issue_id: String,
        alert_reason: AlertReason,
        service_config_id: String,
        unmute_reason: Option<String>,
    },
}

impl SlackJob {
    pub fn service_config_id(&self) -> &str {
        match self {
            SlackJob::TestMessage {
                service_config_id, ..
            }
            | SlackJob::Alert {
                service_config_id, ..
            } => service_config_id,
        }
    }

    pub async fn run(self, ctx: &JobContext) {
        match self {
            SlackJob::TestMessage {
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
            SlackJob::Alert {
                webhook_url,
                issue_id,
                alert_reason,
                service_config_id,
                unmute_reason,
            } => {
                let outcome = ctx.load_issue(&issue_id).await.map(|issue| {
                    alert_payload(&ctx.settings, &issue, &alert_reason, unmute_reason.as_deref())
                });
                match outcome {
                    Ok(payload) => {
                        ctx.delivery
                            .send_and_record(&service_config_id, &webhook_url, &payload)
                            .await
                    }
                    Err(e) => ctx.delivery.record_outcome(&service_config_id, Err(e)).await,
                }
            }
        }
    }
}

pub struct SlackBackend {
    service_config_id: String,
    project_name: String,
    display_name: String,
    config: SlackConfig,
    runner: TaskRunner,
}

impl Backend for SlackBackend {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn config_form(&self) -> Box<dyn ConfigForm> {
        webhook_form()
    }

    fn send_test_message(&self) {
        self.runner.schedule(DeliveryJob::Slack(SlackJob::TestMessage {
            webhook_url: self.config.webhook_url.clone(),
            project_name: self.project_name.clone(),
            display_name: self.display_name.clone(),
            service_config_id: self.service_config_id.clone(),
        }));
    }

    // state_description / alert_article no se usan en el mensaje de Slack
    fn send_alert(&self, alert: AlertRequest) {
        self.runner.schedule(DeliveryJob::Slack(SlackJob::Alert {
            webhook_url: self.config.webhook_url.clone(),
            issue_id: alert.issue_id,
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
    Ok(Box::new(SlackBackend {
        service_config_id: config.id.clone(),
        project_name: config.project_name.clone(),
        display_name: config.display_name.clone(),
        config: parse_settings(config)?,
        runner,
    }))
}

pub fn registration() -> BackendRegistration {
    BackendRegistration {
        form: webhook_form,
        build,
    }
}
