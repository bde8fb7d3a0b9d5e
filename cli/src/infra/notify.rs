//! Infrastructure implementation of the `Notifier` port: Discord webhooks.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::application::ports::Notifier;
use crate::domain::{CycleReport, CycleStatus};

/// Request timeout for a single webhook POST.
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Discord rejects field values over 1024 characters.
const FIELD_LIMIT: usize = 1000;
const ELLIPSIS: &str = "...";

const COLOR_UPDATE: u32 = 3_447_003;
const COLOR_SUCCESS: u32 = 3_066_993;
const COLOR_FAILED: u32 = 15_158_332;
const COLOR_PARTIAL: u32 = 16_776_960;

// ── Payload ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookPayload {
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
}

impl EmbedField {
    /// A field whose lines are shown in a code block.
    fn code_block(name: String, lines: &[String]) -> Self {
        Self {
            name,
            value: format!("```\n{}\n```", truncate(&lines.join("\n"))),
        }
    }
}

/// Cut `text` to the field limit on a char boundary.
#[must_use]
pub fn truncate(text: &str) -> String {
    if text.chars().count() <= FIELD_LIMIT {
        return text.to_string();
    }
    let keep = FIELD_LIMIT - ELLIPSIS.len();
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Embed announcing that new commits touched `paths`.
#[must_use]
pub fn update_detected_payload(paths: &[String], now: DateTime<Utc>) -> WebhookPayload {
    WebhookPayload {
        embeds: vec![Embed {
            title: "🔄 Update Detected".into(),
            description: "New changes detected in repository".into(),
            color: COLOR_UPDATE,
            fields: vec![EmbedField::code_block("Changed Files".into(), paths)],
            timestamp: timestamp(now),
        }],
    }
}

/// Embed summarising a cycle. `None` when nothing was attempted.
#[must_use]
pub fn cycle_outcome_payload(report: &CycleReport, now: DateTime<Utc>) -> Option<WebhookPayload> {
    let (title, description, color) = match report.status() {
        CycleStatus::Idle => return None,
        CycleStatus::Succeeded => (
            "✅ Deployment Successful",
            "All stacks deployed successfully",
            COLOR_SUCCESS,
        ),
        CycleStatus::Failed => (
            "❌ Deployment Failed",
            "All stacks failed to deploy",
            COLOR_FAILED,
        ),
        CycleStatus::Partial => (
            "⚠️ Deployment Partially Successful",
            "Some stacks failed to deploy",
            COLOR_PARTIAL,
        ),
    };

    let succeeded: Vec<String> = report.succeeded().map(|o| o.label()).collect();
    let failed: Vec<String> = report
        .failed()
        .map(|o| format!("{}: {}", o.label(), o.error.as_deref().unwrap_or_default()))
        .collect();

    let mut fields = Vec::new();
    if !succeeded.is_empty() {
        fields.push(EmbedField::code_block(
            format!("✅ Success ({})", succeeded.len()),
            &succeeded,
        ));
    }
    if !failed.is_empty() {
        fields.push(EmbedField::code_block(
            format!("❌ Failed ({})", failed.len()),
            &failed,
        ));
    }

    Some(WebhookPayload {
        embeds: vec![Embed {
            title: title.into(),
            description: description.into(),
            color,
            fields,
            timestamp: timestamp(now),
        }],
    })
}

// ── Adapter ──────────────────────────────────────────────────────────────────

/// Posts embeds to a Discord webhook. A notifier without a URL is a no-op.
pub struct DiscordNotifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl DiscordNotifier {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(webhook_url: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .context("building webhook HTTP client")?;
        if webhook_url.is_none() {
            tracing::info!("DISCORD_WEBHOOK not set, notifications disabled");
        }
        Ok(Self {
            client,
            webhook_url,
        })
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    async fn post(&self, payload: &WebhookPayload) -> Result<()> {
        let Some(url) = self.webhook_url.as_deref() else {
            return Ok(());
        };
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .context("sending Discord webhook")?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Discord webhook returned non-2xx status: {status}");
        }
        tracing::debug!("Discord webhook sent successfully");
        Ok(())
    }
}

impl Notifier for DiscordNotifier {
    async fn changes_detected(&self, paths: &[String]) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        self.post(&update_detected_payload(paths, Utc::now())).await
    }

    async fn cycle_completed(&self, report: &CycleReport) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        match cycle_outcome_payload(report, Utc::now()) {
            Some(payload) => self.post(&payload).await,
            None => Ok(()),
        }
    }
}
