//! Alerting module for burst notifications
//!
//! Notifications are fire-and-forget: the analysis pipeline hands them to a
//! `Notifier` and never waits on delivery. `AlertQueue` buffers them on a
//! bounded channel that `AlertDispatcher` drains asynchronously, posting to
//! Slack and generic webhooks.

pub mod emitter;

pub use emitter::{AlertEmitter, EmitOutcome};

use crate::config::{AlertConfig, SlackConfig, WebhookConfig};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur during alert dispatch
#[derive(Error, Debug)]
pub enum AlertError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Alert channel closed")]
    ChannelClosed,

    #[error("Alert queue full")]
    QueueFull,
}

/// A message addressed to one recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Outbound notification sink
pub trait Notifier: Send + Sync {
    fn notify(&self, recipient: &str, subject: &str, body: &str) -> Result<(), AlertError>;
}

/// Notifier that only writes to the log
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, recipient: &str, subject: &str, body: &str) -> Result<(), AlertError> {
        log::info!("Notify {}: {} | {}", recipient, subject, body.replace('\n', ", "));
        Ok(())
    }
}

/// Async alert dispatcher
///
/// Runs as a tokio task and delivers queued notifications to the
/// configured channels (Slack, webhooks).
pub struct AlertDispatcher {
    config: AlertConfig,
    client: Client,
}

impl AlertDispatcher {
    /// Create a new alert dispatcher with the given configuration
    pub fn new(config: AlertConfig) -> Self {
        AlertDispatcher {
            config,
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Create a channel for queueing notifications
    pub fn create_channel() -> (mpsc::Sender<Notification>, mpsc::Receiver<Notification>) {
        mpsc::channel(100)
    }

    pub fn has_channels(&self) -> bool {
        self.config.slack.is_some() || !self.config.webhooks.is_empty()
    }

    /// Run the alert dispatch loop
    ///
    /// Receives notifications until every sender is dropped. Delivery
    /// failures are logged and never stop the loop.
    pub async fn run(self, mut rx: mpsc::Receiver<Notification>) {
        log::info!("Alert dispatcher started");

        while let Some(notification) = rx.recv().await {
            if !self.config.enabled {
                log::debug!("Alerting disabled, dropping '{}'", notification.subject);
                continue;
            }

            if !self.has_channels() {
                log::info!(
                    "No delivery channel configured for '{}' to {}",
                    notification.subject,
                    notification.recipient
                );
                continue;
            }

            log::info!("Dispatching alert: {}", notification.subject);

            if let Err(e) = self.dispatch(&notification).await {
                log::error!("Failed to dispatch alert: {}", e);
            }
        }

        log::info!("Alert dispatcher stopped");
    }

    /// Deliver a notification to every configured channel
    async fn dispatch(&self, notification: &Notification) -> Result<(), AlertError> {
        let mut errors = Vec::new();

        if let Some(ref slack) = self.config.slack {
            if let Err(e) = self.send_slack_alert(slack, notification).await {
                log::error!("Slack alert failed: {}", e);
                errors.push(e);
            }
        }

        for webhook in &self.config.webhooks {
            if let Err(e) = self.send_generic_webhook(webhook, notification).await {
                log::error!("Webhook {} failed: {}", webhook.name, e);
                errors.push(e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.remove(0))
        }
    }

    /// Send a notification to Slack
    async fn send_slack_alert(
        &self,
        config: &SlackConfig,
        notification: &Notification,
    ) -> Result<(), AlertError> {
        let payload = slack_payload(config, notification);

        let response = self
            .client
            .post(&config.webhook_url)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            log::warn!("Slack returned non-success status: {}", response.status());
        }

        Ok(())
    }

    /// Send a notification to a generic webhook
    async fn send_generic_webhook(
        &self,
        config: &WebhookConfig,
        notification: &Notification,
    ) -> Result<(), AlertError> {
        let method = config.method.as_deref().unwrap_or("POST");

        let mut request = match method.to_uppercase().as_str() {
            "PUT" => self.client.put(&config.url),
            _ => self.client.post(&config.url),
        };

        if let Some(ref headers) = config.headers {
            for (key, value) in headers {
                request = request.header(key, value);
            }
        }

        let response = request.json(notification).send().await?;

        if !response.status().is_success() {
            log::warn!(
                "Webhook {} returned non-success status: {}",
                config.name,
                response.status()
            );
        }

        Ok(())
    }
}

fn slack_payload(config: &SlackConfig, notification: &Notification) -> serde_json::Value {
    serde_json::json!({
        "channel": config.channel,
        "username": config.username.as_deref().unwrap_or("LogSentinel"),
        "icon_emoji": ":shield:",
        "attachments": [{
            "color": "danger",
            "title": format!(":rotating_light: {}", notification.subject),
            "fields": [
                { "title": "Recipient", "value": &notification.recipient, "short": true },
            ],
            "text": &notification.body,
        }]
    })
}

/// Synchronous notification queue for use in sync code
///
/// Queues notifications for the async `AlertDispatcher` without blocking.
#[derive(Clone)]
pub struct AlertQueue {
    tx: mpsc::Sender<Notification>,
}

impl AlertQueue {
    /// Create a new alert queue with the given sender
    pub fn new(tx: mpsc::Sender<Notification>) -> Self {
        AlertQueue { tx }
    }

    /// Check if the queue is closed
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl Notifier for AlertQueue {
    /// Queue a notification for dispatch (non-blocking)
    fn notify(&self, recipient: &str, subject: &str, body: &str) -> Result<(), AlertError> {
        let notification = Notification {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        };

        self.tx.try_send(notification).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => AlertError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => AlertError::ChannelClosed,
        })
    }
}
