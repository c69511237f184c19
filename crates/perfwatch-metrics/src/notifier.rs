use async_trait::async_trait;
use perfwatch_types::{Alert, AlertSeverity};
use std::time::Duration;
use tracing::{error, info, warn};

/// 告警通知接口
#[async_trait]
pub trait AlertNotifier: Send + Sync {
    async fn notify(&self, alert: &Alert) -> Result<(), NotifierError>;
    fn name(&self) -> &str;
}

/// 通知错误
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// 日志通知器：critical 用 error 级别，其余用 warn
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl AlertNotifier for LogNotifier {
    async fn notify(&self, alert: &Alert) -> Result<(), NotifierError> {
        match alert.severity {
            AlertSeverity::Critical => error!(
                metric = %alert.metric_name,
                alert_type = alert.alert_type.as_str(),
                "Performance Alert: {}",
                alert.message
            ),
            _ => warn!(
                metric = %alert.metric_name,
                alert_type = alert.alert_type.as_str(),
                "Performance Alert: {}",
                alert.message
            ),
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Webhook 通知器，以 JSON 形式 POST 告警
pub struct WebhookNotifier {
    url: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: String, timeout: Duration) -> Result<Self, NotifierError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifierError::ConfigError(e.to_string()))?;
        Ok(Self { url, client })
    }
}

#[async_trait]
impl AlertNotifier for WebhookNotifier {
    async fn notify(&self, alert: &Alert) -> Result<(), NotifierError> {
        let payload = serde_json::to_string(alert)
            .map_err(|e| NotifierError::SerializationError(e.to_string()))?;

        self.client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .body(payload)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| NotifierError::HttpError(e.to_string()))?;

        info!("Webhook notification sent to {}", self.url);
        Ok(())
    }

    fn name(&self) -> &str {
        "webhook"
    }
}

/// 以闭包实现的通知器
pub struct FnNotifier<F> {
    name: String,
    handler: F,
}

impl<F> FnNotifier<F>
where
    F: Fn(&Alert) -> Result<(), NotifierError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }
}

#[async_trait]
impl<F> AlertNotifier for FnNotifier<F>
where
    F: Fn(&Alert) -> Result<(), NotifierError> + Send + Sync,
{
    async fn notify(&self, alert: &Alert) -> Result<(), NotifierError> {
        (self.handler)(alert)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
