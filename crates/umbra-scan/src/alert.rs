//! Outbound alert delivery.
//!
//! The pipeline forwards every WARNING-and-above finding or change
//! event through an [`AlertSink`]. Delivery failures are logged by the
//! caller and never abort a sweep; no confirmation is required.

use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;

use umbra_core::types::Severity;

use crate::error::Result;

#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn deliver(&self, ip: Ipv4Addr, severity: Severity, messages: &[String]) -> Result<()>;
}

/// Delivers alerts as embed-style JSON to a webhook endpoint.
pub struct WebhookAlerter {
    http: reqwest::Client,
    webhook_url: String,
}

impl WebhookAlerter {
    pub fn new(webhook_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            webhook_url: webhook_url.to_string(),
        })
    }
}

#[async_trait]
impl AlertSink for WebhookAlerter {
    async fn deliver(&self, ip: Ipv4Addr, severity: Severity, messages: &[String]) -> Result<()> {
        let body = serde_json::json!({
            "username": "umbra",
            "embeds": [{
                "title": format!("{severity} alert: {ip}"),
                "description": messages.join("\n"),
                "color": match severity {
                    Severity::Critical | Severity::High => 0xFF0000,
                    Severity::Warning => 0xFFA500,
                    Severity::Info => 0x808080,
                },
            }],
        });

        self.http
            .post(&self.webhook_url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        tracing::info!(ip = %ip, severity = %severity, "Alert delivered");
        Ok(())
    }
}

/// Sink used when no webhook is configured.
pub struct NullAlerter;

#[async_trait]
impl AlertSink for NullAlerter {
    async fn deliver(&self, ip: Ipv4Addr, severity: Severity, _messages: &[String]) -> Result<()> {
        tracing::debug!(ip = %ip, severity = %severity, "Alerting disabled, dropping alert");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn webhook_stub(status_line: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut sock, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = sock.read(&mut buf).await;
                let response = format!("{status_line}\r\ncontent-length: 0\r\n\r\n");
                let _ = sock.write_all(response.as_bytes()).await;
            }
        });
        format!("http://127.0.0.1:{}/hook", addr.port())
    }

    #[tokio::test]
    async fn delivery_succeeds_against_accepting_endpoint() {
        let url = webhook_stub("HTTP/1.1 204 No Content").await;
        let alerter = WebhookAlerter::new(&url).unwrap();

        let result = alerter
            .deliver(
                "10.0.1.23".parse().unwrap(),
                Severity::Critical,
                &["Telnet service detected".to_string()],
            )
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn delivery_surfaces_server_rejection() {
        let url = webhook_stub("HTTP/1.1 500 Internal Server Error").await;
        let alerter = WebhookAlerter::new(&url).unwrap();

        let result = alerter
            .deliver(
                "10.0.1.23".parse().unwrap(),
                Severity::Warning,
                &["port change".to_string()],
            )
            .await;
        assert!(result.is_err());
    }
}
