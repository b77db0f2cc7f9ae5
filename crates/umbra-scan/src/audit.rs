//! Active vulnerability checks against a host's open ports.
//!
//! Checks are independent and cumulative. The default-credential probe
//! performs real authentication attempts against live hosts, so it is a
//! separately enabled capability: unless `audit.credential_checks` is
//! set, only passive checks run.

use std::net::Ipv4Addr;

use reqwest::StatusCode;

use umbra_core::types::{Finding, Severity};

use crate::config::{AuditConfig, CredentialPair};
use crate::error::Result;

/// Ports probed for HTTP Basic Auth default credentials.
const HTTP_PORTS: [u16; 2] = [80, 8080];

pub struct VulnerabilityAuditor {
    http: reqwest::Client,
    credentials: Vec<CredentialPair>,
    credential_checks: bool,
}

impl VulnerabilityAuditor {
    pub fn new(cfg: &AuditConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(cfg.http_timeout())
            .build()?;

        Ok(Self {
            http,
            credentials: cfg.credentials.clone(),
            credential_checks: cfg.credential_checks,
        })
    }

    /// Run all enabled checks against one host.
    pub async fn audit(&self, ip: Ipv4Addr, open_ports: &[u16]) -> Vec<Finding> {
        let mut findings = Vec::new();

        if open_ports.contains(&23) {
            findings.push(Finding::new(
                Severity::Critical,
                "Insecure Protocol",
                "Telnet service detected. Traffic is unencrypted.",
            ));
        }

        if self.credential_checks {
            for port in HTTP_PORTS {
                if !open_ports.contains(&port) {
                    continue;
                }
                let url = format!("http://{ip}:{port}/");
                if let Some(pair) = self.try_default_credentials(&url).await {
                    findings.push(Finding::new(
                        Severity::High,
                        "Default Credentials",
                        format!(
                            "HTTP Basic Auth accepts {}/{} on port {port}",
                            pair.user, pair.password
                        ),
                    ));
                }
            }
        }

        findings
    }

    /// Walk the credential list in order; the first accepted pair wins.
    /// Per-attempt network errors advance the loop, they never surface.
    async fn try_default_credentials(&self, base_url: &str) -> Option<&CredentialPair> {
        for pair in &self.credentials {
            let attempt = self
                .http
                .get(base_url)
                .basic_auth(&pair.user, Some(&pair.password))
                .send()
                .await;

            match attempt {
                Ok(response) if response.status() == StatusCode::OK => return Some(pair),
                Ok(_) => {}
                Err(e) => {
                    tracing::trace!(url = base_url, error = %e, "Credential attempt failed");
                }
            }
        }
        None
    }
}
