//! Configuration for the umbra-scan agent.
//!
//! Loaded from `umbra.toml` or `UMBRA__`-prefixed environment variables.
//! Every knob has a documented default so an empty config file is valid.

use std::time::Duration;

use serde::Deserialize;

/// Top-level agent configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Sweep tuning knobs.
    #[serde(default)]
    pub sweep: SweepConfig,

    /// Active audit knobs.
    #[serde(default)]
    pub audit: AuditConfig,

    /// History database location.
    #[serde(default = "default_store_path")]
    pub store_path: String,

    /// Webhook endpoint for WARNING-and-above alerts. Alerting is
    /// disabled when unset.
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Per-subnet scheduling configuration (daemon mode).
    #[serde(default)]
    pub subnets: Vec<SubnetSchedule>,

    /// Maximum concurrent sweeps in daemon mode.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_sweeps: usize,
}

/// Knobs for the discovery stage.
#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    /// Bounded worker-pool size: at most this many addresses are probed
    /// concurrently.
    #[serde(default = "default_pool_size")]
    pub worker_pool_size: usize,

    /// Per-probe timeout in milliseconds, applied to each reachability
    /// check, connect attempt, and banner read independently.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Candidate TCP ports probed on each reachable host, in order.
    #[serde(default = "default_candidate_ports")]
    pub candidate_ports: Vec<u16>,

    /// Byte budget for banner reads.
    #[serde(default = "default_banner_bytes")]
    pub banner_bytes: usize,

    /// How host reachability is tested.
    #[serde(default)]
    pub reachability: ProbeMethod,

    /// Port used by the TCP handshake reachability probe.
    #[serde(default = "default_handshake_port")]
    pub handshake_port: u16,
}

impl SweepConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

/// Reachability probe method.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeMethod {
    /// ICMP echo request. Needs ping sockets (root or a permissive
    /// `net.ipv4.ping_group_range`).
    #[default]
    Icmp,
    /// TCP connect to `handshake_port`: an accepted or refused
    /// connection both prove a live stack. Works unprivileged.
    TcpHandshake,
}

/// Knobs for the active audit stage.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Opt-in for the default-credential probe. This check performs real
    /// authentication attempts against live hosts and never runs unless
    /// an operator enables it explicitly.
    #[serde(default)]
    pub credential_checks: bool,

    /// Credential pairs tried in order by the default-credential probe.
    #[serde(default = "default_credentials")]
    pub credentials: Vec<CredentialPair>,

    /// Per-attempt HTTP timeout in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,
}

impl AuditConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }
}

/// A username/password pair for the default-credential probe.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CredentialPair {
    pub user: String,
    pub password: String,
}

impl CredentialPair {
    fn new(user: &str, password: &str) -> Self {
        Self {
            user: user.to_string(),
            password: password.to_string(),
        }
    }
}

/// A subnet with its sweep schedule (daemon mode).
#[derive(Debug, Clone, Deserialize)]
pub struct SubnetSchedule {
    /// Three-octet prefix target (e.g. "192.168.1").
    pub prefix: String,

    /// Human-readable name for this subnet.
    pub name: Option<String>,

    /// Sweep interval in seconds.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Whether this subnet is enabled for sweeping.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_pool_size() -> usize {
    50
}

fn default_probe_timeout_ms() -> u64 {
    1000
}

fn default_candidate_ports() -> Vec<u16> {
    vec![21, 22, 23, 80, 443, 8080, 1883, 502]
}

fn default_banner_bytes() -> usize {
    1024
}

fn default_handshake_port() -> u16 {
    443
}

fn default_credentials() -> Vec<CredentialPair> {
    vec![
        CredentialPair::new("admin", "admin"),
        CredentialPair::new("root", "root"),
        CredentialPair::new("admin", "password"),
        CredentialPair::new("user", "user"),
    ]
}

fn default_http_timeout_ms() -> u64 {
    2000
}

fn default_store_path() -> String {
    "./umbra.db".to_string()
}

fn default_max_concurrent() -> usize {
    4
}

fn default_interval() -> u64 {
    3600
}

fn default_true() -> bool {
    true
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: default_pool_size(),
            probe_timeout_ms: default_probe_timeout_ms(),
            candidate_ports: default_candidate_ports(),
            banner_bytes: default_banner_bytes(),
            reachability: ProbeMethod::default(),
            handshake_port: default_handshake_port(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            credential_checks: false,
            credentials: default_credentials(),
            http_timeout_ms: default_http_timeout_ms(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            sweep: SweepConfig::default(),
            audit: AuditConfig::default(),
            store_path: default_store_path(),
            webhook_url: None,
            subnets: Vec::new(),
            max_concurrent_sweeps: default_max_concurrent(),
        }
    }
}
