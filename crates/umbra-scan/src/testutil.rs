//! Shared test fixtures: a scriptable prober and a recording alert sink.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use rand::Rng;

use umbra_core::types::Severity;

use crate::alert::AlertSink;
use crate::error::Result;
use crate::probe::Prober;

/// Scriptable network fixture for sweep and enrichment tests.
///
/// Hosts registered via [`host`](Self::host) answer reachability checks;
/// their listed ports accept connects; banners come from the scripted
/// table. Optional jitter randomizes per-target latency so concurrency
/// tests exercise out-of-order completion.
#[derive(Default)]
pub(crate) struct FakeProber {
    open: HashMap<Ipv4Addr, Vec<u16>>,
    banners: HashMap<(Ipv4Addr, u16), String>,
    jitter_ms: Option<(u64, u64)>,
    reachability_checks: Mutex<HashMap<Ipv4Addr, u32>>,
    live: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeProber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reachable host with its open ports.
    pub fn host(mut self, ip: &str, ports: Vec<u16>) -> Self {
        self.open.insert(ip.parse().unwrap(), ports);
        self
    }

    /// Script the banner served on one host's port.
    pub fn banner(mut self, ip: &str, port: u16, text: &str) -> Self {
        self.banners
            .insert((ip.parse().unwrap(), port), text.to_string());
        self
    }

    /// Sleep a random duration in `min..=max` ms inside each
    /// reachability check.
    pub fn jitter_ms(mut self, min: u64, max: u64) -> Self {
        self.jitter_ms = Some((min, max));
        self
    }

    /// How many times each address was reachability-checked.
    pub fn reachability_counts(&self) -> HashMap<Ipv4Addr, u32> {
        self.reachability_checks.lock().unwrap().clone()
    }

    /// Highest number of concurrently in-flight reachability checks.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for FakeProber {
    async fn is_reachable(&self, ip: Ipv4Addr) -> bool {
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(live, Ordering::SeqCst);

        *self
            .reachability_checks
            .lock()
            .unwrap()
            .entry(ip)
            .or_insert(0) += 1;

        if let Some((min, max)) = self.jitter_ms {
            let sleep_ms = rand::rng().random_range(min..=max);
            tokio::time::sleep(std::time::Duration::from_millis(sleep_ms)).await;
        }

        self.live.fetch_sub(1, Ordering::SeqCst);
        self.open.contains_key(&ip)
    }

    async fn port_open(&self, ip: Ipv4Addr, port: u16) -> bool {
        self.open.get(&ip).is_some_and(|ports| ports.contains(&port))
    }

    async fn grab_banner(&self, ip: Ipv4Addr, port: u16) -> String {
        self.banners.get(&(ip, port)).cloned().unwrap_or_default()
    }
}

/// Alert sink that records every delivery.
#[derive(Default)]
pub(crate) struct RecordingAlerter {
    pub delivered: Mutex<Vec<(Ipv4Addr, Severity, Vec<String>)>>,
}

impl RecordingAlerter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliveries(&self) -> Vec<(Ipv4Addr, Severity, Vec<String>)> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertSink for RecordingAlerter {
    async fn deliver(&self, ip: Ipv4Addr, severity: Severity, messages: &[String]) -> Result<()> {
        self.delivered
            .lock()
            .unwrap()
            .push((ip, severity, messages.to_vec()));
        Ok(())
    }
}
