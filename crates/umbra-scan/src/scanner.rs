//! Bounded-concurrency subnet sweep.
//!
//! Probes every address of a /24 range exactly once through a worker
//! pool. Unreachable hosts and closed ports are absence, never errors;
//! a worker dying unexpectedly is logged and costs only its own target.

use std::net::Ipv4Addr;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use umbra_core::types::{HostRecord, SubnetPrefix};

use crate::classify;
use crate::config::SweepConfig;
use crate::probe::Prober;

/// Concurrent scanner for one /24-sized address range.
pub struct SubnetScanner {
    prober: Arc<dyn Prober>,
    candidate_ports: Arc<Vec<u16>>,
    pool_size: usize,
}

impl SubnetScanner {
    pub fn new(prober: Arc<dyn Prober>, cfg: &SweepConfig) -> Self {
        Self {
            prober,
            candidate_ports: Arc::new(cfg.candidate_ports.clone()),
            pool_size: cfg.worker_pool_size,
        }
    }

    /// Sweep `prefix.1 ..= prefix.254`, at most `pool_size` addresses
    /// concurrently. After cancellation no new probes start; in-flight
    /// probes run to completion or their own timeout.
    pub async fn sweep(
        &self,
        prefix: SubnetPrefix,
        cancel: &CancellationToken,
    ) -> Vec<HostRecord> {
        tracing::info!(subnet = %prefix, pool_size = self.pool_size, "Starting subnet sweep");

        let pool = Arc::new(Semaphore::new(self.pool_size));
        let mut workers: JoinSet<Option<HostRecord>> = JoinSet::new();

        for ip in prefix.hosts() {
            let prober = self.prober.clone();
            let ports = self.candidate_ports.clone();
            let pool = pool.clone();
            let cancel = cancel.clone();

            workers.spawn(async move {
                let Ok(_permit) = pool.acquire_owned().await else {
                    return None;
                };
                if cancel.is_cancelled() {
                    return None;
                }
                scan_target(prober.as_ref(), ip, &ports).await
            });
        }

        let mut records = Vec::new();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => tracing::error!(error = %e, "Sweep worker failed"),
            }
        }

        // Completion order is unspecified; return a stable ordering.
        records.sort_by_key(|r| r.ip);

        tracing::info!(subnet = %prefix, hosts = records.len(), "Sweep complete");
        records
    }
}

/// Probe a single address: reachability first, then each candidate port
/// in order.
async fn scan_target(prober: &dyn Prober, ip: Ipv4Addr, ports: &[u16]) -> Option<HostRecord> {
    if !prober.is_reachable(ip).await {
        return None;
    }

    let mut open_ports = Vec::new();
    for &port in ports {
        if prober.port_open(ip, port).await {
            open_ports.push(port);
        }
    }

    let hints = classify::protocol_hints(&open_ports);
    tracing::info!(ip = %ip, open_ports = ?open_ports, "Asset discovered");
    Some(HostRecord::discovered(ip, open_ports, hints))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeProber;

    fn scanner_with(prober: Arc<FakeProber>, pool_size: usize) -> SubnetScanner {
        SubnetScanner::new(
            prober,
            &SweepConfig {
                worker_pool_size: pool_size,
                ..SweepConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn sweep_records_only_reachable_hosts() {
        let prober = Arc::new(
            FakeProber::new()
                .host("10.0.1.5", vec![22, 80])
                .host("10.0.1.9", vec![]),
        );
        let scanner = scanner_with(prober, 8);
        let prefix: SubnetPrefix = "10.0.1".parse().unwrap();

        let records = scanner.sweep(prefix, &CancellationToken::new()).await;

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.reachable));
        assert_eq!(records[0].ip, "10.0.1.5".parse::<Ipv4Addr>().unwrap());
        assert_eq!(records[0].open_ports, vec![22, 80]);
        assert_eq!(records[0].protocol_hints, vec!["SSH", "HTTP"]);
        assert_eq!(records[1].ip, "10.0.1.9".parse::<Ipv4Addr>().unwrap());
        assert!(records[1].open_ports.is_empty());
    }

    #[tokio::test]
    async fn open_ports_stay_within_candidate_list() {
        // The fake claims a port outside the candidate list; the sweep
        // must never probe (or report) it.
        let prober = Arc::new(FakeProber::new().host("10.0.1.5", vec![22, 31337]));
        let scanner = scanner_with(prober, 8);
        let prefix: SubnetPrefix = "10.0.1".parse().unwrap();

        let records = scanner.sweep(prefix, &CancellationToken::new()).await;

        let candidates = SweepConfig::default().candidate_ports;
        assert_eq!(records.len(), 1);
        assert!(records[0].open_ports.iter().all(|p| candidates.contains(p)));
        assert_eq!(records[0].open_ports, vec![22]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn every_target_probed_exactly_once_with_bounded_pool() {
        let mut prober = FakeProber::new().jitter_ms(1, 10);
        for host in 1..=40u8 {
            if host % 3 == 0 {
                prober = prober.host(&format!("10.0.1.{host}"), vec![80]);
            }
        }
        let prober = Arc::new(prober);
        let scanner = scanner_with(prober.clone(), 10);
        let prefix: SubnetPrefix = "10.0.1".parse().unwrap();

        let records = scanner.sweep(prefix, &CancellationToken::new()).await;

        // Every address in the range, up or not, was probed exactly once.
        let counts = prober.reachability_counts();
        assert_eq!(counts.len(), 254);
        assert!(counts.values().all(|&n| n == 1));

        // The pool bound held and the sweep terminated with all
        // reachable hosts accounted for.
        assert!(prober.peak_concurrency() <= 10);
        assert_eq!(records.len(), 13);
    }

    #[tokio::test]
    async fn cancelled_sweep_schedules_no_probes() {
        let prober = Arc::new(FakeProber::new().host("10.0.1.5", vec![22]));
        let scanner = scanner_with(prober.clone(), 8);
        let prefix: SubnetPrefix = "10.0.1".parse().unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let records = scanner.sweep(prefix, &cancel).await;

        assert!(records.is_empty());
        assert!(prober.reachability_counts().is_empty());
    }
}
