//! Network probing primitives behind the [`Prober`] seam.
//!
//! Transient network outcomes are values, not errors: an unreachable
//! host is `false`, a closed port is `false`, a failed banner read is
//! an empty string.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::config::{ProbeMethod, SweepConfig};

/// Low-level probe operations the sweep and enrichment stages depend on.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Test whether the host answers at all.
    async fn is_reachable(&self, ip: Ipv4Addr) -> bool;

    /// Attempt a TCP connect; true iff the port accepted the connection.
    async fn port_open(&self, ip: Ipv4Addr, port: u16) -> bool;

    /// Read a service banner from the port, decoded leniently and
    /// trimmed. Returns an empty string on any failure.
    async fn grab_banner(&self, ip: Ipv4Addr, port: u16) -> String;
}

/// Production prober backed by ICMP echo and plain TCP connects.
pub struct NetProber {
    method: ProbeMethod,
    handshake_port: u16,
    probe_timeout: Duration,
    banner_bytes: usize,
}

impl NetProber {
    pub fn new(cfg: &SweepConfig) -> Self {
        Self {
            method: cfg.reachability.clone(),
            handshake_port: cfg.handshake_port,
            probe_timeout: cfg.probe_timeout(),
            banner_bytes: cfg.banner_bytes,
        }
    }

    async fn icmp_echo(&self, ip: Ipv4Addr) -> bool {
        let payload = [0u8; 56];
        match timeout(self.probe_timeout, surge_ping::ping(IpAddr::V4(ip), &payload)).await {
            Ok(Ok((_reply, rtt))) => {
                tracing::trace!(ip = %ip, rtt_ms = rtt.as_millis() as u64, "ICMP echo reply");
                true
            }
            Ok(Err(_)) | Err(_) => false,
        }
    }

    /// An accepted or refused connection both prove a live stack; only
    /// silence (timeout) means nothing is there.
    async fn tcp_handshake(&self, ip: Ipv4Addr) -> bool {
        let addr = SocketAddr::new(IpAddr::V4(ip), self.handshake_port);
        matches!(
            timeout(self.probe_timeout, TcpStream::connect(addr)).await,
            Ok(_)
        )
    }
}

#[async_trait]
impl Prober for NetProber {
    async fn is_reachable(&self, ip: Ipv4Addr) -> bool {
        match self.method {
            ProbeMethod::Icmp => self.icmp_echo(ip).await,
            ProbeMethod::TcpHandshake => self.tcp_handshake(ip).await,
        }
    }

    async fn port_open(&self, ip: Ipv4Addr, port: u16) -> bool {
        let addr = SocketAddr::new(IpAddr::V4(ip), port);
        matches!(
            timeout(self.probe_timeout, TcpStream::connect(addr)).await,
            Ok(Ok(_))
        )
    }

    async fn grab_banner(&self, ip: Ipv4Addr, port: u16) -> String {
        let addr = SocketAddr::new(IpAddr::V4(ip), port);
        let mut stream = match timeout(self.probe_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            _ => return String::new(),
        };

        // Web servers stay silent until spoken to.
        if matches!(port, 80 | 8080) {
            let probe = timeout(
                self.probe_timeout,
                stream.write_all(b"HEAD / HTTP/1.0\r\n\r\n"),
            )
            .await;
            if !matches!(probe, Ok(Ok(()))) {
                return String::new();
            }
        }

        let mut buf = vec![0u8; self.banner_bytes];
        match timeout(self.probe_timeout, stream.read(&mut buf)).await {
            Ok(Ok(n)) => String::from_utf8_lossy(&buf[..n]).trim().to_string(),
            _ => String::new(),
        }
    }
}
