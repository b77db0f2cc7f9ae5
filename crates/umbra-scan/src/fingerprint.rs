//! Heuristic device fingerprinting from open ports and service banners.
//!
//! Rules run in a fixed order and a later applicable rule overwrites
//! earlier assignments (last-applicable-rule-wins, not first-match).
//! The RTSP rule in particular beats whatever the Windows or SSH rules
//! decided before it.

use std::net::Ipv4Addr;
use std::sync::Arc;

use crate::probe::Prober;

/// OS family and vendor guess for one host, plus the raw banner read
/// from its first open port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub os_family: String,
    pub vendor: String,
    pub raw_banner: Option<String>,
}

pub struct DeviceFingerprinter {
    prober: Arc<dyn Prober>,
}

impl DeviceFingerprinter {
    pub fn new(prober: Arc<dyn Prober>) -> Self {
        Self { prober }
    }

    /// Fingerprint one host. Deterministic for a fixed network fixture:
    /// identical (ip, open_ports, banners) always produce the same
    /// output.
    pub async fn analyze(&self, ip: Ipv4Addr, open_ports: &[u16]) -> Fingerprint {
        let mut os_family = "Unknown".to_string();
        let mut vendor = "Generic".to_string();
        let mut ssh_banner = None;

        if open_ports.contains(&445) || open_ports.contains(&3389) {
            os_family = "Windows".to_string();
            vendor = "Microsoft".to_string();
        } else if open_ports.contains(&22) {
            let banner = self.prober.grab_banner(ip, 22).await;
            if banner.contains("Ubuntu") {
                os_family = "Ubuntu Linux".to_string();
                vendor = "Canonical".to_string();
            } else if banner.contains("Raspbian") {
                os_family = "Raspberry Pi OS".to_string();
                vendor = "Raspberry Pi".to_string();
            } else {
                // Unrecognized SSH stack: generic Linux, vendor untouched.
                os_family = "Linux".to_string();
            }
            ssh_banner = Some(banner);
        }

        // RTSP wins over everything assigned above.
        if open_ports.contains(&554) {
            vendor = "Potential Camera/NVR".to_string();
            os_family = "Embedded Linux".to_string();
        }

        let raw_banner = match open_ports.first() {
            Some(&22) if ssh_banner.is_some() => ssh_banner,
            Some(&port) => Some(self.prober.grab_banner(ip, port).await),
            None => None,
        };

        Fingerprint {
            os_family,
            vendor,
            raw_banner,
        }
    }
}
