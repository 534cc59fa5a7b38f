use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::fleet::snapshot::DeviceSnapshot;

/// One physical GPU host. Identified by its network address; devices are
/// keyed by their index on the host so they list in slot order.
///
/// Servers are never removed once seen - a host that stops reporting is
/// marked invalid and kept around for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub ip: String,
    pub hostname: String,
    /// Host answered the latest poll cycle.
    pub valid: bool,
    /// Administrator gate: whether new work may be scheduled onto this host.
    /// Has no effect on availability classification.
    pub can_use: bool,
    pub devices: BTreeMap<u32, DeviceSnapshot>,
}

impl Server {
    pub fn new(ip: impl Into<String>, hostname: impl Into<String>) -> Self {
        let server = Self {
            ip: ip.into(),
            hostname: hostname.into(),
            valid: true,
            can_use: false,
            devices: BTreeMap::new(),
        };
        info!(ip = %server.ip, hostname = %server.hostname, "Registered new server");
        server
    }

    pub fn set_valid(&mut self, valid: bool) {
        if self.valid != valid {
            info!(ip = %self.ip, valid, "Server validity changed");
        }
        self.valid = valid;
    }

    pub fn set_can_use(&mut self, can_use: bool) {
        info!(ip = %self.ip, can_use, "Server can_use toggled");
        self.can_use = can_use;
    }

    /// Most recent update across this server's devices, if any device has
    /// ever reported.
    pub fn last_seen(&self) -> Option<DateTime<Utc>> {
        self.devices.values().map(|d| d.updated_at).max()
    }
}
