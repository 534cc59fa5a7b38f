use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::availability::classify;
use crate::errors::{MonitorError, MonitorResult};
use crate::fleet::server::Server;
use crate::fleet::snapshot::{DeviceReport, DeviceSnapshot, ServerReport};
use crate::view::{DeviceView, ServerView};

/// In-memory latest-state store for the whole fleet. Servers are keyed by
/// ip and devices by index, so iteration order matches how the fleet is
/// listed to humans.
///
/// Mutation happens on exactly two paths: snapshot ingest (from the
/// collector) and the administrative `set_can_use` toggle. Everything else
/// is read-only projection.
#[derive(Debug, Default)]
pub struct FleetRegistry {
    servers: BTreeMap<String, Server>,
}

impl FleetRegistry {
    pub fn new() -> Self {
        Self {
            servers: BTreeMap::new(),
        }
    }

    /// Validates and stores one device report, registering the server on
    /// first contact. The stored snapshot carries availability flags
    /// derived here, and `updated_at` is stamped with the cycle time the
    /// caller passes in.
    ///
    /// An invalid report leaves the previously stored snapshot untouched.
    pub fn record_report(
        &mut self,
        ip: &str,
        hostname: &str,
        report: DeviceReport,
        now: DateTime<Utc>,
    ) -> MonitorResult<()> {
        report.validate()?;
        let availability = classify(&report);

        let server = self
            .servers
            .entry(ip.to_string())
            .or_insert_with(|| Server::new(ip, hostname));
        server.hostname = hostname.to_string();
        server.set_valid(true);

        let snapshot = DeviceSnapshot::from_report(report, availability, now);
        server.devices.insert(snapshot.index, snapshot);
        Ok(())
    }

    /// Applies one full collector cycle: every reported server is upserted
    /// and marked valid, every known server missing from the cycle is
    /// marked invalid (never removed - stale hosts stay visible for audit).
    ///
    /// Device-level failures are collected and returned so one bad report
    /// cannot abort the rest of the cycle; the affected server still counts
    /// as reporting.
    pub fn apply_poll(&mut self, reports: Vec<ServerReport>, now: DateTime<Utc>) -> Vec<MonitorError> {
        let reported: HashSet<String> = reports.iter().map(|r| r.ip.clone()).collect();
        for (ip, server) in self.servers.iter_mut() {
            if !reported.contains(ip) {
                server.set_valid(false);
            }
        }

        let mut errors = Vec::new();
        for report in reports {
            // Register hosts that reported no devices too.
            self.servers
                .entry(report.ip.clone())
                .or_insert_with(|| Server::new(report.ip.as_str(), report.hostname.as_str()))
                .set_valid(true);

            for device in report.devices {
                if let Err(e) = self.record_report(&report.ip, &report.hostname, device, now) {
                    warn!(ip = %report.ip, error = %e, "Skipping device report");
                    errors.push(e);
                }
            }
        }
        errors
    }

    /// The administrative inbound: permit or forbid scheduling onto a host.
    /// Classification and digests are unaffected.
    pub fn set_can_use(&mut self, ip: &str, can_use: bool) -> MonitorResult<()> {
        let server = self.servers.get_mut(ip).ok_or_else(|| MonitorError::ServerNotFound {
            ip: ip.to_string(),
        })?;
        server.set_can_use(can_use);
        Ok(())
    }

    pub fn server(&self, ip: &str) -> Option<&Server> {
        self.servers.get(ip)
    }

    /// Servers in ip order.
    pub fn servers(&self) -> impl Iterator<Item = &Server> {
        self.servers.values()
    }

    pub fn device(&self, ip: &str, index: u32) -> MonitorResult<&DeviceSnapshot> {
        let server = self.server(ip).ok_or_else(|| MonitorError::ServerNotFound {
            ip: ip.to_string(),
        })?;
        server.devices.get(&index).ok_or_else(|| MonitorError::DeviceNotFound {
            ip: ip.to_string(),
            index,
        })
    }

    /// Read-model projection for one device. Digest parse failures
    /// propagate to the caller, which decides how to degrade the display.
    pub fn device_view(&self, ip: &str, index: u32, occupant_limit: usize) -> MonitorResult<DeviceView> {
        DeviceView::from_snapshot(self.device(ip, index)?, occupant_limit)
    }

    /// Read-model projection for the whole fleet, servers in ip order and
    /// devices in index order.
    pub fn server_views(&self, occupant_limit: usize) -> MonitorResult<Vec<ServerView>> {
        self.servers
            .values()
            .map(|server| ServerView::from_server(server, occupant_limit))
            .collect()
    }
}
