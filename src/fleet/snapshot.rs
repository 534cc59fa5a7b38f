use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::availability::Availability;
use crate::errors::{MonitorError, MonitorResult};

/// One GPU device's state as delivered by the collector on a poll cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceReport {
    /// Slot index, unique within a server.
    pub index: u32,
    /// Hardware identifier, globally unique (e.g. an NVML GPU UUID).
    pub uuid: String,
    pub name: String,
    pub utilization_percent: f64,
    pub memory_total_mb: u64,
    pub memory_used_mb: u64,
    /// Newline-delimited serialized process records; empty means no active
    /// processes were attributed to the device.
    pub processes: String,
}

impl DeviceReport {
    /// Rejects snapshots the collector should never produce. A zero memory
    /// total would poison every percentage downstream, so it is surfaced
    /// here instead of at render time.
    pub fn validate(&self) -> MonitorResult<()> {
        if self.memory_total_mb == 0 {
            return Err(MonitorError::InvalidSnapshot {
                uuid: self.uuid.clone(),
                message: "memory_total_mb is zero".to_string(),
            });
        }
        if self.memory_used_mb > self.memory_total_mb {
            return Err(MonitorError::InvalidSnapshot {
                uuid: self.uuid.clone(),
                message: format!(
                    "memory_used_mb {} exceeds memory_total_mb {}",
                    self.memory_used_mb, self.memory_total_mb
                ),
            });
        }
        Ok(())
    }
}

/// One server's payload for a poll cycle: the host plus every device the
/// collector saw on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerReport {
    pub ip: String,
    pub hostname: String,
    pub devices: Vec<DeviceReport>,
}

/// Latest-known state of one device, owned by exactly one server.
/// Overwritten in place on every poll cycle - no history is kept here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub index: u32,
    pub uuid: String,
    pub name: String,
    pub utilization_percent: f64,
    pub memory_total_mb: u64,
    pub memory_used_mb: u64,
    pub processes: String,
    /// No process currently attributed to the device.
    pub free: bool,
    /// Free, and nothing reserved either: utilization and used memory both
    /// zero. Strictly stronger than `free`.
    pub complete_free: bool,
    pub updated_at: DateTime<Utc>,
}

impl DeviceSnapshot {
    /// Builds the stored snapshot from a validated report plus its derived
    /// availability flags. Only the registry's ingest path calls this, so
    /// the flags can never drift from the raw fields they derive from.
    pub(crate) fn from_report(
        report: DeviceReport,
        availability: Availability,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            index: report.index,
            uuid: report.uuid,
            name: report.name,
            utilization_percent: report.utilization_percent,
            memory_total_mb: report.memory_total_mb,
            memory_used_mb: report.memory_used_mb,
            processes: report.processes,
            free: availability.free,
            complete_free: availability.complete_free,
            updated_at: now,
        }
    }
}

/// One process occupying a device, as one JSON line of the raw `processes`
/// field. Field-keyed so the collector can grow the record without breaking
/// older consumers; unknown fields land in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_used_mb: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<u32>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl ProcessRecord {
    /// Parses one line of the raw occupancy field. `line` is 1-based and
    /// only used for error reporting.
    pub fn parse(raw: &str, line: usize) -> MonitorResult<Self> {
        serde_json::from_str(raw).map_err(|e| MonitorError::MalformedRecord {
            line,
            message: e.to_string(),
        })
    }
}
