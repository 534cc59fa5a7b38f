use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::availability::summarize_occupants;
use crate::errors::MonitorResult;
use crate::fleet::server::Server;
use crate::fleet::snapshot::DeviceSnapshot;

/// Shown in place of a percentage when the stored totals cannot produce one.
pub const UNKNOWN_MEMORY: &str = "unknown";

/// Display tuple for one device, ready for any rendering layer (terminal
/// table, web table, JSON API). Rendering layers consume this instead of
/// re-deriving classification or digest logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceView {
    pub name: String,
    pub utilization_percent: f64,
    pub memory_usage: String,
    pub occupants: String,
    pub free: bool,
    pub complete_free: bool,
    pub updated_at: DateTime<Utc>,
}

impl DeviceView {
    pub fn from_snapshot(snapshot: &DeviceSnapshot, occupant_limit: usize) -> MonitorResult<Self> {
        Ok(Self {
            name: snapshot.name.clone(),
            utilization_percent: snapshot.utilization_percent,
            memory_usage: format_memory_usage(snapshot.memory_used_mb, snapshot.memory_total_mb),
            occupants: summarize_occupants(&snapshot.processes, occupant_limit)?,
            free: snapshot.free,
            complete_free: snapshot.complete_free,
            updated_at: snapshot.updated_at,
        })
    }
}

/// Display tuple for one server with its devices in index order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerView {
    pub ip: String,
    pub hostname: String,
    pub valid: bool,
    pub can_use: bool,
    pub devices: Vec<DeviceView>,
}

impl ServerView {
    pub fn from_server(server: &Server, occupant_limit: usize) -> MonitorResult<Self> {
        let devices = server
            .devices
            .values()
            .map(|snapshot| DeviceView::from_snapshot(snapshot, occupant_limit))
            .collect::<MonitorResult<Vec<_>>>()?;
        Ok(Self {
            ip: server.ip.clone(),
            hostname: server.hostname.clone(),
            valid: server.valid,
            can_use: server.can_use,
            devices,
        })
    }
}

/// Memory usage percentage, rounded to the nearest integer. `None` when the
/// stored fields cannot yield a sane percentage (zero total, or used past
/// total) - display code shows "unknown" for those rather than a fatal
/// error, since they only reach here from a snapshot that predates stricter
/// ingest validation.
pub fn memory_percent(used_mb: u64, total_mb: u64) -> Option<u8> {
    if total_mb == 0 || used_mb > total_mb {
        return None;
    }
    Some((used_mb as f64 / total_mb as f64 * 100.0).round() as u8)
}

/// Formats the usage column: `"<used> / <total> MB (<pct>%)"`.
pub fn format_memory_usage(used_mb: u64, total_mb: u64) -> String {
    match memory_percent(used_mb, total_mb) {
        Some(pct) => format!("{} / {} MB ({}%)", used_mb, total_mb, pct),
        None => UNKNOWN_MEMORY.to_string(),
    }
}
