/*
* Availability & Occupancy Summarizer
* -----------------------------------
* The two questions every fleet page has to answer, per device:
*
* 1. Can I put work on it? -> classify() derives `free` (no process
*    attributed to the device) and `complete_free` (free AND nothing
*    reserved - zero utilization, zero used memory). The gap between the
*    two matters: a device can report zero processes while still holding
*    allocated-but-idle memory from something the collector could not
*    attribute, and that device is NOT fully available.
*
* 2. Who is on it? -> summarize_occupants() turns the raw newline-delimited
*    process field into a short digest ("alice, bob..." style) so a table
*    cell stays a table cell no matter how many notebooks people leave
*    running.
*
* Both are pure functions of the snapshot fields. No I/O, no state, no
* surprises.
*/

use crate::errors::MonitorResult;
use crate::fleet::snapshot::{DeviceReport, ProcessRecord};

/// How many occupant usernames a digest shows before truncating.
pub const DEFAULT_OCCUPANT_LIMIT: usize = 2;

/// Marker for a device with no occupants.
pub const NO_OCCUPANTS: &str = "-";

/// Appended when more occupants exist than the digest shows.
pub const MORE_OCCUPANTS: &str = "...";

/// Derived availability flags for one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Availability {
    pub free: bool,
    pub complete_free: bool,
}

/// Classifies a device report. `complete_free` implies `free` by
/// construction; nothing downstream needs to re-check that.
pub fn classify(report: &DeviceReport) -> Availability {
    let free = report.processes.is_empty();
    let complete_free =
        free && report.utilization_percent == 0.0 && report.memory_used_mb == 0;
    Availability { free, complete_free }
}

/// Renders the raw process-occupancy field into a bounded digest: the first
/// `limit` usernames in collector order, `", "`-joined, with `"..."`
/// appended when more records exist than are shown.
///
/// A line that fails to parse is a hard error - a malformed record means
/// the collector broke the format contract, and masking that would leave
/// the display silently wrong.
pub fn summarize_occupants(processes: &str, limit: usize) -> MonitorResult<String> {
    if processes.is_empty() {
        return Ok(NO_OCCUPANTS.to_string());
    }

    let records: Vec<&str> = processes.split('\n').collect();
    let mut usernames = Vec::with_capacity(limit.min(records.len()));
    for (idx, raw) in records.iter().take(limit).enumerate() {
        let record = ProcessRecord::parse(raw, idx + 1)?;
        usernames.push(record.username);
    }

    let mut digest = usernames.join(", ");
    if records.len() > limit {
        digest.push_str(MORE_OCCUPANTS);
    }
    Ok(digest)
}
