use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use tokio::sync::Mutex;

use gpu_fleet_monitor::errors::MonitorError;
use gpu_fleet_monitor::ingest::{ingest_once, SnapshotSource};
use gpu_fleet_monitor::{DeviceReport, FleetRegistry, ServerReport, DEFAULT_OCCUPANT_LIMIT};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn device(index: u32, used_mb: u64, processes: &str) -> DeviceReport {
    DeviceReport {
        index,
        uuid: format!("GPU-aa00-{index}"),
        name: "NVIDIA A100-SXM4-40GB".to_string(),
        utilization_percent: if processes.is_empty() { 0.0 } else { 63.0 },
        memory_total_mb: 40960,
        memory_used_mb: used_mb,
        processes: processes.to_string(),
    }
}

fn cycle(ips: &[&str]) -> Vec<ServerReport> {
    ips.iter()
        .map(|ip| ServerReport {
            ip: ip.to_string(),
            hostname: format!("node-{}", ip.rsplit('.').next().unwrap()),
            devices: vec![device(0, 0, ""), device(1, 2048, r#"{"username":"alice"}"#)],
        })
        .collect()
}

#[tokio::test]
async fn test_concurrent_reports() {
    let registry = Arc::new(Mutex::new(FleetRegistry::new()));
    let mut handles = vec![];

    for i in 0..10 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            let mut registry = registry.lock().await;
            registry.record_report(
                "10.0.0.7",
                "node-7",
                device(i, 1024, r#"{"username":"bob"}"#),
                Utc::now(),
            )
        }));
    }

    let results = join_all(handles).await;
    assert!(results.iter().all(|r| r.as_ref().unwrap().is_ok()));

    let registry = registry.lock().await;
    let server = registry.server("10.0.0.7").unwrap();
    assert_eq!(server.devices.len(), 10);
}

#[tokio::test]
async fn test_poll_cycle_marks_missing_servers_invalid() {
    let mut registry = FleetRegistry::new();

    let errors = registry.apply_poll(cycle(&["10.0.0.1", "10.0.0.2"]), Utc::now());
    assert!(errors.is_empty());
    assert!(registry.server("10.0.0.1").unwrap().valid);
    assert!(registry.server("10.0.0.2").unwrap().valid);

    // Next cycle only one host answers.
    registry.apply_poll(cycle(&["10.0.0.2"]), Utc::now());
    assert!(!registry.server("10.0.0.1").unwrap().valid);
    assert!(registry.server("10.0.0.2").unwrap().valid);

    // The silent host is kept, devices and all.
    assert_eq!(registry.server("10.0.0.1").unwrap().devices.len(), 2);
}

#[tokio::test]
async fn test_snapshot_overwritten_in_place() {
    let mut registry = FleetRegistry::new();
    registry
        .record_report("10.0.0.3", "node-3", device(0, 0, ""), Utc::now())
        .unwrap();
    assert!(registry.device("10.0.0.3", 0).unwrap().complete_free);

    registry
        .record_report(
            "10.0.0.3",
            "node-3",
            device(0, 38000, r#"{"username":"carol"}"#),
            Utc::now(),
        )
        .unwrap();

    let server = registry.server("10.0.0.3").unwrap();
    assert_eq!(server.devices.len(), 1);
    assert!(server.last_seen().is_some());
    let snapshot = registry.device("10.0.0.3", 0).unwrap();
    assert!(!snapshot.free);
    assert_eq!(snapshot.memory_used_mb, 38000);
}

#[tokio::test]
async fn test_invalid_report_keeps_previous_snapshot() {
    let mut registry = FleetRegistry::new();
    registry
        .record_report("10.0.0.4", "node-4", device(0, 512, ""), Utc::now())
        .unwrap();

    // 50000 MB used against a 40960 MB total
    let bad = device(0, 50000, "");
    let err = registry
        .record_report("10.0.0.4", "node-4", bad, Utc::now())
        .unwrap_err();
    assert!(matches!(err, MonitorError::InvalidSnapshot { .. }));

    assert_eq!(registry.device("10.0.0.4", 0).unwrap().memory_used_mb, 512);
}

#[tokio::test]
async fn test_can_use_toggle() {
    let mut registry = FleetRegistry::new();

    let err = registry.set_can_use("10.0.0.5", true).unwrap_err();
    assert!(matches!(err, MonitorError::ServerNotFound { .. }));

    registry.apply_poll(cycle(&["10.0.0.5"]), Utc::now());
    registry.set_can_use("10.0.0.5", true).unwrap();

    let server = registry.server("10.0.0.5").unwrap();
    assert!(server.can_use);
    // The gate changes nothing about availability.
    assert!(registry.device("10.0.0.5", 0).unwrap().complete_free);
}

#[tokio::test]
async fn test_device_lookup_errors() {
    let mut registry = FleetRegistry::new();
    registry.apply_poll(cycle(&["10.0.0.6"]), Utc::now());

    let view = registry.device_view("10.0.0.6", 1, 1).unwrap();
    assert_eq!(view.occupants, "alice");

    let err = registry.device_view("10.0.0.6", 9, 1).unwrap_err();
    assert!(matches!(err, MonitorError::DeviceNotFound { .. }));
    let err = registry.device_view("10.9.9.9", 0, 1).unwrap_err();
    assert!(matches!(err, MonitorError::ServerNotFound { .. }));
}

#[tokio::test]
async fn test_views_across_the_fleet() {
    let mut registry = FleetRegistry::new();
    registry.apply_poll(cycle(&["10.0.0.9", "10.0.0.8"]), Utc::now());

    let views = registry.server_views(DEFAULT_OCCUPANT_LIMIT).unwrap();
    assert_eq!(views.len(), 2);
    // ip order, not insertion order
    assert_eq!(views[0].ip, "10.0.0.8");
    assert_eq!(views[1].ip, "10.0.0.9");

    let idle = &views[0].devices[0];
    assert!(idle.free && idle.complete_free);
    assert_eq!(idle.occupants, "-");
    assert_eq!(idle.memory_usage, "0 / 40960 MB (0%)");

    let busy = &views[0].devices[1];
    assert!(!busy.free && !busy.complete_free);
    assert_eq!(busy.occupants, "alice");
    assert_eq!(busy.memory_usage, "2048 / 40960 MB (5%)");
}

struct ScriptedCollector {
    cycles: Mutex<Vec<Vec<ServerReport>>>,
}

#[async_trait]
impl SnapshotSource for ScriptedCollector {
    async fn poll(&self) -> anyhow::Result<Vec<ServerReport>> {
        let mut cycles = self.cycles.lock().await;
        if cycles.is_empty() {
            anyhow::bail!("collector unreachable");
        }
        Ok(cycles.remove(0))
    }
}

#[tokio::test]
async fn test_ingest_through_a_source() {
    init_tracing();
    let registry = Arc::new(Mutex::new(FleetRegistry::new()));
    let source = ScriptedCollector {
        cycles: Mutex::new(vec![cycle(&["10.0.1.1"]), vec![]]),
    };

    ingest_once(&registry, &source).await.unwrap();
    assert!(registry.lock().await.server("10.0.1.1").unwrap().valid);

    // Second cycle comes back empty: the host goes invalid but stays known.
    ingest_once(&registry, &source).await.unwrap();
    let guard = registry.lock().await;
    let server = guard.server("10.0.1.1").unwrap();
    assert!(!server.valid);
    drop(guard);

    // Collector down: the poll error propagates, state is untouched.
    assert!(ingest_once(&registry, &source).await.is_err());
    assert!(!registry.lock().await.server("10.0.1.1").unwrap().valid);
}
