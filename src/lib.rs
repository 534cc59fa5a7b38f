pub mod availability;
pub mod config;
pub mod errors;
pub mod fleet;
pub mod ingest;
pub mod registry;
pub mod view;

// Re-exports
pub use availability::{classify, summarize_occupants, Availability, DEFAULT_OCCUPANT_LIMIT};
pub use errors::{MonitorError, MonitorResult};
pub use fleet::server::Server;
pub use fleet::snapshot::{DeviceReport, DeviceSnapshot, ProcessRecord, ServerReport};
pub use ingest::SnapshotSource;
pub use registry::FleetRegistry;
pub use view::{DeviceView, ServerView};
pub type AsyncMutex<T> = tokio::sync::Mutex<T>;
