pub mod server;
pub mod snapshot;

// exports so callers can skip the full paths
pub use server::Server;
pub use snapshot::{DeviceReport, DeviceSnapshot, ProcessRecord, ServerReport};
