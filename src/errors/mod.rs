use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Malformed process record at line {line}: {message}")]
    MalformedRecord {
        line: usize,
        message: String,
    },

    #[error("Invalid snapshot for device {uuid}: {message}")]
    InvalidSnapshot {
        uuid: String,
        message: String,
    },

    #[error("Server not found: {ip}")]
    ServerNotFound {
        ip: String,
    },

    #[error("Device {index} not found on server {ip}")]
    DeviceNotFound {
        ip: String,
        index: u32,
    },
}

// Result type alias for convenience
pub type MonitorResult<T> = Result<T, MonitorError>;
