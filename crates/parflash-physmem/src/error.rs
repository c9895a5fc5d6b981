//! Error types for physical memory and port access

use thiserror::Error;

/// Physical memory backend errors
#[derive(Debug, Error)]
pub enum PhysMemError {
    /// Failed to open /dev/mem
    #[error("Failed to open /dev/mem: {source}")]
    OpenFailed {
        #[source]
        source: std::io::Error,
    },

    /// mmap of the requested range failed
    #[error("Failed to map {size:#x} bytes at {address:#x}: {source}")]
    MemoryMap {
        address: u64,
        size: usize,
        #[source]
        source: std::io::Error,
    },

    /// Raising the I/O privilege level failed
    #[error("Failed to get I/O port access (are you root?): {0}")]
    PortAccess(#[source] std::io::Error),

    /// Invalid programmer parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Not available on this platform
    #[error("Not supported: {0}")]
    NotSupported(&'static str),
}

/// Result type for physical memory operations
pub type Result<T> = std::result::Result<T, PhysMemError>;
