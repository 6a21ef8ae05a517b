/// Errors that can occur in chunk transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// An I/O error occurred on the underlying HID device.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The device produced or was handed a chunk of the wrong size.
    #[error("unexpected chunk size ({actual} bytes, expected {expected})")]
    ChunkSizeMismatch { expected: usize, actual: usize },

    /// The device accepted neither the report-id-prefixed nor the bare probe report.
    #[error("unknown HID version")]
    UnknownHidVersion,

    /// The device handle has not been opened (or was already released).
    #[error("device handle is not open")]
    NotOpen,

    /// The transport has been closed; no more chunks are available.
    #[error("transport closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
