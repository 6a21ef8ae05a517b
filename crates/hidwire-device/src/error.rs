use hidwire_protocol::MessageType;

/// Errors that can occur in device operations.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] hidwire_transport::TransportError),

    /// Protocol-level error.
    #[error("protocol error: {0}")]
    Protocol(#[from] hidwire_protocol::ProtocolError),

    /// The device answered with a different message than the caller expected.
    #[error("unexpected message type {actual} (expected {expected})")]
    UnexpectedMessage {
        expected: MessageType,
        actual: MessageType,
    },

    /// The USB ids do not belong to a known model.
    #[error("unsupported device {vendor_id:04x}:{product_id:04x}")]
    UnsupportedDevice { vendor_id: u16, product_id: u16 },

    /// A JSON message body could not be encoded or decoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DeviceError>;
