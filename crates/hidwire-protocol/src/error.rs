use hidwire_transport::TransportError;

/// Errors that can occur while framing or exchanging messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A chunk did not start with the marker or tag its position requires.
    #[error(
        "malformed frame: expected magic {}, got {}",
        hex::encode(.expected),
        hex::encode(.actual)
    )]
    MalformedFrame { expected: Vec<u8>, actual: Vec<u8> },

    /// A chunk carried a session id other than the one negotiated.
    #[error("session mismatch, expected {expected:08x}, got {actual:08x}")]
    SessionMismatch { expected: u32, actual: u32 },

    /// A V2 message exchange was attempted before a session was opened.
    #[error("missing session for v2 protocol")]
    MissingSession,

    /// The device answered a session open/close with the wrong tag.
    #[error("handshake failed: expected tag {expected:#04x}, got {actual:#04x}")]
    HandshakeFailed { expected: u8, actual: u8 },

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The message type does not fit the protocol's header field.
    #[error("message type {message_type} out of range (max {max})")]
    MessageTypeOutOfRange { message_type: u32, max: u32 },

    /// Chunk transport failure, passed through unchanged.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
