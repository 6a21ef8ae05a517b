use hidwire_transport::ChunkTransport;

use crate::codec::{Frame, MessageType, ProtocolConfig};
use crate::error::Result;
use crate::v1::ProtocolV1;
use crate::v2::ProtocolV2;

/// On-wire protocol generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolVersion {
    /// Header-only framing, no session.
    V1,
    /// Session-oriented framing with an explicit handshake.
    V2,
}

impl ProtocolVersion {
    /// Short lowercase name for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            ProtocolVersion::V1 => "v1",
            ProtocolVersion::V2 => "v2",
        }
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Typed message exchange over a [`ChunkTransport`].
///
/// Every call blocks for the duration of its chunk I/O and returns the first
/// failure without retrying.
pub trait Protocol {
    /// Protocol generation implemented.
    fn version(&self) -> ProtocolVersion;

    /// Whether a negotiated session is active. Always false for stateless framing.
    fn has_session(&self) -> bool;

    /// Establish whatever state the protocol needs before exchanging messages.
    fn begin_session<T: ChunkTransport + ?Sized>(&mut self, transport: &mut T) -> Result<()>;

    /// Tear down the state created by [`begin_session`](Self::begin_session).
    fn end_session<T: ChunkTransport + ?Sized>(&mut self, transport: &mut T) -> Result<()>;

    /// Frame `payload` and send it as a sequence of chunks.
    fn write_message<T: ChunkTransport + ?Sized>(
        &mut self,
        transport: &mut T,
        message_type: MessageType,
        payload: &[u8],
    ) -> Result<()>;

    /// Receive chunks until one complete message has been reassembled.
    fn read_message<T: ChunkTransport + ?Sized>(&mut self, transport: &mut T) -> Result<Frame>;
}

/// Either protocol generation, chosen at runtime.
#[derive(Debug, Clone)]
pub enum WireProtocol {
    V1(ProtocolV1),
    V2(ProtocolV2),
}

impl WireProtocol {
    /// Fresh protocol state for the given generation.
    pub fn new(version: ProtocolVersion, config: ProtocolConfig) -> Self {
        match version {
            ProtocolVersion::V1 => WireProtocol::V1(ProtocolV1::with_config(config)),
            ProtocolVersion::V2 => WireProtocol::V2(ProtocolV2::with_config(config)),
        }
    }
}

impl From<ProtocolV1> for WireProtocol {
    fn from(protocol: ProtocolV1) -> Self {
        WireProtocol::V1(protocol)
    }
}

impl From<ProtocolV2> for WireProtocol {
    fn from(protocol: ProtocolV2) -> Self {
        WireProtocol::V2(protocol)
    }
}

impl Protocol for WireProtocol {
    fn version(&self) -> ProtocolVersion {
        match self {
            WireProtocol::V1(p) => p.version(),
            WireProtocol::V2(p) => p.version(),
        }
    }

    fn has_session(&self) -> bool {
        match self {
            WireProtocol::V1(p) => p.has_session(),
            WireProtocol::V2(p) => p.has_session(),
        }
    }

    fn begin_session<T: ChunkTransport + ?Sized>(&mut self, transport: &mut T) -> Result<()> {
        match self {
            WireProtocol::V1(p) => p.begin_session(transport),
            WireProtocol::V2(p) => p.begin_session(transport),
        }
    }

    fn end_session<T: ChunkTransport + ?Sized>(&mut self, transport: &mut T) -> Result<()> {
        match self {
            WireProtocol::V1(p) => p.end_session(transport),
            WireProtocol::V2(p) => p.end_session(transport),
        }
    }

    fn write_message<T: ChunkTransport + ?Sized>(
        &mut self,
        transport: &mut T,
        message_type: MessageType,
        payload: &[u8],
    ) -> Result<()> {
        match self {
            WireProtocol::V1(p) => p.write_message(transport, message_type, payload),
            WireProtocol::V2(p) => p.write_message(transport, message_type, payload),
        }
    }

    fn read_message<T: ChunkTransport + ?Sized>(&mut self, transport: &mut T) -> Result<Frame> {
        match self {
            WireProtocol::V1(p) => p.read_message(transport),
            WireProtocol::V2(p) => p.read_message(transport),
        }
    }
}

#[cfg(test)]
mod tests {
    use hidwire_transport::LoopbackTransport;

    use super::*;

    #[test]
    fn new_selects_generation() {
        let v1 = WireProtocol::new(ProtocolVersion::V1, ProtocolConfig::default());
        let v2 = WireProtocol::new(ProtocolVersion::V2, ProtocolConfig::default());
        assert_eq!(v1.version(), ProtocolVersion::V1);
        assert_eq!(v2.version(), ProtocolVersion::V2);
        assert!(!v1.has_session());
        assert!(!v2.has_session());
    }

    #[test]
    fn dispatches_roundtrip_for_both_generations() {
        for version in [ProtocolVersion::V1, ProtocolVersion::V2] {
            let mut protocol = match version {
                ProtocolVersion::V1 => WireProtocol::from(ProtocolV1::new()),
                ProtocolVersion::V2 => WireProtocol::from(ProtocolV2::with_session(0x0BAD_CAFE)),
            };
            let mut transport = LoopbackTransport::new();

            protocol
                .write_message(&mut transport, 17, b"dispatch")
                .unwrap();
            let frame = protocol.read_message(&mut transport).unwrap();

            assert_eq!(frame.message_type, 17, "{version}");
            assert_eq!(frame.payload.as_ref(), b"dispatch", "{version}");
        }
    }

    #[test]
    fn version_names() {
        assert_eq!(ProtocolVersion::V1.to_string(), "v1");
        assert_eq!(ProtocolVersion::V2.to_string(), "v2");
    }
}
