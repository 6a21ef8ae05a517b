//! Protocol V1: stateless, header-only framing.
//!
//! Wire format of the serialized frame:
//! ```text
//! ┌────────────┬──────────────┬──────────────┬──────────────────┐
//! │ "##" (2B)  │ Type (2B BE) │ Length (4B BE)│ Payload          │
//! └────────────┴──────────────┴──────────────┴──────────────────┘
//! ```
//! The first chunk is `'?'` followed by the first 63 bytes of the frame;
//! every continuation chunk carries the next 64 raw bytes.

use bytes::{BufMut, BytesMut};
use hidwire_transport::{ChunkTransport, CHUNK_SIZE};
use tracing::trace;

use crate::codec::{
    fill_chunk, read_u16_be, read_u32_be, Frame, FrameAssembler, MessageType, ProtocolConfig,
};
use crate::error::{ProtocolError, Result};
use crate::protocol::{Protocol, ProtocolVersion};

/// Marker byte opening the first chunk of every frame.
pub const V1_MARKER: u8 = b'?';

/// Magic bytes opening the frame header.
pub const V1_MAGIC: [u8; 2] = *b"##";

/// Frame header: magic (2) + type (2) + length (4) = 8 bytes.
pub const V1_HEADER_SIZE: usize = 8;

/// Offset of the first payload byte in the first chunk.
const FIRST_CHUNK_DATA_OFFSET: usize = 1 + V1_HEADER_SIZE;

/// Stateless V1 framing.
#[derive(Debug, Clone, Default)]
pub struct ProtocolV1 {
    config: ProtocolConfig,
}

impl ProtocolV1 {
    /// Create V1 framing with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create V1 framing with explicit configuration.
    pub fn with_config(config: ProtocolConfig) -> Self {
        Self { config }
    }

    /// Current configuration.
    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }
}

/// Serialize `"##"` + type + length + payload.
pub fn encode_frame_v1(
    message_type: MessageType,
    payload: &[u8],
    dst: &mut BytesMut,
) -> Result<()> {
    let message_type =
        u16::try_from(message_type).map_err(|_| ProtocolError::MessageTypeOutOfRange {
            message_type,
            max: u16::MAX as u32,
        })?;
    dst.reserve(V1_HEADER_SIZE + payload.len());
    dst.put_slice(&V1_MAGIC);
    dst.put_u16(message_type);
    dst.put_u32(payload.len() as u32);
    dst.put_slice(payload);
    Ok(())
}

impl Protocol for ProtocolV1 {
    fn version(&self) -> ProtocolVersion {
        ProtocolVersion::V1
    }

    fn has_session(&self) -> bool {
        false
    }

    fn begin_session<T: ChunkTransport + ?Sized>(&mut self, _transport: &mut T) -> Result<()> {
        Ok(())
    }

    fn end_session<T: ChunkTransport + ?Sized>(&mut self, _transport: &mut T) -> Result<()> {
        Ok(())
    }

    fn write_message<T: ChunkTransport + ?Sized>(
        &mut self,
        transport: &mut T,
        message_type: MessageType,
        payload: &[u8],
    ) -> Result<()> {
        self.config.check_payload_len(payload.len())?;

        let mut buf = BytesMut::new();
        encode_frame_v1(message_type, payload, &mut buf)?;

        let (first, mut offset) = fill_chunk(&[V1_MARKER], &buf);
        transport.write_chunk(&first)?;
        let mut chunks = 1usize;

        while offset < buf.len() {
            let (chunk, taken) = fill_chunk(&[], &buf[offset..]);
            transport.write_chunk(&chunk)?;
            offset += taken;
            chunks += 1;
        }

        trace!(message_type, len = payload.len(), chunks, "wrote v1 frame");
        Ok(())
    }

    fn read_message<T: ChunkTransport + ?Sized>(&mut self, transport: &mut T) -> Result<Frame> {
        let first = transport.read_chunk()?;

        let magic = [V1_MARKER, V1_MAGIC[0], V1_MAGIC[1]];
        if first[..3] != magic {
            return Err(ProtocolError::MalformedFrame {
                expected: magic.to_vec(),
                actual: first[..3].to_vec(),
            });
        }

        let message_type = read_u16_be(&first, 3) as MessageType;
        let declared_len = read_u32_be(&first, 5);
        let mut assembler = FrameAssembler::new(message_type, declared_len, &self.config)?;
        assembler.push(&first[FIRST_CHUNK_DATA_OFFSET..]);

        let mut chunks = 1usize;
        while !assembler.is_complete() {
            let chunk = transport.read_chunk()?;
            assembler.push(&chunk[..CHUNK_SIZE]);
            chunks += 1;
        }

        trace!(message_type, len = declared_len, chunks, "read v1 frame");
        Ok(assembler.finish())
    }
}
