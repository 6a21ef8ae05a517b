use bytes::{Bytes, BytesMut};
use hidwire_transport::{Chunk, CHUNK_SIZE};

use crate::error::{ProtocolError, Result};

/// Identifier of a structured message schema. Carried in-band, never interpreted.
pub type MessageType = u32;

/// Default maximum payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Upfront reservation cap for reassembly. Declared lengths come off the
/// wire, so larger payloads grow the buffer as chunks arrive.
const INITIAL_CAPACITY: usize = 16 * CHUNK_SIZE;

/// A reassembled message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Schema identifier of the payload.
    pub message_type: MessageType,
    /// The message payload, exactly as long as the declared length.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(message_type: MessageType, payload: impl Into<Bytes>) -> Self {
        Self {
            message_type,
            payload: payload.into(),
        }
    }
}

/// Configuration shared by both protocol variants.
#[derive(Debug, Clone)]
pub struct ProtocolConfig {
    /// Maximum payload size in bytes, applied to writes and to declared read
    /// lengths. Default: 16 MiB.
    pub max_payload_size: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

impl ProtocolConfig {
    /// Reject payloads the header cannot describe or the config does not allow.
    pub(crate) fn check_payload_len(&self, len: usize) -> Result<u32> {
        let max = self.max_payload_size.min(u32::MAX as usize);
        if len > max {
            return Err(ProtocolError::PayloadTooLarge { size: len, max });
        }
        Ok(len as u32)
    }
}

/// Build one chunk: `envelope`, then as much of `data` as fits, zero-padded.
///
/// Returns the chunk and the number of `data` bytes it carries.
pub fn fill_chunk(envelope: &[u8], data: &[u8]) -> (Chunk, usize) {
    debug_assert!(envelope.len() < CHUNK_SIZE);
    let mut chunk = [0u8; CHUNK_SIZE];
    chunk[..envelope.len()].copy_from_slice(envelope);
    let take = data.len().min(CHUNK_SIZE - envelope.len());
    chunk[envelope.len()..envelope.len() + take].copy_from_slice(&data[..take]);
    (chunk, take)
}

/// Accumulates chunk payload slices until the declared length is reached.
///
/// Slices are appended in full; padding past the declared length is cut off
/// by [`finish`](Self::finish).
#[derive(Debug)]
pub struct FrameAssembler {
    message_type: MessageType,
    declared_len: usize,
    buf: BytesMut,
}

impl FrameAssembler {
    /// Start assembling a frame whose header declared `declared_len` bytes.
    pub fn new(
        message_type: MessageType,
        declared_len: u32,
        config: &ProtocolConfig,
    ) -> Result<Self> {
        let declared_len = declared_len as usize;
        if declared_len > config.max_payload_size {
            return Err(ProtocolError::PayloadTooLarge {
                size: declared_len,
                max: config.max_payload_size,
            });
        }
        Ok(Self {
            message_type,
            declared_len,
            buf: BytesMut::with_capacity(declared_len.min(INITIAL_CAPACITY) + CHUNK_SIZE),
        })
    }

    /// Append one chunk's payload slice.
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Whether the declared length has been reached.
    pub fn is_complete(&self) -> bool {
        self.buf.len() >= self.declared_len
    }

    /// Declared payload length.
    pub fn declared_len(&self) -> usize {
        self.declared_len
    }

    /// Finish the frame, discarding padding beyond the declared length.
    pub fn finish(mut self) -> Frame {
        self.buf.truncate(self.declared_len);
        Frame {
            message_type: self.message_type,
            payload: self.buf.freeze(),
        }
    }
}

/// Read a big-endian `u32` at `offset`.
pub(crate) fn read_u32_be(chunk: &Chunk, offset: usize) -> u32 {
    u32::from_be_bytes([
        chunk[offset],
        chunk[offset + 1],
        chunk[offset + 2],
        chunk[offset + 3],
    ])
}

/// Read a big-endian `u16` at `offset`.
pub(crate) fn read_u16_be(chunk: &Chunk, offset: usize) -> u16 {
    u16::from_be_bytes([chunk[offset], chunk[offset + 1]])
}
