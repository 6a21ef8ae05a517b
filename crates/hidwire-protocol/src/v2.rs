//! Protocol V2: session-oriented framing.
//!
//! A session id is negotiated with the device before any message exchange and
//! every report of every message carries it.
//!
//! Report layouts:
//! ```text
//! handshake open   03 | 00 * 63                      -> 03 | session (4B BE) | ..
//! handshake close  04 | session (4B BE) | 00 * 59    -> 04 | ..
//! first report     01 | session (4B BE) | data (<= 59B)
//! continuation     02 | session (4B BE) | seq (4B BE) | data (<= 55B)
//! ```
//! The data carried across reports is `type (4B BE) | length (4B BE) | payload`.

use bytes::{BufMut, BytesMut};
use hidwire_transport::{Chunk, ChunkTransport, CHUNK_SIZE};
use tracing::{debug, trace};

use crate::codec::{fill_chunk, read_u32_be, Frame, FrameAssembler, MessageType, ProtocolConfig};
use crate::error::{ProtocolError, Result};
use crate::protocol::{Protocol, ProtocolVersion};

/// Tag of the first report of a message.
pub const TAG_FIRST: u8 = 0x01;
/// Tag of every continuation report.
pub const TAG_CONTINUATION: u8 = 0x02;
/// Tag of the session-open request and response.
pub const TAG_SESSION_OPEN: u8 = 0x03;
/// Tag of the session-close request and response.
pub const TAG_SESSION_CLOSE: u8 = 0x04;

/// Data header: type (4) + length (4) = 8 bytes.
pub const V2_HEADER_SIZE: usize = 8;

/// Envelope of the first report: tag + session id.
const FIRST_ENVELOPE_SIZE: usize = 5;
/// Envelope of a continuation report: tag + session id + sequence.
const CONTINUATION_ENVELOPE_SIZE: usize = 9;

/// Session-oriented V2 framing.
///
/// Holds the negotiated session id. One instance belongs to exactly one
/// transport; it is created fresh per connection.
#[derive(Debug, Clone, Default)]
pub struct ProtocolV2 {
    session: Option<u32>,
    config: ProtocolConfig,
}

impl ProtocolV2 {
    /// Create V2 framing with no session and default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create V2 framing with no session and explicit configuration.
    pub fn with_config(config: ProtocolConfig) -> Self {
        Self {
            session: None,
            config,
        }
    }

    /// Resume a session negotiated elsewhere (e.g. when decoding captured reports).
    pub fn with_session(session: u32) -> Self {
        Self {
            session: Some(session),
            config: ProtocolConfig::default(),
        }
    }

    /// The negotiated session id, if any.
    pub fn session_id(&self) -> Option<u32> {
        self.session
    }

    /// Current configuration.
    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    fn require_session(&self) -> Result<u32> {
        self.session.ok_or(ProtocolError::MissingSession)
    }
}

/// Serialize type + length + payload.
pub fn encode_frame_v2(message_type: MessageType, payload: &[u8], dst: &mut BytesMut) {
    dst.reserve(V2_HEADER_SIZE + payload.len());
    dst.put_u32(message_type);
    dst.put_u32(payload.len() as u32);
    dst.put_slice(payload);
}

/// Check the tag byte and session id of a report.
fn check_envelope(chunk: &Chunk, tag: u8, session: u32) -> Result<()> {
    if chunk[0] != tag {
        return Err(ProtocolError::MalformedFrame {
            expected: vec![tag],
            actual: vec![chunk[0]],
        });
    }
    let received = read_u32_be(chunk, 1);
    if received != session {
        return Err(ProtocolError::SessionMismatch {
            expected: session,
            actual: received,
        });
    }
    Ok(())
}

fn check_handshake_tag(chunk: &Chunk, tag: u8) -> Result<()> {
    if chunk[0] != tag {
        return Err(ProtocolError::HandshakeFailed {
            expected: tag,
            actual: chunk[0],
        });
    }
    Ok(())
}

impl Protocol for ProtocolV2 {
    fn version(&self) -> ProtocolVersion {
        ProtocolVersion::V2
    }

    fn has_session(&self) -> bool {
        self.session.is_some()
    }

    fn begin_session<T: ChunkTransport + ?Sized>(&mut self, transport: &mut T) -> Result<()> {
        // An active session is closed on the device before a new one is opened.
        if self.session.is_some() {
            self.end_session(transport)?;
        }

        let mut request = [0u8; CHUNK_SIZE];
        request[0] = TAG_SESSION_OPEN;
        transport.write_chunk(&request)?;

        let response = transport.read_chunk()?;
        check_handshake_tag(&response, TAG_SESSION_OPEN)?;

        let session = read_u32_be(&response, 1);
        debug!(session = format_args!("{session:08x}"), "v2 session opened");
        self.session = Some(session);
        Ok(())
    }

    fn end_session<T: ChunkTransport + ?Sized>(&mut self, transport: &mut T) -> Result<()> {
        let Some(session) = self.session else {
            return Ok(());
        };

        let mut request = [0u8; CHUNK_SIZE];
        request[0] = TAG_SESSION_CLOSE;
        request[1..5].copy_from_slice(&session.to_be_bytes());
        transport.write_chunk(&request)?;

        let response = transport.read_chunk()?;
        check_handshake_tag(&response, TAG_SESSION_CLOSE)?;

        debug!(session = format_args!("{session:08x}"), "v2 session closed");
        self.session = None;
        Ok(())
    }

    fn write_message<T: ChunkTransport + ?Sized>(
        &mut self,
        transport: &mut T,
        message_type: MessageType,
        payload: &[u8],
    ) -> Result<()> {
        let session = self.require_session()?;
        self.config.check_payload_len(payload.len())?;

        let mut buf = BytesMut::new();
        encode_frame_v2(message_type, payload, &mut buf);

        let mut envelope = [0u8; CONTINUATION_ENVELOPE_SIZE];
        envelope[0] = TAG_FIRST;
        envelope[1..5].copy_from_slice(&session.to_be_bytes());
        let (first, mut offset) = fill_chunk(&envelope[..FIRST_ENVELOPE_SIZE], &buf);
        transport.write_chunk(&first)?;

        envelope[0] = TAG_CONTINUATION;
        let mut seq: u32 = 0;
        while offset < buf.len() {
            envelope[5..9].copy_from_slice(&seq.to_be_bytes());
            let (chunk, taken) = fill_chunk(&envelope, &buf[offset..]);
            transport.write_chunk(&chunk)?;
            offset += taken;
            seq = seq.wrapping_add(1);
        }

        let chunks = seq as usize + 1;
        trace!(message_type, len = payload.len(), chunks, "wrote v2 frame");
        Ok(())
    }

    fn read_message<T: ChunkTransport + ?Sized>(&mut self, transport: &mut T) -> Result<Frame> {
        let session = self.require_session()?;

        let first = transport.read_chunk()?;
        check_envelope(&first, TAG_FIRST, session)?;

        let message_type = read_u32_be(&first, FIRST_ENVELOPE_SIZE);
        let declared_len = read_u32_be(&first, FIRST_ENVELOPE_SIZE + 4);
        let mut assembler = FrameAssembler::new(message_type, declared_len, &self.config)?;
        assembler.push(&first[FIRST_ENVELOPE_SIZE + V2_HEADER_SIZE..]);

        let mut chunks = 1usize;
        while !assembler.is_complete() {
            let chunk = transport.read_chunk()?;
            check_envelope(&chunk, TAG_CONTINUATION, session)?;
            // Sequence number at bytes 5..9 is not validated.
            assembler.push(&chunk[CONTINUATION_ENVELOPE_SIZE..]);
            chunks += 1;
        }

        trace!(message_type, len = declared_len, chunks, "read v2 frame");
        Ok(assembler.finish())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use hidwire_transport::{LoopbackTransport, TransportError};

    use super::*;

    const SIZES: [usize; 10] = [0, 1, 55, 56, 57, 59, 60, 118, 119, 500];

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 % 256) as u8).collect()
    }

    /// Device stand-in: records every write and answers reads from a script.
    #[derive(Debug, Default)]
    struct ScriptedTransport {
        written: Vec<Chunk>,
        responses: VecDeque<Chunk>,
        fail_writes: bool,
    }

    impl ScriptedTransport {
        fn respond(mut self, chunk: Chunk) -> Self {
            self.responses.push_back(chunk);
            self
        }

        fn io_count(&self) -> usize {
            self.written.len()
        }
    }

    impl ChunkTransport for ScriptedTransport {
        fn read_chunk(&mut self) -> hidwire_transport::Result<Chunk> {
            self.responses.pop_front().ok_or(TransportError::Closed)
        }

        fn write_chunk(&mut self, chunk: &Chunk) -> hidwire_transport::Result<()> {
            if self.fail_writes {
                return Err(TransportError::Io(std::io::Error::from(
                    std::io::ErrorKind::BrokenPipe,
                )));
            }
            self.written.push(*chunk);
            Ok(())
        }
    }

    fn tagged(tag: u8, session: u32) -> Chunk {
        let mut chunk = [0u8; CHUNK_SIZE];
        chunk[0] = tag;
        chunk[1..5].copy_from_slice(&session.to_be_bytes());
        chunk
    }

    #[test]
    fn begin_session_stores_device_id() {
        let mut transport =
            ScriptedTransport::default().respond(tagged(TAG_SESSION_OPEN, 0xDEAD_BEEF));
        let mut protocol = ProtocolV2::new();

        protocol.begin_session(&mut transport).unwrap();

        assert_eq!(protocol.session_id(), Some(0xDEAD_BEEF));
        let mut expected = [0u8; CHUNK_SIZE];
        expected[0] = 0x03;
        assert_eq!(transport.written, vec![expected]);
    }

    #[test]
    fn begin_session_rejects_wrong_tag() {
        let mut transport = ScriptedTransport::default().respond(tagged(0x04, 7));
        let mut protocol = ProtocolV2::new();

        let err = protocol.begin_session(&mut transport).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::HandshakeFailed {
                expected: 0x03,
                actual: 0x04
            }
        ));
        assert!(!protocol.has_session());
    }

    #[test]
    fn begin_session_transport_failure_leaves_no_session() {
        let mut transport = ScriptedTransport::default();
        let mut protocol = ProtocolV2::new();

        let err = protocol.begin_session(&mut transport).unwrap_err();
        assert!(matches!(err, ProtocolError::Transport(TransportError::Closed)));
        assert!(!protocol.has_session());
    }

    #[test]
    fn begin_session_closes_active_session_first() {
        let mut transport = ScriptedTransport::default()
            .respond(tagged(TAG_SESSION_CLOSE, 0))
            .respond(tagged(TAG_SESSION_OPEN, 9));
        let mut protocol = ProtocolV2::with_session(7);

        protocol.begin_session(&mut transport).unwrap();

        assert_eq!(protocol.session_id(), Some(9));
        assert_eq!(
            transport.written,
            vec![tagged(TAG_SESSION_CLOSE, 7), tagged(TAG_SESSION_OPEN, 0)]
        );
    }

    #[test]
    fn begin_session_keeps_active_session_when_close_fails() {
        let mut transport = ScriptedTransport::default().respond(tagged(TAG_SESSION_OPEN, 9));
        let mut protocol = ProtocolV2::with_session(7);

        let err = protocol.begin_session(&mut transport).unwrap_err();

        assert!(matches!(
            err,
            ProtocolError::HandshakeFailed {
                expected: 0x04,
                actual: 0x03
            }
        ));
        assert_eq!(protocol.session_id(), Some(7));
        assert_eq!(transport.written, vec![tagged(TAG_SESSION_CLOSE, 7)]);
    }

    #[test]
    fn end_session_sends_close_and_clears() {
        let mut transport = ScriptedTransport::default().respond(tagged(TAG_SESSION_CLOSE, 0));
        let mut protocol = ProtocolV2::with_session(0x0102_0304);

        protocol.end_session(&mut transport).unwrap();

        assert!(!protocol.has_session());
        assert_eq!(transport.written, vec![tagged(0x04, 0x0102_0304)]);
    }

    #[test]
    fn end_session_without_session_is_noop() {
        let mut transport = ScriptedTransport::default();
        ProtocolV2::new().end_session(&mut transport).unwrap();
        assert_eq!(transport.io_count(), 0);
    }

    #[test]
    fn end_session_wrong_tag_keeps_session() {
        let mut transport = ScriptedTransport::default().respond(tagged(TAG_FIRST, 0));
        let mut protocol = ProtocolV2::with_session(5);

        let err = protocol.end_session(&mut transport).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::HandshakeFailed {
                expected: 0x04,
                actual: 0x01
            }
        ));
        assert_eq!(protocol.session_id(), Some(5));
    }

    #[test]
    fn missing_session_performs_no_io() {
        let mut transport = ScriptedTransport::default().respond(tagged(TAG_FIRST, 0));
        let mut protocol = ProtocolV2::new();

        let write = protocol.write_message(&mut transport, 1, b"x").unwrap_err();
        let read = protocol.read_message(&mut transport).unwrap_err();

        assert!(matches!(write, ProtocolError::MissingSession));
        assert!(matches!(read, ProtocolError::MissingSession));
        assert_eq!(transport.io_count(), 0);
        assert_eq!(transport.responses.len(), 1);
    }

    #[test]
    fn abc_fits_one_report() {
        let mut transport = LoopbackTransport::new();
        ProtocolV2::with_session(1)
            .write_message(&mut transport, 10, b"abc")
            .unwrap();

        let chunks = transport.drain();
        assert_eq!(chunks.len(), 1);

        let mut expected = [0u8; CHUNK_SIZE];
        expected[..16].copy_from_slice(&[
            0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x00, 0x03, 0x61,
            0x62, 0x63,
        ]);
        assert_eq!(chunks[0], expected);
    }

    #[test]
    fn continuation_carries_session_and_sequence() {
        let session = 0xA1B2_C3D4;
        let mut protocol = ProtocolV2::with_session(session);
        let mut transport = LoopbackTransport::new();
        // 8 header + 51 payload fill the first report; 60 more need two continuations.
        let data = payload(111);

        protocol.write_message(&mut transport, 42, &data).unwrap();
        let chunks: Vec<Chunk> = transport.pending().copied().collect();
        assert_eq!(chunks.len(), 3);

        assert_eq!(chunks[0][0], TAG_FIRST);
        assert_eq!(read_u32_be(&chunks[0], 1), session);
        for (seq, chunk) in chunks[1..].iter().enumerate() {
            assert_eq!(chunk[0], TAG_CONTINUATION);
            assert_eq!(read_u32_be(chunk, 1), session);
            assert_eq!(read_u32_be(chunk, 5), seq as u32);
        }
        assert_eq!(&chunks[1][9..], &data[51..106]);
        assert_eq!(&chunks[2][9..14], &data[106..111]);
        assert!(chunks[2][14..].iter().all(|b| *b == 0));

        let frame = protocol.read_message(&mut transport).unwrap();
        assert_eq!(frame.message_type, 42);
        assert_eq!(frame.payload.len(), data.len());
        assert_eq!(frame.payload.as_ref(), data.as_slice());
    }

    #[test]
    fn roundtrip_all_sizes() {
        for len in SIZES {
            let mut protocol = ProtocolV2::with_session(0x0000_0001);
            let mut transport = LoopbackTransport::new();
            let data = payload(len);

            protocol
                .write_message(&mut transport, 0x0001_0000, &data)
                .unwrap();
            let frame = protocol.read_message(&mut transport).unwrap();

            assert_eq!(frame.message_type, 0x0001_0000, "len {len}");
            assert_eq!(frame.payload.as_ref(), data.as_slice(), "len {len}");
            assert_eq!(transport.pending_len(), 0, "len {len}");
        }
    }

    #[test]
    fn chunk_count_matches_layout() {
        // 59 data bytes in the first report, 55 in every continuation.
        for len in SIZES {
            let mut transport = LoopbackTransport::new();
            ProtocolV2::with_session(9)
                .write_message(&mut transport, 1, &payload(len))
                .unwrap();

            let total = V2_HEADER_SIZE + len;
            let expected = if total <= 59 {
                1
            } else {
                1 + (total - 59).div_ceil(55)
            };
            assert_eq!(transport.chunks_written(), expected, "len {len}");
        }
    }

    #[test]
    fn first_report_session_mismatch() {
        let mut transport = LoopbackTransport::new();
        ProtocolV2::with_session(0x11)
            .write_message(&mut transport, 1, b"hi")
            .unwrap();

        let err = ProtocolV2::with_session(0x22)
            .read_message(&mut transport)
            .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::SessionMismatch {
                expected: 0x22,
                actual: 0x11
            }
        ));
        assert_eq!(
            err.to_string(),
            "session mismatch, expected 00000022, got 00000011"
        );
    }

    #[test]
    fn continuation_session_mismatch() {
        let mut protocol = ProtocolV2::with_session(0x33);
        let mut transport = LoopbackTransport::new();
        protocol
            .write_message(&mut transport, 1, &payload(100))
            .unwrap();

        let mut chunks = transport.drain();
        chunks[1][1..5].copy_from_slice(&0x44u32.to_be_bytes());
        for chunk in chunks {
            transport.push_inbound(chunk);
        }

        let err = protocol.read_message(&mut transport).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::SessionMismatch {
                expected: 0x33,
                actual: 0x44
            }
        ));
        assert_eq!(protocol.session_id(), Some(0x33));
    }

    #[test]
    fn wrong_first_tag_is_malformed() {
        let mut transport = LoopbackTransport::new();
        transport.push_inbound(tagged(TAG_CONTINUATION, 1));

        let err = ProtocolV2::with_session(1)
            .read_message(&mut transport)
            .unwrap_err();
        match err {
            ProtocolError::MalformedFrame { expected, actual } => {
                assert_eq!(expected, vec![0x01]);
                assert_eq!(actual, vec![0x02]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn wrong_continuation_tag_is_malformed() {
        let mut protocol = ProtocolV2::with_session(1);
        let mut transport = LoopbackTransport::new();
        protocol
            .write_message(&mut transport, 1, &payload(80))
            .unwrap();
        let mut chunks = transport.drain();
        chunks[1][0] = TAG_FIRST;
        for chunk in chunks {
            transport.push_inbound(chunk);
        }

        let err = protocol.read_message(&mut transport).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedFrame { .. }));
    }

    #[test]
    fn sequence_numbers_are_not_validated() {
        let mut protocol = ProtocolV2::with_session(1);
        let mut transport = LoopbackTransport::new();
        let data = payload(150);
        protocol.write_message(&mut transport, 5, &data).unwrap();
        let mut chunks = transport.drain();
        chunks[1][5..9].copy_from_slice(&[0xFF; 4]);
        for chunk in chunks {
            transport.push_inbound(chunk);
        }

        let frame = protocol.read_message(&mut transport).unwrap();
        assert_eq!(frame.payload.as_ref(), data.as_slice());
    }

    #[test]
    fn write_failure_keeps_session() {
        let mut transport = ScriptedTransport {
            fail_writes: true,
            ..ScriptedTransport::default()
        };
        let mut protocol = ProtocolV2::with_session(77);

        let err = protocol
            .write_message(&mut transport, 1, b"data")
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Transport(TransportError::Io(_))));
        assert_eq!(protocol.session_id(), Some(77));
    }

    #[test]
    fn full_lifecycle_against_scripted_device() {
        let (reply, _) = fill_chunk(
            &[TAG_FIRST, 0, 0, 0, 9],
            &[0, 0, 0, 2, 0, 0, 0, 2, b'o', b'k'],
        );

        let mut transport = ScriptedTransport::default()
            .respond(tagged(TAG_SESSION_OPEN, 9))
            .respond(reply)
            .respond(tagged(TAG_SESSION_CLOSE, 0));
        let mut protocol = ProtocolV2::new();

        protocol.begin_session(&mut transport).unwrap();
        protocol.write_message(&mut transport, 1, b"ping").unwrap();
        let frame = protocol.read_message(&mut transport).unwrap();
        protocol.end_session(&mut transport).unwrap();

        assert_eq!(frame, Frame::new(2, b"ok".to_vec()));
        assert!(!protocol.has_session());
        assert_eq!(transport.written.len(), 3);
        assert_eq!(transport.written[1][0], TAG_FIRST);
        assert_eq!(read_u32_be(&transport.written[1], 1), 9);
        assert_eq!(transport.written[2], tagged(TAG_SESSION_CLOSE, 9));
    }
}
