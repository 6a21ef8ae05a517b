//! Chunked message framing and session handshake for USB-HID security devices.
//!
//! This is the core layer of hidwire. It turns a channel that moves only
//! 64-byte chunks into one that moves typed, variable-length messages, in
//! either of the two protocol generations the device family speaks:
//! - [`ProtocolV1`]: `'?'`-marked first chunk carrying a `"##"` header, raw
//!   continuation chunks, no state
//! - [`ProtocolV2`]: explicit session handshake; every report carries the
//!   negotiated session id
//!
//! [`WireProtocol`] picks one of the two at runtime.

pub mod codec;
pub mod error;
pub mod protocol;
pub mod v1;
pub mod v2;

pub use codec::{
    fill_chunk, Frame, FrameAssembler, MessageType, ProtocolConfig, DEFAULT_MAX_PAYLOAD,
};
pub use error::{ProtocolError, Result};
pub use protocol::{Protocol, ProtocolVersion, WireProtocol};
pub use v1::{encode_frame_v1, ProtocolV1, V1_HEADER_SIZE, V1_MAGIC, V1_MARKER};
pub use v2::{
    encode_frame_v2, ProtocolV2, TAG_CONTINUATION, TAG_FIRST, TAG_SESSION_CLOSE, TAG_SESSION_OPEN,
    V2_HEADER_SIZE,
};
