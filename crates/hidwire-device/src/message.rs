//! Typed message bodies.
//!
//! The schema registry lives outside this crate. A message type only has to
//! say which [`MessageType`] it travels under and how its body maps to bytes.

use hidwire_protocol::MessageType;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// A structured message with a fixed wire type.
pub trait Message: Sized {
    /// Type identifier carried in the frame header.
    const MESSAGE_TYPE: MessageType;

    /// Serialize the message body.
    fn encode(&self) -> Result<Vec<u8>>;

    /// Parse a message body.
    fn decode(payload: &[u8]) -> Result<Self>;
}

/// Serialize a JSON message body.
pub fn encode_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Parse a JSON message body.
pub fn decode_json<T: DeserializeOwned>(payload: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(payload)?)
}

/// Opaque bytes carried under a fixed type, for messages without a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raw<const TYPE: MessageType>(pub Vec<u8>);

impl<const TYPE: MessageType> Message for Raw<TYPE> {
    const MESSAGE_TYPE: MessageType = TYPE;

    fn encode(&self) -> Result<Vec<u8>> {
        Ok(self.0.clone())
    }

    fn decode(payload: &[u8]) -> Result<Self> {
        Ok(Self(payload.to_vec()))
    }
}
