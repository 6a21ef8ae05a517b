//! Typed message exchange with USB-HID security devices.
//!
//! This is the "just works" layer. Pick the protocol a device model speaks,
//! open its session, exchange raw or typed messages, and close it again.

pub mod config;
pub mod device;
pub mod error;
pub mod message;

pub use config::{select_protocol, DeviceConfig, FORCE_V1_ENV};
pub use device::Device;
pub use error::{DeviceError, Result};
pub use message::{decode_json, encode_json, Message, Raw};
