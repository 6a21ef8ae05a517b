//! Fixed-size chunk transport for USB-HID security devices.
//!
//! The device family only ever moves 64-byte reports. This crate provides:
//! - the [`ChunkTransport`] trait every protocol layer is written against
//! - an in-memory [`LoopbackTransport`] for tests and self-checks
//! - a [`HidTransport`] over any opened [`HidDevice`], with HID version probing
//!   and a reference-counted [`HidHandle`]
//! - device model identification ([`DeviceModel`], [`HidDeviceInfo`])
//! - a `hidapi` backend for real devices (`usb` feature)
//!
//! This is the lowest layer of hidwire. Everything else builds on top of
//! [`ChunkTransport`].

pub mod error;
pub mod hid;
pub mod loopback;
pub mod model;
pub mod traits;
#[cfg(feature = "usb")]
pub mod usb;

pub use error::{Result, TransportError};
pub use hid::{probe_hid_version, HidDevice, HidHandle, HidTransport, HidVersion};
pub use loopback::LoopbackTransport;
pub use model::{enumerate, DeviceModel, HidDeviceInfo};
pub use traits::{chunk_from_slice, Chunk, ChunkTransport, CHUNK_SIZE};
#[cfg(feature = "usb")]
pub use usb::{device_info, init_usb, list_devices, open_device, HidApi, UsbTransport};
