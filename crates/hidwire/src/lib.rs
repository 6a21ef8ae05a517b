//! Client-side wire protocol for USB-HID hardware security devices.
//!
//! hidwire moves typed, variable-length messages over a channel that only
//! carries 64-byte HID reports, in both protocol generations the device
//! family speaks.
//!
//! # Crate Structure
//!
//! - [`transport`]: Chunk transport abstraction, HID transport, device models
//!   (real devices through hidapi behind the `usb` feature)
//! - [`protocol`]: V1/V2 framing, chunk reassembly, V2 session handshake
//! - [`device`]: Protocol selection and typed message exchange (behind `device` feature)

/// Re-export transport types.
pub mod transport {
    pub use hidwire_transport::*;
}

/// Re-export protocol types.
pub mod protocol {
    pub use hidwire_protocol::*;
}

/// Re-export device types (requires `device` feature).
#[cfg(feature = "device")]
pub mod device {
    pub use hidwire_device::*;
}
