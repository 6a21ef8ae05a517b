//! USB HID backend on top of `hidapi`.
//!
//! Requires the `usb` feature (and libudev on Linux).

use std::ffi::{CStr, CString};
use std::io;

pub use hidapi::HidApi;

use crate::error::{Result, TransportError};
use crate::hid::{HidDevice, HidTransport};
use crate::model::{enumerate, HidDeviceInfo};

/// [`HidTransport`] over a device opened through `hidapi`.
pub type UsbTransport = HidTransport<hidapi::HidDevice>;

impl HidDevice for hidapi::HidDevice {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        hidapi::HidDevice::read(self, buf).map_err(hid_error)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        hidapi::HidDevice::write(self, data).map_err(hid_error)
    }
}

/// Initialise the platform HID library.
pub fn init_usb() -> Result<HidApi> {
    HidApi::new().map_err(|err| TransportError::Io(hid_error(err)))
}

/// Wire interfaces of known models currently attached.
pub fn list_devices(api: &HidApi) -> Vec<HidDeviceInfo> {
    enumerate(api.device_list().map(device_info))
}

/// Open the interface described by `info`.
///
/// Meant to be passed as the open function of [`HidTransport::open`].
pub fn open_device(api: &HidApi, info: &HidDeviceInfo) -> Result<hidapi::HidDevice> {
    let path = CString::new(info.path.as_str()).map_err(|err| {
        TransportError::Io(io::Error::new(io::ErrorKind::InvalidInput, err))
    })?;
    api.open_path(&path).map_err(|err| TransportError::Io(hid_error(err)))
}

/// Descriptor of one `hidapi` listing entry.
pub fn device_info(info: &hidapi::DeviceInfo) -> HidDeviceInfo {
    info_from_parts(
        info.vendor_id(),
        info.product_id(),
        info.interface_number(),
        info.usage_page(),
        info.path(),
    )
}

fn info_from_parts(
    vendor_id: u16,
    product_id: u16,
    interface: i32,
    usage_page: u16,
    path: &CStr,
) -> HidDeviceInfo {
    HidDeviceInfo {
        vendor_id,
        product_id,
        interface,
        usage_page,
        path: path.to_string_lossy().into_owned(),
    }
}

fn hid_error(err: hidapi::HidError) -> io::Error {
    io::Error::other(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeviceModel, DEBUG_USAGE_PAGE, WIRE_USAGE_PAGE};

    #[test]
    fn converts_listing_entry() {
        let info = info_from_parts(0x1209, 0x53c1, 0, WIRE_USAGE_PAGE, c"/dev/hidraw3");
        assert_eq!(info.model(), Some(DeviceModel::Current));
        assert_eq!(info.interface, 0);
        assert_eq!(info.usage_page, WIRE_USAGE_PAGE);
        assert_eq!(info.path, "/dev/hidraw3");
        assert!(info.is_wirelink());
    }

    #[test]
    fn converted_listing_keeps_only_wire_interfaces() {
        let listing = vec![
            info_from_parts(0x1209, 0x53c1, 1, DEBUG_USAGE_PAGE, c"debug"),
            info_from_parts(0x046d, 0xc52b, 0, 0x0001, c"mouse"),
            info_from_parts(0x534c, 0x0001, -1, WIRE_USAGE_PAGE, c"legacy"),
        ];
        let found = enumerate(listing);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, "legacy");
    }
}
