//! Device model identification.
//!
//! The device family ships three USB identities. Which protocol generation to
//! speak is decided from the identity (see `hidwire-device`), not here.

use serde::Serialize;

/// Usage page of the primary (wire) HID interface.
pub const WIRE_USAGE_PAGE: u16 = 0xFF00;
/// Usage page of the debug HID interface.
pub const DEBUG_USAGE_PAGE: u16 = 0xFF01;

/// A known device model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceModel {
    /// First-generation device. Only speaks protocol V1.
    Legacy,
    /// Current-generation device. Speaks protocol V2 unless overridden.
    Current,
    /// Current-generation device running its bootloader.
    Bootloader,
}

impl DeviceModel {
    /// Every known model, in enumeration order.
    pub const ALL: [DeviceModel; 3] = [
        DeviceModel::Legacy,
        DeviceModel::Current,
        DeviceModel::Bootloader,
    ];

    /// `(vendor_id, product_id)` for this model.
    pub fn ids(self) -> (u16, u16) {
        match self {
            DeviceModel::Legacy => (0x534c, 0x0001),
            DeviceModel::Current => (0x1209, 0x53c1),
            DeviceModel::Bootloader => (0x1209, 0x53c0),
        }
    }

    /// Identify a model from its USB ids.
    pub fn from_ids(vendor_id: u16, product_id: u16) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|model| model.ids() == (vendor_id, product_id))
    }

    /// Short lowercase name for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            DeviceModel::Legacy => "legacy",
            DeviceModel::Current => "current",
            DeviceModel::Bootloader => "bootloader",
        }
    }
}

impl std::fmt::Display for DeviceModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Descriptor of one HID interface as reported by the OS HID stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HidDeviceInfo {
    pub vendor_id: u16,
    pub product_id: u16,
    /// USB interface number, or -1 when the platform does not report it.
    pub interface: i32,
    pub usage_page: u16,
    /// Platform path used to open the device.
    pub path: String,
}

impl HidDeviceInfo {
    /// The model this interface belongs to, if known.
    pub fn model(&self) -> Option<DeviceModel> {
        DeviceModel::from_ids(self.vendor_id, self.product_id)
    }

    /// Primary interface used for normal message exchange.
    pub fn is_wirelink(&self) -> bool {
        self.usage_page == WIRE_USAGE_PAGE || self.interface == 0
    }

    /// Debug interface; never used for message exchange.
    pub fn is_debuglink(&self) -> bool {
        self.usage_page == DEBUG_USAGE_PAGE || self.interface == 1
    }
}

/// Keep the wire interfaces of known models from a raw HID listing.
pub fn enumerate<I>(devices: I) -> Vec<HidDeviceInfo>
where
    I: IntoIterator<Item = HidDeviceInfo>,
{
    let mut out: Vec<HidDeviceInfo> = devices
        .into_iter()
        .filter(|info| info.model().is_some())
        .filter(|info| !info.is_debuglink())
        .collect();
    out.sort_by_key(|info| info.model().map(|model| model as u8));
    tracing::debug!(count = out.len(), "enumerated hid devices");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(model: DeviceModel, interface: i32, usage_page: u16) -> HidDeviceInfo {
        let (vendor_id, product_id) = model.ids();
        HidDeviceInfo {
            vendor_id,
            product_id,
            interface,
            usage_page,
            path: format!("{model}:{interface}"),
        }
    }

    #[test]
    fn model_ids_roundtrip() {
        for model in DeviceModel::ALL {
            let (vid, pid) = model.ids();
            assert_eq!(DeviceModel::from_ids(vid, pid), Some(model));
        }
        assert_eq!(DeviceModel::from_ids(0x1209, 0x0000), None);
    }

    #[test]
    fn classifies_link_interfaces() {
        let wire = info(DeviceModel::Current, 0, 0);
        let debug = info(DeviceModel::Current, 1, 0);
        let by_usage = info(DeviceModel::Current, -1, DEBUG_USAGE_PAGE);

        assert!(wire.is_wirelink());
        assert!(!wire.is_debuglink());
        assert!(debug.is_debuglink());
        assert!(by_usage.is_debuglink());
        assert!(!by_usage.is_wirelink());
    }

    #[test]
    fn enumerate_keeps_known_wire_interfaces() {
        let unknown = HidDeviceInfo {
            vendor_id: 0xdead,
            product_id: 0xbeef,
            interface: 0,
            usage_page: WIRE_USAGE_PAGE,
            path: "unknown".to_string(),
        };
        let listing = vec![
            info(DeviceModel::Bootloader, 0, WIRE_USAGE_PAGE),
            unknown,
            info(DeviceModel::Current, 1, DEBUG_USAGE_PAGE),
            info(DeviceModel::Legacy, 0, WIRE_USAGE_PAGE),
        ];

        let found = enumerate(listing);
        let models: Vec<_> = found.iter().filter_map(HidDeviceInfo::model).collect();
        assert_eq!(models, vec![DeviceModel::Legacy, DeviceModel::Bootloader]);
    }
}
