use hidwire_protocol::{ProtocolConfig, ProtocolVersion};
use hidwire_transport::DeviceModel;

/// Environment variable that forces protocol V1 when set to `1`.
pub const FORCE_V1_ENV: &str = "HIDWIRE_TRANSPORT_V1";

/// Configuration for a device connection.
#[derive(Debug, Clone, Default)]
pub struct DeviceConfig {
    /// Speak protocol V1 even to devices that support V2.
    pub force_v1: bool,
    /// Framing limits passed to the protocol.
    pub protocol: ProtocolConfig,
}

impl DeviceConfig {
    /// Default configuration with the [`FORCE_V1_ENV`] override applied.
    pub fn from_env() -> Self {
        Self::from_env_value(std::env::var(FORCE_V1_ENV).ok().as_deref())
    }

    /// Default configuration with an explicit override value applied.
    pub fn from_env_value(value: Option<&str>) -> Self {
        Self {
            force_v1: matches!(value.map(str::trim), Some("1")),
            ..Self::default()
        }
    }
}

/// Protocol generation to speak with `model`.
pub fn select_protocol(model: DeviceModel, config: &DeviceConfig) -> ProtocolVersion {
    match model {
        DeviceModel::Current if !config.force_v1 => ProtocolVersion::V2,
        DeviceModel::Current | DeviceModel::Legacy | DeviceModel::Bootloader => {
            ProtocolVersion::V1
        }
    }
}
