use hidwire_device::{Device, DeviceConfig};
use hidwire_transport::{init_usb, list_devices, open_device, HidDeviceInfo};

use crate::cmd::encode::resolve_payload;
use crate::cmd::CallArgs;
use crate::exit::{device_error, CliError, CliResult, FAILURE, SUCCESS, TRANSPORT_ERROR, USAGE};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: CallArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = resolve_payload(&args.payload)?;
    let api = init_usb()
        .map_err(|err| CliError::new(TRANSPORT_ERROR, format!("hid init failed: {err}")))?;
    let info = select_device(list_devices(&api), args.path.as_deref())?;

    let config = DeviceConfig::from_env();
    let mut device = Device::connect(info, |info| open_device(&api, info), &config)
        .map_err(|err| device_error("connect failed", err))?;
    let version = device.version();

    let reply = device.call(args.message_type, &payload);
    let closed = device.disconnect();
    let frame = reply.map_err(|err| device_error("call failed", err))?;
    if let Err(err) = closed {
        tracing::warn!(error = %err, "session close failed");
    }

    print_frame(version, &frame, format);
    Ok(SUCCESS)
}

/// Pick the device at `path`, or the first one listed.
fn select_device(devices: Vec<HidDeviceInfo>, path: Option<&str>) -> CliResult<HidDeviceInfo> {
    match path {
        Some(path) => devices
            .into_iter()
            .find(|info| info.path == path)
            .ok_or_else(|| CliError::new(USAGE, format!("no supported device at {path}"))),
        None => devices
            .into_iter()
            .next()
            .ok_or_else(|| CliError::new(FAILURE, "no supported device found")),
    }
}
