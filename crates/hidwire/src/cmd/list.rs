use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use hidwire_device::{select_protocol, DeviceConfig};
use hidwire_transport::{init_usb, list_devices, DeviceModel, HidDeviceInfo};
use serde::Serialize;

use crate::cmd::ListArgs;
use crate::exit::{CliError, CliResult, SUCCESS, TRANSPORT_ERROR};
use crate::output::{print_json, OutputFormat};

#[derive(Debug, Serialize)]
struct DeviceRow {
    model: DeviceModel,
    vendor_id: String,
    product_id: String,
    interface: i32,
    protocol: &'static str,
    path: String,
}

pub fn run(_args: ListArgs, format: OutputFormat) -> CliResult<i32> {
    let api = init_usb()
        .map_err(|err| CliError::new(TRANSPORT_ERROR, format!("hid init failed: {err}")))?;
    let rows = device_rows(list_devices(&api), &DeviceConfig::from_env());

    match format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["MODEL", "ID", "IFACE", "PROTOCOL", "PATH"]);
            for row in &rows {
                table.add_row(vec![
                    row.model.to_string(),
                    format!("{}:{}", row.vendor_id, row.product_id),
                    row.interface.to_string(),
                    row.protocol.to_string(),
                    row.path.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for row in &rows {
                println!("{} {} {}", row.path, row.model, row.protocol);
            }
        }
    }

    Ok(SUCCESS)
}

fn device_rows(devices: Vec<HidDeviceInfo>, config: &DeviceConfig) -> Vec<DeviceRow> {
    devices
        .into_iter()
        .filter_map(|info| {
            let model = info.model()?;
            Some(DeviceRow {
                model,
                vendor_id: format!("{:04x}", info.vendor_id),
                product_id: format!("{:04x}", info.product_id),
                interface: info.interface,
                protocol: select_protocol(model, config).name(),
                path: info.path,
            })
        })
        .collect()
}
