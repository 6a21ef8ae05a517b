use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use hidwire_device::{select_protocol, DeviceConfig, FORCE_V1_ENV};
use hidwire_transport::DeviceModel;
use serde::Serialize;

use crate::cmd::ModelsArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Debug, Serialize)]
struct ModelRow {
    model: DeviceModel,
    vendor_id: String,
    product_id: String,
    protocol: &'static str,
}

pub fn run(_args: ModelsArgs, format: OutputFormat) -> CliResult<i32> {
    let config = DeviceConfig::from_env();
    if config.force_v1 {
        tracing::info!(env = FORCE_V1_ENV, "protocol v1 forced by environment");
    }
    let rows = model_rows(&config);

    match format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["MODEL", "VENDOR", "PRODUCT", "PROTOCOL"]);
            for row in &rows {
                table.add_row(vec![
                    row.model.to_string(),
                    row.vendor_id.clone(),
                    row.product_id.clone(),
                    row.protocol.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for row in &rows {
                println!(
                    "{} {}:{} {}",
                    row.model, row.vendor_id, row.product_id, row.protocol
                );
            }
        }
    }

    Ok(SUCCESS)
}

fn model_rows(config: &DeviceConfig) -> Vec<ModelRow> {
    DeviceModel::ALL
        .into_iter()
        .map(|model| {
            let (vendor_id, product_id) = model.ids();
            ModelRow {
                model,
                vendor_id: format!("{vendor_id:04x}"),
                product_id: format!("{product_id:04x}"),
                protocol: select_protocol(model, config).name(),
            }
        })
        .collect()
}
