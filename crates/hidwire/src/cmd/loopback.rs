use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use hidwire_device::{Device, DeviceConfig};
use hidwire_protocol::{ProtocolVersion, TAG_SESSION_CLOSE, TAG_SESSION_OPEN};
use hidwire_transport::{DeviceModel, LoopbackTransport, CHUNK_SIZE};
use serde::Serialize;

use crate::cmd::LoopbackArgs;
use crate::exit::{device_error, CliResult, FAILURE, SUCCESS};
use crate::output::{print_json, OutputFormat};

/// Message type used for every probe payload.
const PROBE_MESSAGE_TYPE: u32 = 0x55;

#[derive(Debug, Serialize)]
struct LoopbackResult {
    protocol: &'static str,
    payload_size: usize,
    chunks: usize,
    ok: bool,
}

pub fn run(args: LoopbackArgs, format: OutputFormat) -> CliResult<i32> {
    let mut results = Vec::with_capacity(args.sizes.len() * 2);
    for (model, version) in [
        (DeviceModel::Legacy, ProtocolVersion::V1),
        (DeviceModel::Current, ProtocolVersion::V2),
    ] {
        results.extend(run_protocol(model, version, &args)?);
    }

    let failed = results.iter().filter(|r| !r.ok).count();
    print_results(&results, format);

    if failed > 0 {
        tracing::error!(failed, "loopback round-trip mismatches");
        return Ok(FAILURE);
    }
    Ok(SUCCESS)
}

fn run_protocol(
    model: DeviceModel,
    version: ProtocolVersion,
    args: &LoopbackArgs,
) -> CliResult<Vec<LoopbackResult>> {
    let config = DeviceConfig::default();
    let mut device = Device::for_model(LoopbackTransport::new(), model, &config);

    // The simulated device answers the handshake with the configured session.
    if version == ProtocolVersion::V2 {
        device
            .get_mut()
            .push_inbound(session_reply(TAG_SESSION_OPEN, args.session));
    }
    device
        .open()
        .map_err(|err| device_error("session open failed", err))?;
    device.get_mut().drain();

    let mut results = Vec::with_capacity(args.sizes.len());
    for &size in &args.sizes {
        let payload: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        let before = device.get_ref().chunks_written();
        let frame = device
            .call(PROBE_MESSAGE_TYPE, &payload)
            .map_err(|err| device_error("round-trip failed", err))?;
        let chunks = device.get_ref().chunks_written() - before;

        let ok = frame.message_type == PROBE_MESSAGE_TYPE
            && frame.payload.as_ref() == payload.as_slice();
        tracing::debug!(%version, size, chunks, ok, "loopback round-trip");
        results.push(LoopbackResult {
            protocol: version.name(),
            payload_size: size,
            chunks,
            ok,
        });
    }

    if version == ProtocolVersion::V2 {
        device
            .get_mut()
            .push_inbound(session_reply(TAG_SESSION_CLOSE, 0));
    }
    device
        .close()
        .map_err(|err| device_error("session close failed", err))?;

    Ok(results)
}

fn session_reply(tag: u8, session: u32) -> hidwire_transport::Chunk {
    let mut chunk = [0u8; CHUNK_SIZE];
    chunk[0] = tag;
    chunk[1..5].copy_from_slice(&session.to_be_bytes());
    chunk
}

fn print_results(results: &[LoopbackResult], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&results),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PROTOCOL", "SIZE", "CHUNKS", "RESULT"]);
            for r in results {
                table.add_row(vec![
                    r.protocol.to_string(),
                    r.payload_size.to_string(),
                    r.chunks.to_string(),
                    status(r.ok).to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for r in results {
                println!(
                    "{} size={} chunks={} {}",
                    r.protocol,
                    r.payload_size,
                    r.chunks,
                    status(r.ok)
                );
            }
        }
    }
}

fn status(ok: bool) -> &'static str {
    if ok {
        "ok"
    } else {
        "MISMATCH"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_protocols_roundtrip_default_sizes() {
        let args = LoopbackArgs {
            sizes: vec![0, 1, 55, 56, 57, 59, 60, 118, 119, 500],
            session: 0x0000_0001,
        };

        for (model, version) in [
            (DeviceModel::Legacy, ProtocolVersion::V1),
            (DeviceModel::Current, ProtocolVersion::V2),
        ] {
            let results = run_protocol(model, version, &args).unwrap();
            assert_eq!(results.len(), args.sizes.len());
            assert!(results.iter().all(|r| r.ok), "{version}");
        }
    }

    #[test]
    fn chunk_counts_follow_layout() {
        let args = LoopbackArgs {
            sizes: vec![55, 56],
            session: 7,
        };
        let v1 = run_protocol(DeviceModel::Legacy, ProtocolVersion::V1, &args).unwrap();
        let v2 = run_protocol(DeviceModel::Current, ProtocolVersion::V2, &args).unwrap();

        // V1: 8 + 55 = 63 fits the first chunk; 64 does not.
        assert_eq!(v1.iter().map(|r| r.chunks).collect::<Vec<_>>(), vec![1, 2]);
        // V2: 8 + 55 = 63 exceeds the 59-byte first report.
        assert_eq!(v2.iter().map(|r| r.chunks).collect::<Vec<_>>(), vec![2, 2]);
    }
}
