use std::fs;

use hidwire_protocol::Protocol;
use hidwire_transport::LoopbackTransport;

use crate::cmd::{offline_protocol, EncodeArgs, PayloadArgs};
use crate::exit::{io_error, protocol_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_chunks, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let mut protocol = offline_protocol(args.protocol, args.session)?;
    let payload = resolve_payload(&args.payload)?;

    let mut transport = LoopbackTransport::new();
    protocol
        .write_message(&mut transport, args.message_type, &payload)
        .map_err(|err| protocol_error("encode failed", err))?;
    let chunks = transport.drain();
    tracing::debug!(chunks = chunks.len(), "encoded message");

    print_chunks(
        protocol.version(),
        args.message_type,
        payload.len(),
        &chunks,
        format,
    );
    Ok(SUCCESS)
}

pub fn resolve_payload(args: &PayloadArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(text) = &args.hex {
        return parse_hex(text);
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(Vec::new())
}

/// Decode hex, ignoring whitespace between byte pairs.
pub fn parse_hex(text: &str) -> CliResult<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&compact).map_err(|err| CliError::new(USAGE, format!("invalid hex payload: {err}")))
}
