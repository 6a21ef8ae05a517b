use std::fs;
use std::io::Read;

use hidwire_protocol::Protocol;
use hidwire_transport::{chunk_from_slice, LoopbackTransport};

use crate::cmd::{offline_protocol, DecodeArgs};
use crate::exit::{
    io_error, protocol_error, transport_error, CliError, CliResult, DATA_INVALID, SUCCESS,
};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let mut protocol = offline_protocol(args.protocol, args.session)?;
    let input = read_input(&args)?;

    let mut transport = LoopbackTransport::new();
    for chunk in parse_chunks(&input)? {
        transport.push_inbound(chunk);
    }

    let frame = protocol
        .read_message(&mut transport)
        .map_err(|err| protocol_error("decode failed", err))?;
    if transport.pending_len() > 0 {
        tracing::warn!(
            trailing = transport.pending_len(),
            "ignoring chunks after the end of the message"
        );
    }

    print_frame(protocol.version(), &frame, format);
    Ok(SUCCESS)
}

fn read_input(args: &DecodeArgs) -> CliResult<String> {
    match &args.file {
        Some(path) => fs::read_to_string(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err)),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .map_err(|err| io_error("failed reading stdin", err))?;
            Ok(input)
        }
    }
}

/// One 64-byte chunk per non-empty line; whitespace inside a line is ignored.
fn parse_chunks(input: &str) -> CliResult<Vec<hidwire_transport::Chunk>> {
    let mut chunks = Vec::new();
    for (index, line) in input.lines().enumerate() {
        let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            continue;
        }
        let bytes = hex::decode(&compact).map_err(|err| {
            CliError::new(DATA_INVALID, format!("line {}: invalid hex: {err}", index + 1))
        })?;
        let chunk = chunk_from_slice(&bytes)
            .map_err(|err| transport_error(&format!("line {}", index + 1), err))?;
        chunks.push(chunk);
    }
    if chunks.is_empty() {
        return Err(CliError::new(DATA_INVALID, "no chunks in input"));
    }
    Ok(chunks)
}
