use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use hidwire_protocol::{Frame, ProtocolVersion};
use hidwire_transport::Chunk;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Raw
        }
    }
}

#[derive(Serialize)]
struct ChunksOutput<'a> {
    protocol: &'a str,
    message_type: u32,
    payload_size: usize,
    chunk_count: usize,
    chunks: Vec<String>,
}

/// Print the chunks of one encoded message. `Raw` prints one hex chunk per line.
pub fn print_chunks(
    version: ProtocolVersion,
    message_type: u32,
    payload_size: usize,
    chunks: &[Chunk],
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => {
            let out = ChunksOutput {
                protocol: version.name(),
                message_type,
                payload_size,
                chunk_count: chunks.len(),
                chunks: chunks.iter().map(hex::encode).collect(),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "TAG", "CHUNK"]);
            for (index, chunk) in chunks.iter().enumerate() {
                table.add_row(vec![
                    index.to_string(),
                    format!("{:02x}", chunk[0]),
                    hex::encode(chunk),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "protocol={} type={} size={} chunks={}",
                version,
                message_type,
                payload_size,
                chunks.len()
            );
            for (index, chunk) in chunks.iter().enumerate() {
                println!("  [{index}] {}", spaced_hex(chunk));
            }
        }
        OutputFormat::Raw => {
            for chunk in chunks {
                println!("{}", hex::encode(chunk));
            }
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    protocol: &'a str,
    message_type: u32,
    payload_size: usize,
    payload_hex: String,
    payload: String,
}

/// Print one reassembled frame. `Raw` writes the payload bytes unchanged.
pub fn print_frame(version: ProtocolVersion, frame: &Frame, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                protocol: version.name(),
                message_type: frame.message_type,
                payload_size: frame.payload.len(),
                payload_hex: hex::encode(&frame.payload),
                payload: payload_preview(frame.payload.as_ref()),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PROTOCOL", "TYPE", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    version.to_string(),
                    frame.message_type.to_string(),
                    frame.payload.len().to_string(),
                    payload_preview(frame.payload.as_ref()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "protocol={} type={} size={} payload={}",
                version,
                frame.message_type,
                frame.payload.len(),
                payload_preview(frame.payload.as_ref())
            );
        }
        OutputFormat::Raw => {
            print_raw(frame.payload.as_ref());
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn spaced_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_text_and_binary() {
        assert_eq!(payload_preview(b"hello"), "hello");
        assert_eq!(payload_preview(&[0xFF, 0xFE]), "<binary 2 bytes>");
    }

    #[test]
    fn spaced_hex_groups_bytes() {
        assert_eq!(spaced_hex(&[0x3F, 0x23, 0x23]), "3f 23 23");
    }
}
