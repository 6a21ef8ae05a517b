use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use hidwire_protocol::{ProtocolV1, ProtocolV2, ProtocolVersion, WireProtocol};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

#[cfg(feature = "usb")]
pub mod call;
pub mod decode;
pub mod encode;
#[cfg(feature = "usb")]
pub mod list;
pub mod loopback;
pub mod models;
pub mod version;

/// Payload lengths that straddle every V1/V2 chunk boundary.
pub const DEFAULT_LOOPBACK_SIZES: &str = "0,1,55,56,57,59,60,118,119,500";

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Frame a payload and print the chunks that would be sent.
    Encode(EncodeArgs),
    /// Reassemble a message from hex chunks.
    Decode(DecodeArgs),
    /// Round-trip payloads through both protocols over an in-memory transport.
    Loopback(LoopbackArgs),
    /// List known device models and the protocol each would use.
    Models(ModelsArgs),
    /// List attached devices.
    #[cfg(feature = "usb")]
    List(ListArgs),
    /// Send one message to an attached device and print the reply.
    #[cfg(feature = "usb")]
    Call(CallArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Loopback(args) => loopback::run(args, format),
        Command::Models(args) => models::run(args, format),
        #[cfg(feature = "usb")]
        Command::List(args) => list::run(args, format),
        #[cfg(feature = "usb")]
        Command::Call(args) => call::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum ProtocolArg {
    V1,
    V2,
}

impl From<ProtocolArg> for ProtocolVersion {
    fn from(arg: ProtocolArg) -> Self {
        match arg {
            ProtocolArg::V1 => ProtocolVersion::V1,
            ProtocolArg::V2 => ProtocolVersion::V2,
        }
    }
}

/// Protocol state for offline encoding/decoding. V2 needs the session id the
/// reports were (or will be) exchanged under.
pub fn offline_protocol(arg: ProtocolArg, session: Option<u32>) -> CliResult<WireProtocol> {
    match (arg, session) {
        (ProtocolArg::V1, _) => Ok(ProtocolV1::new().into()),
        (ProtocolArg::V2, Some(session)) => Ok(ProtocolV2::with_session(session).into()),
        (ProtocolArg::V2, None) => Err(CliError::new(USAGE, "--session is required for v2")),
    }
}

/// Parse a decimal or `0x`-prefixed hexadecimal `u32`.
pub fn parse_u32(input: &str) -> Result<u32, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|err| format!("invalid number '{input}': {err}"))
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Protocol generation.
    #[arg(long, short = 'p')]
    pub protocol: ProtocolArg,
    /// Message type identifier.
    #[arg(long = "type", short = 't', value_parser = parse_u32)]
    pub message_type: u32,
    /// Session id (v2 only; decimal or 0x-prefixed hex).
    #[arg(long, short = 's', value_parser = parse_u32)]
    pub session: Option<u32>,
    #[command(flatten)]
    pub payload: PayloadArgs,
}

/// Where a message payload comes from. Empty when none is given.
#[derive(Args, Debug, Default)]
pub struct PayloadArgs {
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["hex", "file"])]
    pub data: Option<String>,
    /// Hex-encoded payload.
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub hex: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["data", "hex"])]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Protocol generation.
    #[arg(long, short = 'p')]
    pub protocol: ProtocolArg,
    /// Session id (v2 only; decimal or 0x-prefixed hex).
    #[arg(long, short = 's', value_parser = parse_u32)]
    pub session: Option<u32>,
    /// Read hex chunks from file instead of stdin (one chunk per line).
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct LoopbackArgs {
    /// Payload sizes to round-trip (comma-separated).
    #[arg(long, value_delimiter = ',', default_value = DEFAULT_LOOPBACK_SIZES)]
    pub sizes: Vec<usize>,
    /// Session id announced by the simulated device for v2.
    #[arg(long, value_parser = parse_u32, default_value = "0x00000001")]
    pub session: u32,
}

#[derive(Args, Debug, Default)]
pub struct ModelsArgs {}

#[cfg(feature = "usb")]
#[derive(Args, Debug, Default)]
pub struct ListArgs {}

#[cfg(feature = "usb")]
#[derive(Args, Debug)]
pub struct CallArgs {
    /// Message type identifier.
    #[arg(long = "type", short = 't', value_parser = parse_u32)]
    pub message_type: u32,
    /// Device path from `list` (default: first attached device).
    #[arg(long)]
    pub path: Option<String>,
    #[command(flatten)]
    pub payload: PayloadArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
