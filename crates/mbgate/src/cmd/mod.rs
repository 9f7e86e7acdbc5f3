use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use mbgate_frame::{FrameProfile, SentinelConfig, TaggedConfig};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod fragments;
pub mod simulate;
pub mod submit;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode a typed value into register words.
    Encode(EncodeArgs),
    /// Decode register words into a typed value.
    Decode(DecodeArgs),
    /// Show how a message is fragmented for the link.
    Fragments(FragmentsArgs),
    /// Run a device emulator on a datagram socket.
    Simulate(SimulateArgs),
    /// Send one request and print the reply.
    Submit(SubmitArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Fragments(args) => fragments::run(args, format),
        Command::Simulate(args) => simulate::run(args, format),
        Command::Submit(args) => submit::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Base type (bool, int16, uint16, int32, uint32, float32, int64, uint64, float64).
    #[arg(long = "type", short = 't', value_name = "TYPE")]
    pub base_type: String,
    /// Word order (BE, LE, WS1, WS2).
    #[arg(long, short = 'o', default_value = "BE")]
    pub order: String,
    /// Value to encode (true/false, decimal, 0x hex, or float).
    #[arg(allow_hyphen_values = true)]
    pub value: String,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Base type (bool, int16, uint16, int32, uint32, float32, int64, uint64, float64).
    #[arg(long = "type", short = 't', value_name = "TYPE")]
    pub base_type: String,
    /// Word order (BE, LE, WS1, WS2).
    #[arg(long, short = 'o', default_value = "BE")]
    pub order: String,
    /// Register words in transmission order (decimal or 0x hex).
    #[arg(required = true, num_args = 1..)]
    pub words: Vec<String>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ProfileKind {
    #[default]
    Tagged,
    Sentinel,
}

/// Link framing options shared by every command that talks to a device.
#[derive(Args, Debug, Clone)]
pub struct ProfileArgs {
    /// Fragmentation profile spoken by the device.
    #[arg(long, value_enum, default_value = "tagged")]
    pub profile: ProfileKind,
    /// Link MTU in bytes (tagged profile and socket writes).
    #[arg(long, default_value_t = mbgate_channel::DEFAULT_MTU)]
    pub mtu: usize,
    /// Chunk size in bytes (sentinel profile). Defaults to the MTU.
    #[arg(long)]
    pub chunk_size: Option<usize>,
    /// Pause after each sentinel chunk (e.g. 20ms).
    #[arg(long, default_value = "20ms")]
    pub chunk_delay: String,
    /// Sentinel terminator token.
    #[arg(long, default_value = mbgate_frame::DEFAULT_TERMINATOR)]
    pub terminator: String,
}

impl ProfileArgs {
    pub fn to_profile(&self) -> CliResult<FrameProfile> {
        let profile = match self.profile {
            ProfileKind::Tagged => FrameProfile::Tagged(TaggedConfig { mtu: self.mtu }),
            ProfileKind::Sentinel => {
                let chunk_delay = parse_delay(&self.chunk_delay)?;
                FrameProfile::Sentinel(SentinelConfig {
                    chunk_size: self.chunk_size.unwrap_or(self.mtu),
                    chunk_delay,
                    terminator: self.terminator.clone(),
                    terminator_delay: chunk_delay,
                })
            }
        };
        profile
            .validate()
            .map_err(|err| CliError::new(USAGE, err.to_string()))?;
        Ok(profile)
    }
}

#[derive(Args, Debug)]
pub struct FragmentsArgs {
    #[command(flatten)]
    pub link: ProfileArgs,
    /// Message to fragment.
    #[arg(conflicts_with = "file", required_unless_present = "file")]
    pub data: Option<String>,
    /// Read the message from a file.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Socket path to bind.
    pub path: PathBuf,
    /// Socket path replies are sent to.
    pub peer: PathBuf,
    #[command(flatten)]
    pub link: ProfileArgs,
}

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Socket path to bind.
    pub path: PathBuf,
    /// Socket path of the device.
    pub peer: PathBuf,
    #[command(flatten)]
    pub link: ProfileArgs,
    /// JSON payload. Known commands are validated before sending.
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub json: Option<String>,
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["json", "file"])]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["json", "data"])]
    pub file: Option<PathBuf>,
    /// Maximum time to wait for the complete reply (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `500ms`, `2s` or a bare number of seconds. Zero is rejected.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let duration = parse_delay(input)?;
    if duration.is_zero() {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }
    Ok(duration)
}

/// Like [`parse_duration`] but accepts zero.
pub fn parse_delay(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
