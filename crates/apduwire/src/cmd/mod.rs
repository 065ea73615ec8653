use std::time::Duration;

use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod emulate;
pub mod exchange;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send one APDU and print the response payload.
    Exchange(ExchangeArgs),
    /// Run a device emulator that answers APDUs.
    Emulate(EmulateArgs),
    /// Show version information.
    Version(VersionArgs),
}

impl Command {
    /// Whether wire byte dumps should be shown on stderr.
    pub fn wants_wire_logging(&self) -> bool {
        matches!(self, Command::Exchange(args) if args.verbose)
    }
}

pub async fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Exchange(args) => exchange::run(args, format).await,
        Command::Emulate(args) => emulate::run(args, format).await,
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ExchangeArgs {
    /// Device address (host:port).
    pub address: String,
    /// APDU as hex, e.g. e0010000 or "e0 01 00 00".
    pub apdu: String,
    /// Connect and response timeout (e.g. 30s, 500ms).
    #[arg(long, default_value = "30s")]
    pub timeout: String,
    /// Log raw wire bytes to stderr.
    #[arg(long, short = 'v')]
    pub verbose: bool,
    /// Application scramble key, stored on the transport.
    #[arg(long, env = "APDUWIRE_SCRAMBLE_KEY")]
    pub scramble_key: Option<String>,
    /// Keep late responses from timed-out exchanges instead of dropping them.
    #[arg(long)]
    pub keep_late_responses: bool,
}

#[derive(Args, Debug)]
pub struct EmulateArgs {
    /// Address to listen on (host:port, port 0 picks a free one).
    #[arg(default_value = "127.0.0.1:9999")]
    pub address: String,
    /// Status word to answer with, as hex.
    #[arg(long, default_value = "9000")]
    pub status: String,
    /// Fixed response payload as hex. Without it the request is echoed.
    #[arg(long)]
    pub reply: Option<String>,
    /// Delay before each answer (e.g. 2s, 150ms).
    #[arg(long)]
    pub delay: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit: {unit}"),
        )),
    }
}

/// Parse hex, ignoring whitespace and an optional `0x` prefix.
pub(crate) fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: Vec<u8> = trimmed
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    if digits.len() % 2 != 0 {
        return Err(CliError::new(
            USAGE,
            format!("hex input has an odd number of digits: {input}"),
        ));
    }

    digits
        .chunks(2)
        .map(|pair| match (hex_value(pair[0]), hex_value(pair[1])) {
            (Some(hi), Some(lo)) => Ok((hi << 4) | lo),
            _ => Err(CliError::new(USAGE, format!("invalid hex input: {input}"))),
        })
        .collect()
}

fn hex_value(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}
