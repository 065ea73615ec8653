use apduwire_exchange::{DeviceEmulator, Fallback};
use apduwire_frame::{ResponseFrame, StatusCode};

use crate::cmd::{parse_duration, parse_hex, EmulateArgs};
use crate::exit::{io_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_listening, OutputFormat};

pub async fn run(args: EmulateArgs, format: OutputFormat) -> CliResult<i32> {
    let status = parse_status(&args.status)?;
    let fallback = match &args.reply {
        Some(hex) => Fallback::Fixed(ResponseFrame::new(parse_hex(hex)?, status)),
        None => Fallback::Echo(status),
    };

    let mut emulator = DeviceEmulator::bind(&args.address)
        .await
        .map_err(|err| io_error("bind failed", err))?
        .with_fallback(fallback);
    if let Some(delay) = &args.delay {
        emulator = emulator.with_fallback_delay(parse_duration(delay)?);
    }

    let address = emulator
        .local_addr()
        .map_err(|err| io_error("bind failed", err))?
        .to_string();
    print_listening(&address, format);
    tracing::info!(%address, status = %status, "emulating device");

    tokio::select! {
        result = emulator.serve() => {
            result.map_err(|err| io_error("accept failed", err))?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(|err| io_error("failed to install Ctrl-C handler", err))?;
            tracing::info!("received Ctrl-C, shutting down");
        }
    }

    Ok(SUCCESS)
}

fn parse_status(input: &str) -> CliResult<StatusCode> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.is_empty() || digits.len() > 4 {
        return Err(CliError::new(
            USAGE,
            format!("status must be 1-4 hex digits: {input}"),
        ));
    }
    u16::from_str_radix(digits, 16)
        .map(StatusCode)
        .map_err(|_| CliError::new(USAGE, format!("invalid status word: {input}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_status_words() {
        assert_eq!(parse_status("9000").unwrap(), StatusCode::OK);
        assert_eq!(parse_status("0x6985").unwrap(), StatusCode(0x6985));
        assert_eq!(parse_status("6f00").unwrap(), StatusCode::UNKNOWN);
    }

    #[test]
    fn rejects_bad_status_words() {
        for bad in ["", "90000", "zz", "0x"] {
            assert!(parse_status(bad).is_err(), "{bad} should be rejected");
        }
    }
}
