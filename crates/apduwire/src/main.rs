mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "apduwire", version, about = "APDU exchange over TCP")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(
        cli.log_format,
        cli.log_level,
        cli.command.wants_wire_logging(),
    );

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format).await;

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_exchange_subcommand() {
        let cli = Cli::try_parse_from([
            "apduwire",
            "exchange",
            "127.0.0.1:9999",
            "e0010000",
            "--timeout",
            "5s",
            "--verbose",
        ])
        .expect("exchange args should parse");

        assert!(cli.command.wants_wire_logging());
        match cli.command {
            Command::Exchange(args) => {
                assert_eq!(args.address, "127.0.0.1:9999");
                assert_eq!(args.apdu, "e0010000");
                assert_eq!(args.timeout, "5s");
                assert!(!args.keep_late_responses);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn exchange_requires_an_apdu() {
        let err = Cli::try_parse_from(["apduwire", "exchange", "127.0.0.1:9999"])
            .expect_err("missing apdu should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parses_emulate_defaults() {
        let cli = Cli::try_parse_from(["apduwire", "--format", "json", "emulate"])
            .expect("emulate args should parse");
        assert!(!cli.command.wants_wire_logging());
        match cli.command {
            Command::Emulate(args) => {
                assert_eq!(args.address, "127.0.0.1:9999");
                assert_eq!(args.status, "9000");
                assert!(args.reply.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_version_extended() {
        let cli = Cli::try_parse_from(["apduwire", "version", "--extended"])
            .expect("version args should parse");
        assert!(matches!(cli.command, Command::Version(args) if args.extended));
    }
}
