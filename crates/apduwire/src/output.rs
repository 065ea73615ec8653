use std::io::{IsTerminal, Write};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use apduwire_frame::StatusCode;
use apduwire_transport::HexBytes;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
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
            Self::Json
        }
    }
}

/// One completed exchange, as reported to the user.
pub struct ExchangeReport<'a> {
    pub address: &'a str,
    pub request: &'a [u8],
    pub response: &'a [u8],
    pub elapsed: Duration,
}

#[derive(Serialize)]
struct ExchangeOutput<'a> {
    address: &'a str,
    request: String,
    status: String,
    status_name: &'static str,
    payload_size: usize,
    payload: String,
    elapsed_ms: u128,
    timestamp: String,
}

pub fn print_exchange(report: &ExchangeReport<'_>, format: OutputFormat) {
    // Only successful exchanges are reported; every other status is an error.
    let status = StatusCode::OK;
    match format {
        OutputFormat::Json => {
            let out = ExchangeOutput {
                address: report.address,
                request: HexBytes(report.request).to_string(),
                status: status.to_string(),
                status_name: status.name(),
                payload_size: report.response.len(),
                payload: HexBytes(report.response).to_string(),
                elapsed_ms: report.elapsed.as_millis(),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PEER", "STATUS", "SIZE", "ELAPSED", "PAYLOAD"])
                .add_row(vec![
                    report.address.to_string(),
                    status.to_string(),
                    report.response.len().to_string(),
                    format!("{}ms", report.elapsed.as_millis()),
                    HexBytes(report.response).to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "peer={} status={} ({}) size={} elapsed={}ms payload={}",
                report.address,
                status,
                status.name(),
                report.response.len(),
                report.elapsed.as_millis(),
                HexBytes(report.response)
            );
        }
        OutputFormat::Raw => {
            print_raw(report.response);
        }
    }
}

#[derive(Serialize)]
struct ListeningOutput<'a> {
    event: &'static str,
    address: &'a str,
}

/// Announce the emulator's bound address on stdout.
pub fn print_listening(address: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ListeningOutput {
                event: "listening",
                address,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty | OutputFormat::Raw => {
            println!("listening on {address}");
        }
    }
    let _ = std::io::stdout().flush();
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
