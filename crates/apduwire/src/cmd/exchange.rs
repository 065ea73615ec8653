use std::time::Instant;

use apduwire_exchange::{ApduTransport, TcpTransport, TransportConfig};
use bytes::Bytes;

use crate::cmd::{parse_duration, parse_hex, ExchangeArgs};
use crate::exit::{exchange_error, CliResult, SUCCESS};
use crate::output::{print_exchange, ExchangeReport, OutputFormat};

pub async fn run(args: ExchangeArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let apdu = parse_hex(&args.apdu)?;

    let config = TransportConfig::default()
        .with_timeout(timeout)
        .with_verbose(args.verbose)
        .with_discard_late_responses(!args.keep_late_responses);
    let mut transport = TcpTransport::open_with_config(&args.address, config)
        .await
        .map_err(|err| exchange_error("connect failed", err))?;
    transport.set_scramble_key(args.scramble_key);

    let started = Instant::now();
    let response = exchange_once(&mut transport, &apdu).await;
    let elapsed = started.elapsed();

    let response = response.map_err(|err| exchange_error("exchange failed", err))?;
    print_exchange(
        &ExchangeReport {
            address: &args.address,
            request: &apdu,
            response: &response,
            elapsed,
        },
        format,
    );

    Ok(SUCCESS)
}

/// Exchange one APDU and close, whatever the outcome.
async fn exchange_once<T: ApduTransport>(
    transport: &mut T,
    apdu: &[u8],
) -> apduwire_exchange::Result<Bytes> {
    let outcome = transport.exchange(apdu).await;
    if let Err(err) = transport.close().await {
        tracing::warn!(error = %err, "failed to close connection");
    }
    outcome
}
