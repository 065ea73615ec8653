//! Loop-back exchange against the built-in device emulator.
//!
//! Run with:
//!   cargo run --example loopback
//!
//! Or against a separate emulator:
//!   cargo run --features cli -- emulate 127.0.0.1:9999 --reply aabb
//!   cargo run --features cli -- exchange 127.0.0.1:9999 0001 --verbose

use std::time::Duration;

use apduwire::exchange::{DeviceEmulator, ExchangeError, Reply, TcpTransport};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let emulator = DeviceEmulator::bind("127.0.0.1:0")
        .await?
        .with_script([Reply::ok(vec![0xAA, 0xBB]), Reply::status(0x6985u16)])
        .spawn()?;
    eprintln!("Emulator listening on {}", emulator.addr());

    let mut transport =
        TcpTransport::open(&emulator.addr().to_string(), Duration::from_secs(5)).await?;

    let response = transport.exchange(&[0x00, 0x01]).await?;
    eprintln!("Response payload: {:02x?}", response.as_ref());

    match transport.exchange(&[0x00, 0x02]).await {
        Err(ExchangeError::InvalidStatusCode(code)) => {
            eprintln!("Device refused second APDU: {code} ({})", code.name());
        }
        other => eprintln!("Unexpected outcome: {other:?}"),
    }

    // Script exhausted: the emulator echoes from here on.
    let echoed = transport.exchange(b"ping").await?;
    eprintln!("Echoed: {}", String::from_utf8_lossy(&echoed));

    transport.close().await?;
    emulator.shutdown().await;
    Ok(())
}
