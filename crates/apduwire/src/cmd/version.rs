use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("apduwire {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: apduwire");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("APDUWIRE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "profile: {}",
        option_env!("APDUWIRE_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "features: exchange={}, cli=true",
        cfg!(feature = "exchange")
    );
    println!(
        "max_response_payload: {}",
        apduwire_frame::DEFAULT_MAX_PAYLOAD
    );
    println!(
        "default_timeout: {}s",
        apduwire_exchange::DEFAULT_TIMEOUT.as_secs()
    );

    Ok(SUCCESS)
}
