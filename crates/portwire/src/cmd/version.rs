use portwire_codec::MessageKind;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("portwire {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: portwire");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("PORTWIRE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "build_profile: {} (opt-level {})",
        option_env!("PORTWIRE_BUILD_PROFILE").unwrap_or("unknown"),
        option_env!("PORTWIRE_BUILD_OPT_LEVEL").unwrap_or("?")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "rustc: {}",
        option_env!("RUSTC_VERSION").unwrap_or("unknown")
    );
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!("message_types: {}", MessageKind::ALL.len());
    println!("features: cli=true");

    Ok(SUCCESS)
}
