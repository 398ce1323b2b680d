use std::process::ExitCode;

use clap::Parser;
use photofe::{cli, logger};

fn main() -> ExitCode {
    let args = cli::CliArgs::parse();

    // Initialize session log (overwrites previous session log)
    match &args.log_file {
        Some(path) => logger::init_at(path),
        None => logger::init(),
    }
    logger::set_verbose(args.verbose);
    photofe::log_info!("PhotoFE {} starting", env!("CARGO_PKG_VERSION"));

    cli::run(args)
}
