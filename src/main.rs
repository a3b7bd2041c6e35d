use std::process::ExitCode;

use clap::Parser;
use pixelmill::cli::{self, CliArgs};
use pixelmill::logger;

fn main() -> ExitCode {
    let args = CliArgs::parse();

    // Initialize session log (overwrites previous session log)
    match &args.log_file {
        Some(path) => logger::init_at(path),
        None => logger::init(),
    }

    cli::run(args)
}
