//! ccpm - critical chain project management from the command line

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = ccpm::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
