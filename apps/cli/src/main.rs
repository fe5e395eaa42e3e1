//! Sanbill command-line entry point.

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    sanbill_cli::run(std::env::args_os()).await
}
