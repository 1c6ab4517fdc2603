//! Binary crate for the `weather-report` command-line tool.
//!
//! This crate focuses on:
//! - Interactive city and recipient prompts
//! - Logging setup
//! - Mapping the pipeline outcome to an exit code

use std::process::ExitCode;

use clap::Parser;

mod cli;
mod logging;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cmd = cli::Cli::parse();
    match cmd.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("[ERROR] {err:#}");
            ExitCode::FAILURE
        }
    }
}
