use allergy_lens_lib::cli::{self, Cli};
use clap::Parser;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    allergy_lens_lib::init();
    cli::run(Cli::parse()).await
}
