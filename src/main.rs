// src/main.rs

use clap::Parser;
use mfa_default::cli::Cli;

// Запросы к каталогу идут строго по очереди, одного потока достаточно
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    cli.run().await
}
