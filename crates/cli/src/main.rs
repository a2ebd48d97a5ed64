//! azora CLI entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "azora")]
#[command(
    about = "A tamper-evident ledger of signed, proof-of-work sealed entries",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Option<commands::Commands>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Some(cmd) => {
            if let Err(e) = commands::run(cmd) {
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("azora - A tamper-evident ledger");
            println!("Run 'azora --help' for usage information.");
        }
    }
}
