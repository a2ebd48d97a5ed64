//! Ledger statistics command.

use super::StoreArgs;
use anyhow::Result;
use clap::Args;
use colored::Colorize;

#[derive(Args)]
pub struct StatsArgs {
    #[command(flatten)]
    store: StoreArgs,

    /// Print as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: StatsArgs) -> Result<()> {
    let ledger = args.store.open_ledger()?;
    let stats = ledger.stats();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let validity = if stats.is_valid {
        "valid".green()
    } else {
        "INVALID".red()
    };

    println!();
    println!("{}", "Ledger Statistics:".bold().cyan());
    println!();
    println!("  Blocks:       {}", stats.total_blocks.to_string().bright_cyan());
    println!("  Entries:      {}", stats.total_entries.to_string().bright_cyan());
    println!("  Pending:      {}", stats.pending_entries.to_string().bright_cyan());
    println!("  Tokens:       {}", stats.total_tokens.to_string().bright_cyan());
    println!("  Difficulty:   {}", stats.current_difficulty.to_string().bright_cyan());
    println!("  Latest Hash:  {}", stats.latest_hash.to_hex().bright_yellow());
    println!("  Chain:        {}", validity);
    println!();
    Ok(())
}
