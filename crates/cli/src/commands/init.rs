//! Initialize ledger command.

use super::{format_timestamp, StoreArgs, CONFIG_FILE};
use anyhow::{bail, Context, Result};
use azora_chain::LedgerConfig;
use clap::Args;
use colored::Colorize;
use std::fs;

#[derive(Args)]
pub struct InitArgs {
    #[command(flatten)]
    store: StoreArgs,

    /// Entries per block (mining threshold)
    #[arg(long, default_value = "10")]
    block_size: usize,

    /// Difficulty of the first mined block
    #[arg(long, default_value = "2")]
    difficulty: u32,

    /// Target time between blocks in seconds
    #[arg(long, default_value = "30")]
    block_time: u64,
}

pub fn run(args: InitArgs) -> Result<()> {
    println!("{}", "Initializing azora ledger...".bold().cyan());
    println!();

    let data_dir = &args.store.data_dir;
    let config_file = data_dir.join(CONFIG_FILE);
    if config_file.exists() {
        bail!("Ledger already initialized in {:?}", data_dir);
    }

    fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;
    println!("{}  Created data directory", "✓".green().bold());

    let mut config = LedgerConfig {
        max_entries_per_block: args.block_size,
        initial_difficulty: args.difficulty,
        ..LedgerConfig::default()
    };
    config.difficulty.target_block_time_ms = args.block_time.saturating_mul(1000);
    config.validate()?;

    fs::write(&config_file, serde_json::to_string_pretty(&config)?)?;
    println!(
        "{}  Saved config to: {}",
        "✓".green().bold(),
        config_file.display().to_string().bright_black()
    );

    let ledger = match args.store.open_ledger() {
        Ok(ledger) => ledger,
        Err(err) => {
            // Leave the directory re-initializable.
            let _ = fs::remove_file(&config_file);
            return Err(err);
        }
    };
    let genesis = &ledger.chain()[0];

    println!();
    println!("{}  Mined genesis block", "✓".green().bold());
    println!("    Hash:      {}", genesis.hash.to_hex().bright_yellow());
    println!("    Nonce:     {}", genesis.nonce.to_string().bright_cyan());
    println!("    Timestamp: {}", format_timestamp(genesis.timestamp).bright_black());
    println!("    Store:     {}", ledger.store().describe().bright_black());

    println!();
    println!("{}", "Ledger initialized successfully!".green().bold());
    println!();
    println!("Next steps:");
    println!("  • Use {} to record events", "azora entry add".bright_cyan());
    println!("  • Use {} to mint tokens", "azora token mint".bright_cyan());
    println!("  • Use {} to check integrity", "azora verify".bright_cyan());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Backend;
    use tempfile::TempDir;

    fn init_args(dir: &TempDir, block_size: usize) -> InitArgs {
        InitArgs {
            store: StoreArgs {
                data_dir: dir.path().join("ledger"),
                backend: Backend::Json,
            },
            block_size,
            difficulty: 1,
            block_time: 30,
        }
    }

    #[test]
    fn test_invalid_config_leaves_directory_initializable() {
        let dir = TempDir::new().unwrap();

        assert!(run(init_args(&dir, 0)).is_err());
        assert!(!dir.path().join("ledger").join(CONFIG_FILE).exists());

        run(init_args(&dir, 10)).unwrap();
        assert!(dir.path().join("ledger").join(CONFIG_FILE).exists());
        assert!(run(init_args(&dir, 10)).is_err());
    }
}
