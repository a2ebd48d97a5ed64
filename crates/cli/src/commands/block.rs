//! Block operations command.

use super::{format_timestamp, short_hex, StoreArgs};
use anyhow::{Context, Result};
use azora_core::Hash;
use clap::{Args, Subcommand};
use colored::Colorize;

#[derive(Args)]
pub struct BlockArgs {
    #[command(subcommand)]
    command: BlockCommand,
}

#[derive(Subcommand)]
enum BlockCommand {
    /// List recent blocks
    List {
        #[command(flatten)]
        store: StoreArgs,

        /// Number of blocks to show
        #[arg(short, long, default_value = "10")]
        count: usize,
    },
    /// Show detailed block information
    Info {
        #[command(flatten)]
        store: StoreArgs,

        /// Block index or hash (hex format)
        block_id: String,
    },
    /// Seal pending entries now, below the threshold
    Mine {
        #[command(flatten)]
        store: StoreArgs,
    },
}

pub fn run(args: BlockArgs) -> Result<()> {
    match args.command {
        BlockCommand::List { store, count } => list_blocks(store, count),
        BlockCommand::Info { store, block_id } => show_block_info(store, block_id),
        BlockCommand::Mine { store } => mine_block(store),
    }
}

fn list_blocks(store: StoreArgs, count: usize) -> Result<()> {
    let ledger = store.open_ledger()?;

    println!();
    println!("{}", "Recent Blocks:".bold().cyan());
    println!();

    for block in ledger.recent_blocks(count) {
        println!(
            "  {} {} {}",
            format!("#{}", block.index).bright_black(),
            short_hex(&block.hash.to_hex()).bright_yellow(),
            format!(
                "({} entries, difficulty {})",
                block.entry_count(),
                block.difficulty
            )
            .bright_black()
        );
    }

    println!();
    Ok(())
}

fn show_block_info(store: StoreArgs, block_id: String) -> Result<()> {
    let ledger = store.open_ledger()?;

    // Try parsing as index first, then as hash
    let block = if let Ok(index) = block_id.parse::<u64>() {
        ledger.block(index).context("Block not found")?
    } else {
        let hash = Hash::from_hex(&block_id)
            .with_context(|| format!("Invalid block hash: {}", block_id))?;
        ledger
            .chain()
            .iter()
            .find(|b| b.hash == hash)
            .context("Block not found")?
    };

    println!();
    println!("{}", "Block Information:".bold().cyan());
    println!();
    println!("  Index:        {}", block.index.to_string().bright_cyan());
    println!("  Hash:         {}", block.hash.to_hex().bright_yellow());
    println!("  Parent Hash:  {}", block.previous_hash.to_hex().bright_black());
    println!("  Merkle Root:  {}", block.merkle_root.to_hex().bright_black());
    println!("  Timestamp:    {}", format_timestamp(block.timestamp).bright_black());
    println!("  Nonce:        {}", block.nonce.to_string().bright_cyan());
    println!("  Difficulty:   {}", block.difficulty.to_string().bright_cyan());
    println!("  Reward:       {}", block.miner_reward.to_string().bright_cyan());
    println!("  Entries:      {}", block.entry_count().to_string().bright_cyan());
    println!();

    if !block.entries.is_empty() {
        println!("{}", "Entries:".bold());
        println!();
        for (i, entry) in block.entries.iter().enumerate() {
            println!(
                "  {} {} {}",
                format!("{}.", i + 1).bright_black(),
                short_hex(&entry.hash.to_hex()).bright_yellow(),
                format!("{} ({})", entry.id, entry.data.kind()).bright_black()
            );
        }
        println!();
    }

    Ok(())
}

fn mine_block(store: StoreArgs) -> Result<()> {
    let mut ledger = store.open_ledger()?;
    let pending = ledger.pending_entries().len();
    if pending == 0 {
        println!("{}", "Nothing to mine: no pending entries.".yellow());
        return Ok(());
    }

    println!(
        "{}",
        format!("Mining {} pending entries at difficulty {}...", pending, ledger.difficulty())
            .bold()
            .cyan()
    );

    match ledger.mine_pending()? {
        Some(block) => {
            println!();
            println!("{}  Sealed block #{}", "✓".green().bold(), block.index);
            println!("    Hash:    {}", block.hash.to_hex().bright_yellow());
            println!("    Nonce:   {}", block.nonce.to_string().bright_cyan());
            println!("    Entries: {}", block.entry_count().to_string().bright_cyan());
            println!("    Reward:  {}", block.miner_reward.to_string().bright_cyan());
        }
        None => {
            println!(
                "{}  Mining gave up; entries remain pending",
                "✗".red().bold()
            );
        }
    }
    Ok(())
}
