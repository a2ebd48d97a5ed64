//! Entry commands.

use super::{format_timestamp, short_hex, StoreArgs};
use anyhow::{bail, Context, Result};
use azora_core::{EntryData, LedgerEntry};
use clap::{Args, Subcommand};
use colored::Colorize;

#[derive(Args)]
pub struct EntryArgs {
    #[command(subcommand)]
    command: EntryCommand,
}

#[derive(Subcommand)]
enum EntryCommand {
    /// Record a generic-log entry
    Add {
        #[command(flatten)]
        store: StoreArgs,

        /// Entry identifier
        id: String,

        /// JSON payload
        payload: String,

        /// Event category (e.g. compliance, onboarding)
        #[arg(short, long, default_value = "generic")]
        category: String,
    },
    /// Show an entry and its Merkle inclusion proof
    Show {
        #[command(flatten)]
        store: StoreArgs,

        /// Entry identifier
        id: String,
    },
    /// List entries waiting for a block
    Pending {
        #[command(flatten)]
        store: StoreArgs,
    },
}

pub fn run(args: EntryArgs) -> Result<()> {
    match args.command {
        EntryCommand::Add {
            store,
            id,
            payload,
            category,
        } => add_entry(store, id, payload, category),
        EntryCommand::Show { store, id } => show_entry(store, id),
        EntryCommand::Pending { store } => list_pending(store),
    }
}

fn add_entry(store: StoreArgs, id: String, payload: String, category: String) -> Result<()> {
    let payload: serde_json::Value = serde_json::from_str(&payload)
        .with_context(|| format!("Payload is not valid JSON: {}", payload))?;

    let mut ledger = store.open_ledger()?;
    let blocks_before = ledger.chain().len();
    let entry = ledger.add_entry(id, EntryData::log(category, payload))?;
    ledger.finish_mining()?;

    println!("{}  Entry recorded", "✓".green().bold());
    print_entry(&entry);

    let sealed = ledger.chain().len() - blocks_before;
    if sealed > 0 {
        println!();
        println!(
            "{}  Sealed {} block(s); tip is #{}",
            "✓".green().bold(),
            sealed,
            ledger.latest_block().index.to_string().bright_cyan()
        );
    } else {
        println!(
            "    Pending:    {}/{}",
            ledger.pending_entries().len(),
            ledger.config().max_entries_per_block
        );
    }
    Ok(())
}

fn show_entry(store: StoreArgs, id: String) -> Result<()> {
    let ledger = store.open_ledger()?;
    let Some((block_index, entry)) = ledger.find_entry(&id) else {
        bail!("Entry not found: {}", id);
    };

    println!();
    println!("{}", "Entry Information:".bold().cyan());
    println!();
    print_entry(entry);
    println!(
        "    Data:       {}",
        serde_json::to_string(&entry.data)?.bright_black()
    );

    match block_index {
        Some(index) => {
            println!("    Block:      #{}", index.to_string().bright_cyan());
            if let Some((_, proof)) = ledger.entry_proof(&id) {
                let root = ledger
                    .block(index)
                    .map(|b| b.merkle_root)
                    .context("Block not found")?;
                let status = if proof.verify(&root) {
                    "valid".green()
                } else {
                    "INVALID".red()
                };
                println!(
                    "    Proof:      {} sibling(s), {}",
                    proof.siblings.len(),
                    status
                );
            }
        }
        None => println!("    Block:      {}", "pending".yellow()),
    }
    println!();
    Ok(())
}

fn list_pending(store: StoreArgs) -> Result<()> {
    let ledger = store.open_ledger()?;
    let pending = ledger.pending_entries();

    println!();
    println!(
        "{} {}",
        "Pending Entries:".bold().cyan(),
        format!("({}/{})", pending.len(), ledger.config().max_entries_per_block).bright_black()
    );
    println!();
    for entry in &pending {
        println!(
            "  {} {} {}",
            format!("#{}", entry.nonce).bright_black(),
            short_hex(&entry.hash.to_hex()).bright_yellow(),
            format!("{} ({})", entry.id, entry.data.kind()).bright_black()
        );
    }
    println!();
    Ok(())
}

fn print_entry(entry: &LedgerEntry) {
    println!("    Id:         {}", entry.id.bright_cyan());
    println!("    Kind:       {}", entry.data.kind());
    println!("    Sequence:   {}", entry.nonce);
    println!("    Hash:       {}", entry.hash.to_hex().bright_yellow());
    println!("    Previous:   {}", entry.previous_hash.to_hex().bright_black());
    println!("    Timestamp:  {}", format_timestamp(entry.timestamp).bright_black());
}
