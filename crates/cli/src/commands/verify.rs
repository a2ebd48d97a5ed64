//! Chain verification command.

use super::StoreArgs;
use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;

#[derive(Args)]
pub struct VerifyArgs {
    #[command(flatten)]
    store: StoreArgs,
}

pub fn run(args: VerifyArgs) -> Result<()> {
    let ledger = args.store.open_ledger()?;
    let blocks = ledger.chain().len();

    match ledger.verify_chain_detailed() {
        Ok(()) => {
            println!(
                "{}  Chain is valid ({} blocks, {} entries)",
                "✓".green().bold(),
                blocks,
                ledger.chain().iter().map(|b| b.entry_count()).sum::<usize>()
            );
            Ok(())
        }
        Err(err) => {
            println!("{}  Chain is INVALID", "✗".red().bold());
            println!("    {}", err.to_string().red());
            bail!("verification failed")
        }
    }
}
