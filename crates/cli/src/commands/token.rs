//! Token commands.

use super::StoreArgs;
use anyhow::{bail, Result};
use azora_core::AzoraToken;
use clap::{Args, Subcommand};
use colored::Colorize;

#[derive(Args)]
pub struct TokenArgs {
    #[command(subcommand)]
    command: TokenCommand,
}

#[derive(Subcommand)]
enum TokenCommand {
    /// Create (or overwrite) a token record
    Mint {
        #[command(flatten)]
        store: StoreArgs,

        /// Token identifier
        id: String,

        /// Owner name
        owner: String,

        /// Amount to mint
        amount: u64,
    },
    /// Move part of a balance to another owner
    Transfer {
        #[command(flatten)]
        store: StoreArgs,

        /// Token identifier
        id: String,

        /// Current owner
        from: String,

        /// Recipient
        to: String,

        /// Amount to move
        amount: u64,
    },
    /// Show a token record
    Show {
        #[command(flatten)]
        store: StoreArgs,

        /// Token identifier
        id: String,
    },
    /// List all token records
    List {
        #[command(flatten)]
        store: StoreArgs,
    },
}

pub fn run(args: TokenArgs) -> Result<()> {
    match args.command {
        TokenCommand::Mint {
            store,
            id,
            owner,
            amount,
        } => {
            let mut ledger = store.open_ledger()?;
            let token = ledger.mint_token(&id, &owner, amount)?;
            ledger.finish_mining()?;
            println!("{}  Minted token", "✓".green().bold());
            print_token(&token);
            Ok(())
        }
        TokenCommand::Transfer {
            store,
            id,
            from,
            to,
            amount,
        } => {
            let mut ledger = store.open_ledger()?;
            if !ledger.transfer_token(&id, &from, &to, amount)? {
                bail!(
                    "Transfer rejected: token {} must exist, be owned by {} and hold at least {}",
                    id,
                    from,
                    amount
                );
            }
            ledger.finish_mining()?;
            println!("{}  Transferred {} from {} to {}", "✓".green().bold(), amount, from, to);
            let recipient_id = AzoraToken::recipient_id(&id, &to);
            for token in [ledger.get_token(&id), ledger.get_token(&recipient_id)]
                .into_iter()
                .flatten()
            {
                println!();
                print_token(token);
            }
            Ok(())
        }
        TokenCommand::Show { store, id } => {
            let ledger = store.open_ledger()?;
            match ledger.get_token(&id) {
                Some(token) => {
                    println!();
                    print_token(token);
                    println!();
                    Ok(())
                }
                None => bail!("Token not found: {}", id),
            }
        }
        TokenCommand::List { store } => {
            let ledger = store.open_ledger()?;
            println!();
            println!("{}", "Tokens:".bold().cyan());
            println!();
            for token in ledger.tokens() {
                println!(
                    "  {} {} {}",
                    token.id.bright_yellow(),
                    token.owner,
                    token.amount.to_string().bright_cyan()
                );
            }
            println!();
            Ok(())
        }
    }
}

fn print_token(token: &AzoraToken) {
    println!("    Id:     {}", token.id.bright_yellow());
    println!("    Owner:  {}", token.owner.bright_cyan());
    println!("    Amount: {}", token.amount.to_string().bright_cyan());
    println!(
        "    Origin: {}",
        if token.minted { "minted" } else { "received" }
    );
}
