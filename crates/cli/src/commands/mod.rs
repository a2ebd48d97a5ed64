//! CLI commands module.

use anyhow::{Context, Result};
use azora_chain::{LedgerConfig, LedgerEngine};
use azora_storage::{JsonFileStore, SledStore, SnapshotStore};
use clap::{Args, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};

mod block;
mod entry;
mod init;
mod stats;
mod token;
mod verify;

/// Configuration file inside the data directory.
pub const CONFIG_FILE: &str = "config.json";

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new ledger
    Init(init::InitArgs),
    /// Record and inspect entries
    Entry(entry::EntryArgs),
    /// Token operations
    Token(token::TokenArgs),
    /// Block operations
    Block(block::BlockArgs),
    /// Verify the whole chain
    Verify(verify::VerifyArgs),
    /// Show ledger statistics
    Stats(stats::StatsArgs),
}

pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Init(args) => init::run(args),
        Commands::Entry(args) => entry::run(args),
        Commands::Token(args) => token::run(args),
        Commands::Block(args) => block::run(args),
        Commands::Verify(args) => verify::run(args),
        Commands::Stats(args) => stats::run(args),
    }
}

/// Storage backend for the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Pretty-printed `ledger.json`
    Json,
    /// Embedded sled database under `sled/`
    Sled,
}

/// Where the ledger lives; shared by every command.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Directory to store ledger data
    #[arg(short, long, default_value = "./data")]
    pub data_dir: PathBuf,

    /// Snapshot backend
    #[arg(short, long, value_enum, default_value_t = Backend::Json)]
    pub backend: Backend,
}

/// Ledger engine over whichever backend was selected.
pub type Ledger = LedgerEngine<Box<dyn SnapshotStore>>;

impl StoreArgs {
    fn open_store(&self) -> Result<Box<dyn SnapshotStore>> {
        Ok(match self.backend {
            Backend::Json => Box::new(JsonFileStore::in_dir(&self.data_dir)),
            Backend::Sled => {
                let path = self.data_dir.join("sled");
                Box::new(
                    SledStore::open(&path)
                        .with_context(|| format!("Failed to open sled database: {:?}", path))?,
                )
            }
        })
    }

    /// Open the ledger, mining genesis if the store is empty.
    pub fn open_ledger(&self) -> Result<Ledger> {
        let config = load_config(&self.data_dir)?;
        let store = self.open_store()?;
        LedgerEngine::open(store, config).with_context(|| {
            format!(
                "Failed to open ledger in {:?}. Did you run 'azora init'?",
                self.data_dir
            )
        })
    }
}

/// Read `config.json` from the data directory, or use defaults.
pub fn load_config(data_dir: &Path) -> Result<LedgerConfig> {
    let path = data_dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(LedgerConfig::default());
    }
    let raw = fs::read_to_string(&path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid config file: {:?}", path))
}

/// Render a Unix-millisecond timestamp.
pub fn format_timestamp(millis: u64) -> String {
    i64::try_from(millis)
        .ok()
        .and_then(chrono::DateTime::<chrono::Utc>::from_timestamp_millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}

/// First 16 hex characters of a hash.
pub fn short_hex(hex: &str) -> &str {
    &hex[..hex.len().min(16)]
}
