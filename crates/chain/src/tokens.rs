//! Token index: a materialized view of the `mint` and `transfer` entries.

use azora_core::{AzoraToken, EntryData, LedgerEntry};
use std::collections::BTreeMap;
use thiserror::Error;

/// Why a transfer was refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferRejection {
    #[error("token {0} does not exist")]
    NotFound(String),

    #[error("token {token_id} is owned by {owner}, not {from}")]
    OwnerMismatch {
        token_id: String,
        owner: String,
        from: String,
    },

    #[error("token {token_id} holds {available}, transfer needs {requested}")]
    InsufficientBalance {
        token_id: String,
        available: u64,
        requested: u64,
    },

    #[error("recipient record {recipient_id} belongs to {owner}")]
    RecipientConflict { recipient_id: String, owner: String },
}

/// Token id to record map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenIndex {
    tokens: BTreeMap<String, AzoraToken>,
}

impl TokenIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore from persisted `(id, record)` pairs.
    pub fn from_pairs(pairs: Vec<(String, AzoraToken)>) -> Self {
        Self {
            tokens: pairs.into_iter().collect(),
        }
    }

    /// Rebuild by replaying entries in order.
    ///
    /// Returns the index and the number of token entries applied.
    pub fn replay<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> (Self, usize) {
        let mut index = Self::new();
        let mut applied = 0;
        for entry in entries {
            if index.apply(&entry.data) {
                applied += 1;
            }
        }
        (index, applied)
    }

    /// Persistable `(id, record)` pairs in id order.
    pub fn to_pairs(&self) -> Vec<(String, AzoraToken)> {
        self.tokens
            .iter()
            .map(|(id, token)| (id.clone(), token.clone()))
            .collect()
    }

    /// Get a token record.
    pub fn get(&self, id: &str) -> Option<&AzoraToken> {
        self.tokens.get(id)
    }

    /// Get the number of records.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Iterate records in id order.
    pub fn iter(&self) -> impl Iterator<Item = &AzoraToken> {
        self.tokens.values()
    }

    /// Create or overwrite a minted record.
    pub fn mint(&mut self, id: &str, owner: &str, amount: u64) -> AzoraToken {
        let token = AzoraToken::minted(id, owner, amount);
        self.tokens.insert(id.to_string(), token.clone());
        token
    }

    /// Check a transfer without applying it.
    ///
    /// Returns the id of the record that would receive the amount.
    pub fn check_transfer(
        &self,
        token_id: &str,
        from: &str,
        to: &str,
        amount: u64,
    ) -> Result<String, TransferRejection> {
        let source = self
            .tokens
            .get(token_id)
            .ok_or_else(|| TransferRejection::NotFound(token_id.to_string()))?;

        if source.owner != from {
            return Err(TransferRejection::OwnerMismatch {
                token_id: token_id.to_string(),
                owner: source.owner.clone(),
                from: from.to_string(),
            });
        }

        if !source.has_balance(amount) {
            return Err(TransferRejection::InsufficientBalance {
                token_id: token_id.to_string(),
                available: source.amount,
                requested: amount,
            });
        }

        let recipient_id = AzoraToken::recipient_id(token_id, to);
        if let Some(existing) = self.tokens.get(&recipient_id) {
            if existing.owner != to {
                return Err(TransferRejection::RecipientConflict {
                    recipient_id,
                    owner: existing.owner.clone(),
                });
            }
        }

        Ok(recipient_id)
    }

    /// Move `amount` from `token_id` to the `"{token_id}:{to}"` record.
    ///
    /// Nothing changes when the transfer is rejected.
    pub fn transfer(
        &mut self,
        token_id: &str,
        from: &str,
        to: &str,
        amount: u64,
    ) -> Result<String, TransferRejection> {
        let recipient_id = self.check_transfer(token_id, from, to, amount)?;

        if let Some(source) = self.tokens.get_mut(token_id) {
            source.debit(amount);
        }
        self.tokens
            .entry(recipient_id.clone())
            .or_insert_with(|| AzoraToken::received(recipient_id.as_str(), to, 0))
            .credit(amount);

        Ok(recipient_id)
    }

    /// Apply one entry payload. Returns true if the index changed.
    pub fn apply(&mut self, data: &EntryData) -> bool {
        match data {
            EntryData::Mint {
                token_id,
                owner,
                amount,
            } => {
                self.mint(token_id, owner, *amount);
                true
            }
            EntryData::Transfer {
                token_id,
                from,
                to,
                amount,
                ..
            } => self.transfer(token_id, from, to, *amount).is_ok(),
            _ => false,
        }
    }
}
