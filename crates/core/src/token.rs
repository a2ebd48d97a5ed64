//! Token records held by the token index.

use serde::{Deserialize, Serialize};

/// A token balance owned by a single party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzoraToken {
    /// Token identifier (index key).
    pub id: String,
    /// Current owner.
    pub owner: String,
    /// Remaining balance.
    pub amount: u64,
    /// True if the record was created by a mint, false if it was created by
    /// receiving a transfer.
    pub minted: bool,
}

impl AzoraToken {
    /// Create a freshly minted token.
    pub fn minted(id: impl Into<String>, owner: impl Into<String>, amount: u64) -> Self {
        Self {
            id: id.into(),
            owner: owner.into(),
            amount,
            minted: true,
        }
    }

    /// Create a record for the receiving side of a transfer.
    pub fn received(id: impl Into<String>, owner: impl Into<String>, amount: u64) -> Self {
        Self {
            id: id.into(),
            owner: owner.into(),
            amount,
            minted: false,
        }
    }

    /// Id of the record that receives `to`'s share of a transfer out of `token_id`.
    pub fn recipient_id(token_id: &str, to: &str) -> String {
        format!("{token_id}:{to}")
    }

    /// Add to the balance.
    pub fn credit(&mut self, amount: u64) {
        self.amount = self.amount.saturating_add(amount);
    }

    /// Subtract from the balance.
    /// Returns true if successful, false if insufficient balance.
    pub fn debit(&mut self, amount: u64) -> bool {
        if self.amount >= amount {
            self.amount -= amount;
            true
        } else {
            false
        }
    }

    /// Check if the record holds at least `amount`.
    pub fn has_balance(&self, amount: u64) -> bool {
        self.amount >= amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debit_and_credit() {
        let mut token = AzoraToken::minted("t", "alice", 100);
        assert!(token.debit(40));
        assert_eq!(token.amount, 60);
        assert!(!token.debit(61));
        assert_eq!(token.amount, 60);

        token.credit(5);
        assert_eq!(token.amount, 65);
    }

    #[test]
    fn test_recipient_id() {
        assert_eq!(AzoraToken::recipient_id("client-42", "bob"), "client-42:bob");
        assert!(!AzoraToken::received("x", "bob", 1).minted);
    }
}
