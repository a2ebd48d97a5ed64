//! Merkle aggregation over ledger entries.

use crate::entry::LedgerEntry;
use crate::hash::{hash, hash_concat, Hash};
use serde::{Deserialize, Serialize};

/// Compute the merkle root of a list of leaf hashes.
///
/// Returns `SHA256("")` if the list is empty.
/// Uses a binary merkle tree with pair-wise hashing.
pub fn merkle_root(hashes: &[Hash]) -> Hash {
    if hashes.is_empty() {
        return hash(b"");
    }

    let mut current_level: Vec<Hash> = hashes.to_vec();

    while current_level.len() > 1 {
        current_level = next_level(&current_level);
    }

    current_level[0]
}

/// Merkle root of a batch of entries, using [`LedgerEntry::leaf_hash`] leaves.
pub fn entries_merkle_root(entries: &[LedgerEntry]) -> Hash {
    let leaves: Vec<Hash> = entries.iter().map(LedgerEntry::leaf_hash).collect();
    merkle_root(&leaves)
}

fn next_level(level: &[Hash]) -> Vec<Hash> {
    level
        .chunks(2)
        .map(|chunk| match chunk {
            [left, right] => hash_concat(&[left.as_ref(), right.as_ref()]),
            // Odd number of elements: hash the last one with itself
            [last] => hash_concat(&[last.as_ref(), last.as_ref()]),
            _ => unreachable!("chunks(2) yields one or two elements"),
        })
        .collect()
}

/// A merkle tree for inclusion proofs.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    /// All nodes in the tree, level by level (leaves first).
    levels: Vec<Vec<Hash>>,
    /// Number of real leaves (zero for the empty tree).
    leaf_count: usize,
}

/// A merkle proof for a single leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// The leaf being proven.
    pub leaf: Hash,
    /// Sibling hashes from leaf to root.
    pub siblings: Vec<Hash>,
    /// Direction for each sibling (true = sibling is on the right).
    pub directions: Vec<bool>,
}

impl MerkleTree {
    /// Build a merkle tree from a list of leaf hashes.
    pub fn new(leaves: &[Hash]) -> Self {
        if leaves.is_empty() {
            return Self {
                levels: vec![vec![merkle_root(&[])]],
                leaf_count: 0,
            };
        }

        let mut levels = vec![leaves.to_vec()];
        while let Some(current) = levels.last().filter(|level| level.len() > 1) {
            let next = next_level(current);
            levels.push(next);
        }

        Self {
            levels,
            leaf_count: leaves.len(),
        }
    }

    /// Build the tree over a batch of entries.
    pub fn from_entries(entries: &[LedgerEntry]) -> Self {
        let leaves: Vec<Hash> = entries.iter().map(LedgerEntry::leaf_hash).collect();
        Self::new(&leaves)
    }

    /// Get the root of the merkle tree.
    pub fn root(&self) -> Hash {
        self.levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .unwrap_or_else(|| merkle_root(&[]))
    }

    /// Get the number of leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Generate a proof for the leaf at the given index.
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        if index >= self.leaf_count() {
            return None;
        }

        let leaf = self.levels[0][index];
        let mut siblings = Vec::new();
        let mut directions = Vec::new();
        let mut idx = index;

        for level in &self.levels[..self.levels.len() - 1] {
            let is_right = idx % 2 == 0;
            let sibling_idx = if is_right { idx + 1 } else { idx - 1 };

            let sibling = if sibling_idx < level.len() {
                level[sibling_idx]
            } else {
                level[idx] // Odd leaf hashes with itself
            };

            siblings.push(sibling);
            directions.push(is_right);
            idx /= 2;
        }

        Some(MerkleProof {
            leaf,
            siblings,
            directions,
        })
    }
}

impl MerkleProof {
    /// Verify this proof against a given root.
    pub fn verify(&self, root: &Hash) -> bool {
        let mut current = self.leaf;

        for (sibling, is_right) in self.siblings.iter().zip(self.directions.iter()) {
            current = if *is_right {
                hash_concat(&[current.as_ref(), sibling.as_ref()])
            } else {
                hash_concat(&[sibling.as_ref(), current.as_ref()])
            };
        }

        current == *root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyManager;
    use crate::entry::{EntryContext, EntryData};
    use serde_json::json;

    fn make_hashes(n: usize) -> Vec<Hash> {
        (0..n).map(|i| hash(&[i as u8])).collect()
    }

    fn make_entries(n: usize) -> Vec<LedgerEntry> {
        let keys = KeyManager::generate().unwrap();
        let mut previous_hash = Hash::ZERO;
        (0..n)
            .map(|i| {
                let entry = LedgerEntry::create(
                    format!("e-{i}"),
                    EntryData::log("generic", json!({ "i": i })),
                    EntryContext {
                        previous_hash,
                        sequence: i as u64,
                        difficulty: 1,
                    },
                    &keys,
                );
                previous_hash = entry.hash;
                entry
            })
            .collect()
    }

    #[test]
    fn test_merkle_root_empty() {
        assert_eq!(merkle_root(&[]), hash(b""));
        assert_eq!(entries_merkle_root(&[]), hash(b""));
    }

    #[test]
    fn test_merkle_root_single() {
        let hashes = make_hashes(1);
        assert_eq!(merkle_root(&hashes), hashes[0]);
    }

    #[test]
    fn test_merkle_root_three_duplicates_last() {
        let hashes = make_hashes(3);
        let left = hash_concat(&[hashes[0].as_ref(), hashes[1].as_ref()]);
        let right = hash_concat(&[hashes[2].as_ref(), hashes[2].as_ref()]);
        let expected = hash_concat(&[left.as_ref(), right.as_ref()]);
        assert_eq!(merkle_root(&hashes), expected);
    }

    #[test]
    fn test_entries_root_deterministic() {
        let entries = make_entries(5);
        assert_eq!(entries_merkle_root(&entries), entries_merkle_root(&entries));
    }

    #[test]
    fn test_entries_root_order_sensitive() {
        let entries = make_entries(4);
        let mut swapped = entries.clone();
        swapped.swap(0, 1);
        assert_ne!(entries_merkle_root(&entries), entries_merkle_root(&swapped));
    }

    #[test]
    fn test_tree_root_matches() {
        for n in [1, 2, 7, 8] {
            let hashes = make_hashes(n);
            assert_eq!(MerkleTree::new(&hashes).root(), merkle_root(&hashes));
        }
    }

    #[test]
    fn test_proofs_verify_for_every_leaf() {
        let entries = make_entries(5);
        let tree = MerkleTree::from_entries(&entries);
        let root = entries_merkle_root(&entries);

        for (i, entry) in entries.iter().enumerate() {
            let proof = tree.proof(i).unwrap();
            assert_eq!(proof.leaf, entry.leaf_hash());
            assert!(proof.verify(&root));
        }
    }

    #[test]
    fn test_proof_invalid_index_and_wrong_root() {
        let tree = MerkleTree::new(&make_hashes(4));
        assert!(tree.proof(10).is_none());
        assert!(!tree.proof(0).unwrap().verify(&hash(b"wrong")));
        assert_eq!(MerkleTree::new(&[]).leaf_count(), 0);
    }
}
