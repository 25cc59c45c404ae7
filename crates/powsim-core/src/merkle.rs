//! Binary Merkle tree over an ordered transaction list.
//!
//! Leaves are `digest(canonical(tx))`; a parent is the digest of its
//! children's hex renderings concatenated. An odd transaction list is padded
//! with [`Transaction::sentinel`]; an odd level above the leaves pairs its
//! last entry with itself.
use crate::{digest, to_hex, Hash, Transaction};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MerkleTree {
    /// Root level first, leaf level last.
    levels: Vec<Vec<Hash>>,
}

impl MerkleTree {
    pub fn build(txs: &[Transaction]) -> Self {
        if txs.is_empty() {
            return Self::default();
        }

        let mut padded = txs.to_vec();
        if padded.len() % 2 != 0 {
            padded.push(Transaction::sentinel());
        }

        let mut levels = vec![padded.iter().map(Transaction::digest).collect::<Vec<_>>()];
        loop {
            let current = &levels[levels.len() - 1];
            if current.len() <= 1 {
                break;
            }
            let next = current
                .chunks(2)
                .map(|pair| parent(&pair[0], pair.get(1).unwrap_or(&pair[0])))
                .collect();
            levels.push(next);
        }

        levels.reverse();
        Self { levels }
    }

    pub fn levels(&self) -> &[Vec<Hash>] {
        &self.levels
    }

    pub fn hex_levels(&self) -> Vec<Vec<String>> {
        self.levels
            .iter()
            .map(|level| level.iter().map(to_hex).collect())
            .collect()
    }

    pub fn root(&self) -> Option<Hash> {
        self.levels.first().and_then(|level| level.first()).copied()
    }

    pub fn leaves(&self) -> &[Hash] {
        self.levels.last().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }
}

/// Root of the tree over `txs`, `None` for an empty list.
pub fn merkle_root(txs: &[Transaction]) -> Option<Hash> {
    MerkleTree::build(txs).root()
}

fn parent(left: &Hash, right: &Hash) -> Hash {
    let mut joined = to_hex(left);
    joined.push_str(&to_hex(right));
    digest(joined.as_bytes())
}
