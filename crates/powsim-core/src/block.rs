use crate::constants::{FIELD_SEPARATOR, TX_SEPARATOR};
use crate::merkle::merkle_root;
use crate::{digest, to_hex, Hash, Transaction, ZERO_HASH};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of block timestamps. `Fixed` pins every block to one instant so
/// runs and tests are reproducible.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Clock {
    #[default]
    System,
    Fixed(u64),
}

impl Clock {
    /// Seconds since the unix epoch.
    pub fn now(&self) -> u64 {
        match self {
            Clock::System => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
            Clock::Fixed(ts) => *ts,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub index: u64,
    pub timestamp: u64,
    pub merkle_root: Option<Hash>,
    pub nonce: u64,
    pub previous_hash: Hash,
}

impl BlockHeader {
    pub fn new(index: u64, previous_hash: Hash, timestamp: u64) -> Self {
        Self {
            index,
            timestamp,
            merkle_root: None,
            nonce: 0,
            previous_hash,
        }
    }
}

/// A block and its derived hash. Every mutator reseals, so `hash` always
/// matches the fields unless the block was deserialized from a forged record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    header: BlockHeader,
    txs: Vec<Transaction>,
    hash: Hash,
}

impl Block {
    pub fn new(index: u64, previous_hash: Hash, timestamp: u64, txs: Vec<Transaction>) -> Self {
        let mut header = BlockHeader::new(index, previous_hash, timestamp);
        header.merkle_root = merkle_root(&txs);
        let mut block = Self {
            header,
            txs,
            hash: ZERO_HASH,
        };
        block.seal();
        block
    }

    /// Index 0, no transactions, zero previous hash.
    pub fn genesis(timestamp: u64) -> Self {
        Self::new(0, ZERO_HASH, timestamp, Vec::new())
    }

    pub fn index(&self) -> u64 {
        self.header.index
    }

    pub fn timestamp(&self) -> u64 {
        self.header.timestamp
    }

    pub fn nonce(&self) -> u64 {
        self.header.nonce
    }

    pub fn previous_hash(&self) -> Hash {
        self.header.previous_hash
    }

    pub fn merkle_root(&self) -> Option<Hash> {
        self.header.merkle_root
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.txs
    }

    /// The carried hash, as last sealed (or as received).
    pub fn hash(&self) -> Hash {
        self.hash
    }

    /// `timestamp|tx;tx|merkle_root|nonce|previous_hash`, with transactions in
    /// canonical form and an empty field for a missing root.
    pub fn preimage(&self) -> String {
        self.preimage_with_nonce(self.header.nonce)
    }

    fn preimage_with_nonce(&self, nonce: u64) -> String {
        let tx_sep = TX_SEPARATOR.to_string();
        let txs = self
            .txs
            .iter()
            .map(Transaction::canonical)
            .collect::<Vec<_>>()
            .join(tx_sep.as_str());
        let root = self.header.merkle_root.as_ref().map(to_hex).unwrap_or_default();
        format!(
            "{ts}{sep}{txs}{sep}{root}{sep}{nonce}{sep}{prev}",
            ts = self.header.timestamp,
            prev = to_hex(&self.header.previous_hash),
            sep = FIELD_SEPARATOR,
        )
    }

    /// Hash recomputed from the current fields.
    pub fn compute_hash(&self) -> Hash {
        digest(self.preimage().as_bytes())
    }

    /// Hash the block would have with `nonce`, without touching it.
    pub fn hash_with_nonce(&self, nonce: u64) -> Hash {
        digest(self.preimage_with_nonce(nonce).as_bytes())
    }

    pub fn seal(&mut self) -> Hash {
        self.hash = self.compute_hash();
        self.hash
    }

    pub fn is_sealed(&self) -> bool {
        self.hash == self.compute_hash()
    }

    pub fn set_nonce(&mut self, nonce: u64) {
        self.header.nonce = nonce;
        self.seal();
    }

    /// Points the block at `previous_hash` as block number `index`.
    pub fn link(&mut self, index: u64, previous_hash: Hash) {
        self.header.index = index;
        self.header.previous_hash = previous_hash;
        self.seal();
    }

    pub fn push_transaction(&mut self, tx: Transaction) {
        self.txs.push(tx);
        self.header.merkle_root = merkle_root(&self.txs);
        self.seal();
    }

    pub fn record(&self) -> BlockRecord {
        BlockRecord {
            index: self.header.index,
            timestamp: self.header.timestamp,
            nonce: self.header.nonce,
            transactions: self.txs.clone(),
            merkle_root: self.header.merkle_root.as_ref().map(to_hex),
            previous_hash: to_hex(&self.header.previous_hash),
            hash: to_hex(&self.hash),
        }
    }
}

/// Display/audit view of a committed block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub index: u64,
    pub timestamp: u64,
    pub nonce: u64,
    pub transactions: Vec<Transaction>,
    pub merkle_root: Option<String>,
    pub previous_hash: String,
    pub hash: String,
}
