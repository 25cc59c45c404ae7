//! Proof-of-work ledger simulation engine.
//!
//! Data flows strictly upward: hashing → [`merkle`] → [`block`] → [`ledger`] →
//! [`miner`] → [`simulation`]. Every miner owns its ledger outright; the only
//! interaction between miners is the broadcast of a sealed candidate block.
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

pub mod block;
pub mod config;
pub mod constants;
pub mod error;
pub mod ledger;
pub mod merkle;
pub mod mine;
pub mod miner;
pub mod simulation;

pub use block::{Block, BlockHeader, BlockRecord, Clock};
pub use config::{MinerSpec, SimulationConfig};
pub use error::{AdmissionRejected, BlockRejected, ConfigError};
pub use ledger::Ledger;
pub use merkle::{merkle_root, MerkleTree};
pub use mine::{RaceMode, RaceWin, Schedule};
pub use miner::Miner;
pub use pow::Target;
pub use simulation::{
    AdmissionMode, Outcome, Phase, Simulation, SimulationReport, TransactionOutcome,
};

use constants::{FIELD_SEPARATOR, TX_SEPARATOR};

pub type Hash = [u8; 32];

/// Previous-hash of the genesis block.
pub const ZERO_HASH: Hash = [0u8; 32];

/// SHA-256 of `bytes`.
pub fn digest(bytes: &[u8]) -> Hash {
    let digest = Sha256::digest(bytes);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..]);
    out
}

pub fn to_hex(hash: &Hash) -> String {
    hex::encode(hash)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Transaction {
    pub from: String,
    pub to: String,
    pub amount: u64,
}

impl Transaction {
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: u64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount,
        }
    }

    /// The empty transaction used to pad an odd leaf level.
    pub fn sentinel() -> Self {
        Self::new("", "", 0)
    }

    /// Canonical text form `from|to|amount`, the only rendering that is ever hashed.
    pub fn canonical(&self) -> String {
        format!(
            "{}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{}",
            self.from, self.to, self.amount
        )
    }

    pub fn digest(&self) -> Hash {
        digest(self.canonical().as_bytes())
    }

    /// The first user id containing a separator, which would make the
    /// canonical form ambiguous.
    pub fn reserved_id(&self) -> Option<&str> {
        [&self.from, &self.to]
            .into_iter()
            .find(|id| id.contains(|c: char| c == FIELD_SEPARATOR || c == TX_SEPARATOR))
            .map(String::as_str)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.reserved_id() {
            Some(id) => Err(ConfigError::InvalidUserId(id.to_string())),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}: {}", self.from, self.to, self.amount)
    }
}

pub mod pow {
    use super::{to_hex, Block, Hash};
    use crate::constants::{BYTE, DEFAULT_TARGET_ZERO_BITS, HASH_HEX_SIZE, HASH_SIZE};
    use crate::error::ConfigError;
    use serde::{Deserialize, Serialize};
    use std::fmt;

    /// A 256-bit difficulty threshold. A hash meets it when the hash, read as a
    /// big-endian integer, is strictly smaller.
    #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(try_from = "String", into = "String")]
    pub struct Target(Hash);

    impl Target {
        pub const fn from_bytes(bytes: Hash) -> Self {
            Self(bytes)
        }

        /// `2^(256 - zero_bits) - 1`: every hash with at least `zero_bits`
        /// leading zero bits (except the all-ones remainder) meets it.
        pub fn from_leading_zero_bits(zero_bits: u32) -> Self {
            let zero_bits = zero_bits.min((HASH_SIZE * BYTE) as u32) as usize;
            let mut bytes = [0xFFu8; HASH_SIZE];
            for (i, byte) in bytes.iter_mut().enumerate() {
                let start = i * BYTE;
                if zero_bits >= start + BYTE {
                    *byte = 0;
                } else if zero_bits > start {
                    *byte = 0xFF >> (zero_bits - start);
                }
            }
            Self(bytes)
        }

        /// Parses up to 64 hex digits (optional `0x`), left padded with zeros.
        pub fn from_hex(s: &str) -> Result<Self, ConfigError> {
            let digits = s
                .trim()
                .trim_start_matches("0x")
                .trim_start_matches("0X");
            if digits.is_empty() || digits.len() > HASH_HEX_SIZE {
                return Err(ConfigError::InvalidTarget(s.to_string()));
            }
            let padded = format!("{digits:0>width$}", width = HASH_HEX_SIZE);
            let decoded =
                hex::decode(&padded).map_err(|_| ConfigError::InvalidTarget(s.to_string()))?;
            let mut bytes = [0u8; HASH_SIZE];
            bytes.copy_from_slice(&decoded);
            Ok(Self(bytes))
        }

        pub fn is_met_by(&self, hash: &Hash) -> bool {
            hash < &self.0
        }

        pub fn as_bytes(&self) -> &Hash {
            &self.0
        }

        pub fn to_hex(&self) -> String {
            to_hex(&self.0)
        }
    }

    impl Default for Target {
        fn default() -> Self {
            Self::from_leading_zero_bits(DEFAULT_TARGET_ZERO_BITS)
        }
    }

    impl fmt::Debug for Target {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "Target(0x{})", self.to_hex())
        }
    }

    impl fmt::Display for Target {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "0x{}", self.to_hex())
        }
    }

    impl TryFrom<String> for Target {
        type Error = ConfigError;

        fn try_from(value: String) -> Result<Self, Self::Error> {
            Self::from_hex(&value)
        }
    }

    impl From<Target> for String {
        fn from(target: Target) -> Self {
            target.to_hex()
        }
    }

    /// Serial proof of work: bump the nonce until the block hash meets `target`.
    pub fn mine_block(mut block: Block, target: &Target) -> Block {
        while !target.is_met_by(&block.hash()) {
            block.set_nonce(block.nonce().wrapping_add(1));
        }
        block
    }

    pub fn count_leading_zero_bits(hash: &Hash) -> u32 {
        let mut total = 0u32;
        for b in hash {
            if *b == 0 {
                total += 8;
            } else {
                total += b.leading_zeros();
                break;
            }
        }
        total
    }
}
