use crate::error::{AdmissionRejected, BlockRejected};
use crate::pow::Target;
use crate::{Block, BlockRecord, Ledger, Transaction};

/// A named participant with a simulated compute share and its own ledger.
#[derive(Clone, Debug)]
pub struct Miner {
    identity: String,
    compute_weight: u32,
    ledger: Ledger,
}

impl Miner {
    pub fn new(identity: impl Into<String>, compute_weight: u32, ledger: Ledger) -> Self {
        Self {
            identity: identity.into(),
            compute_weight,
            ledger,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Number of slots this miner takes in the mining schedule.
    pub fn compute_weight(&self) -> u32 {
        self.compute_weight
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Index of the block this miner would mine next on its own chain.
    pub fn next_index(&self) -> u64 {
        self.ledger.next_index()
    }

    /// Replaces the ledger wholesale, used when seeding the shared prefix.
    pub fn adopt(&mut self, ledger: Ledger) {
        self.ledger = ledger;
    }

    /// Admits a private copy of `tx` into this miner's pending block.
    pub fn admit(&mut self, tx: &Transaction) -> bool {
        self.ledger.admit(tx.clone())
    }

    pub fn check_admission(&self, tx: &Transaction) -> Result<(), AdmissionRejected> {
        self.ledger.check_admission(tx)
    }

    pub fn attempt_mine(&mut self, index: u64, nonce: u64, target: &Target) -> (bool, &Block) {
        self.ledger.attempt_mine(index, nonce, target)
    }

    pub fn check_block(&self, block: &Block, target: &Target) -> Result<(), BlockRejected> {
        self.ledger.check_block(block, target)
    }

    pub fn validate(&self, block: &Block, target: &Target) -> bool {
        self.ledger.validate(block, target)
    }

    pub fn commit(&mut self, block: &Block) {
        self.ledger.commit(block)
    }

    /// The committed chain as display records, genesis first.
    pub fn chain_report(&self) -> Vec<BlockRecord> {
        self.ledger.committed().iter().map(Block::record).collect()
    }
}
