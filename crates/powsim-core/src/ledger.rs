use crate::error::{AdmissionRejected, BlockRejected};
use crate::pow::Target;
use crate::{to_hex, Block, Clock, Transaction};
use tracing::debug;

/// One miner's private chain: committed blocks (genesis first) plus the
/// pending block being assembled and mined.
#[derive(Clone, Debug)]
pub struct Ledger {
    committed: Vec<Block>,
    pending: Block,
    clock: Clock,
}

impl Ledger {
    /// A ledger holding only a fresh genesis block.
    pub fn new(clock: Clock) -> Self {
        Self::from_blocks(Vec::new(), clock)
    }

    /// Adopts `blocks` as the committed chain. An empty list starts from a
    /// fresh genesis block.
    pub fn from_blocks(mut blocks: Vec<Block>, clock: Clock) -> Self {
        if blocks.is_empty() {
            blocks.push(Block::genesis(clock.now()));
        }
        let pending = Self::fresh_pending(&blocks[blocks.len() - 1], &clock);
        Self {
            committed: blocks,
            pending,
            clock,
        }
    }

    fn fresh_pending(tip: &Block, clock: &Clock) -> Block {
        Block::new(tip.index() + 1, tip.hash(), clock.now(), Vec::new())
    }

    pub fn committed(&self) -> &[Block] {
        &self.committed
    }

    pub fn pending(&self) -> &Block {
        &self.pending
    }

    /// Last committed block. Never absent: the genesis block is always there.
    pub fn tip(&self) -> &Block {
        &self.committed[self.committed.len() - 1]
    }

    /// Index the next block on this chain carries: the chain height.
    pub fn next_index(&self) -> u64 {
        self.tip().index() + 1
    }

    /// Credits minus debits of `user` over committed blocks after genesis.
    pub fn balance_of(&self, user: &str) -> i128 {
        self.committed
            .iter()
            .skip(1)
            .flat_map(|block| block.transactions())
            .fold(0i128, |mut balance, tx| {
                if tx.to == user {
                    balance += i128::from(tx.amount);
                }
                if tx.from == user {
                    balance -= i128::from(tx.amount);
                }
                balance
            })
    }

    /// Ids with a separator are refused so two different transactions never
    /// share a canonical form.
    pub fn check_admission(&self, tx: &Transaction) -> Result<(), AdmissionRejected> {
        if let Some(id) = tx.reserved_id() {
            return Err(AdmissionRejected::InvalidUserId(id.to_string()));
        }
        let available = self.balance_of(&tx.from);
        if available >= i128::from(tx.amount) {
            Ok(())
        } else {
            Err(AdmissionRejected::InsufficientFunds {
                from: tx.from.clone(),
                available,
                requested: tx.amount,
            })
        }
    }

    /// Appends `tx` to the pending block if its sender can cover it.
    pub fn admit(&mut self, tx: Transaction) -> bool {
        match self.check_admission(&tx) {
            Ok(()) => {
                self.pending.push_transaction(tx);
                true
            }
            Err(reason) => {
                debug!(%reason, "transaction not admitted");
                false
            }
        }
    }

    /// Links the pending block to the tip as block `index`, sets `nonce` and
    /// reports whether the resulting hash meets `target`.
    pub fn attempt_mine(&mut self, index: u64, nonce: u64, target: &Target) -> (bool, &Block) {
        let previous_hash = self.tip().hash();
        self.pending.link(index, previous_hash);
        self.pending.set_nonce(nonce);
        (target.is_met_by(&self.pending.hash()), &self.pending)
    }

    /// Checks a broadcast block against this ledger. The hash is recomputed
    /// from the block's fields; the carried hash is never trusted.
    pub fn check_block(&self, block: &Block, target: &Target) -> Result<(), BlockRejected> {
        let computed = block.compute_hash();
        if computed != block.hash() {
            return Err(BlockRejected::HashMismatch {
                carried: to_hex(&block.hash()),
                computed: to_hex(&computed),
            });
        }
        if !target.is_met_by(&computed) {
            return Err(BlockRejected::InsufficientWork(to_hex(&computed)));
        }
        let tip_hash = self.tip().hash();
        if block.previous_hash() != tip_hash {
            return Err(BlockRejected::BrokenLink {
                expected: to_hex(&tip_hash),
                found: to_hex(&block.previous_hash()),
            });
        }
        Ok(())
    }

    pub fn validate(&self, block: &Block, target: &Target) -> bool {
        self.check_block(block, target).is_ok()
    }

    /// Appends a copy of `block` and starts a new, empty pending block on top.
    pub fn commit(&mut self, block: &Block) {
        self.committed.push(block.clone());
        self.pending = Self::fresh_pending(self.tip(), &self.clock);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pow::{self, Target};

    const TS: u64 = 1_600_000_000;

    fn easy() -> Target {
        Target::from_leading_zero_bits(8)
    }

    /// Genesis followed by one mined block per grant.
    fn funded(grants: &[Transaction]) -> Ledger {
        let clock = Clock::Fixed(TS);
        let mut blocks = vec![Block::genesis(TS)];
        for tx in grants {
            let prev = &blocks[blocks.len() - 1];
            let block = Block::new(prev.index() + 1, prev.hash(), TS, vec![tx.clone()]);
            blocks.push(pow::mine_block(block, &easy()));
        }
        Ledger::from_blocks(blocks, clock)
    }

    fn mine_pending(ledger: &mut Ledger, target: &Target) -> Block {
        let index = ledger.next_index();
        let mut nonce = 0u64;
        loop {
            let (found, block) = ledger.attempt_mine(index, nonce, target);
            if found {
                return block.clone();
            }
            nonce += 1;
        }
    }

    #[test]
    fn new_ledger_starts_at_genesis() {
        let ledger = Ledger::new(Clock::Fixed(TS));
        assert_eq!(ledger.committed().len(), 1);
        assert_eq!(ledger.tip().index(), 0);
        assert_eq!(ledger.pending().index(), 1);
        assert_eq!(ledger.pending().previous_hash(), ledger.tip().hash());
        assert!(ledger.pending().transactions().is_empty());
    }

    #[test]
    fn balance_counts_credits_and_debits() {
        let ledger = funded(&[
            Transaction::new("grahm", "alice", 100),
            Transaction::new("alice", "bob", 30),
        ]);
        assert_eq!(ledger.balance_of("alice"), 70);
        assert_eq!(ledger.balance_of("bob"), 30);
        assert_eq!(ledger.balance_of("grahm"), -100);
        assert_eq!(ledger.balance_of("nobody"), 0);
    }

    #[test]
    fn balance_skips_genesis() {
        let genesis = Block::new(0, crate::ZERO_HASH, TS, vec![Transaction::new("x", "alice", 500)]);
        let ledger = Ledger::from_blocks(vec![genesis], Clock::Fixed(TS));
        assert_eq!(ledger.balance_of("alice"), 0);
    }

    #[test]
    fn admit_appends_when_covered() {
        let mut ledger = funded(&[Transaction::new("grahm", "alice", 100)]);
        assert!(ledger.admit(Transaction::new("alice", "bob", 100)));
        assert_eq!(ledger.pending().transactions().len(), 1);
        assert_eq!(
            ledger.pending().merkle_root(),
            crate::merkle_root(ledger.pending().transactions())
        );
        assert!(ledger.pending().is_sealed());
    }

    #[test]
    fn admit_rejects_overdraft_and_leaves_pending_alone() {
        let mut ledger = funded(&[Transaction::new("grahm", "alice", 100)]);
        let before = ledger.pending().clone();
        assert!(!ledger.admit(Transaction::new("alice", "bob", 101)));
        assert_eq!(ledger.pending(), &before);
        assert_eq!(
            ledger.check_admission(&Transaction::new("alice", "bob", 101)),
            Err(AdmissionRejected::InsufficientFunds {
                from: "alice".into(),
                available: 100,
                requested: 101,
            })
        );
    }

    #[test]
    fn admission_ignores_pending_transactions() {
        let mut ledger = funded(&[Transaction::new("grahm", "alice", 100)]);
        assert!(ledger.admit(Transaction::new("alice", "bob", 80)));
        // the pending debit is not counted yet
        assert!(ledger.admit(Transaction::new("alice", "charlie", 80)));
        assert!(!ledger.admit(Transaction::new("bob", "charlie", 1)));
    }

    #[test]
    fn admit_rejects_reserved_ids() {
        let mut ledger = funded(&[Transaction::new("grahm", "a|b", 100)]);
        let before = ledger.pending().clone();
        // both would render as a|b|c|1
        assert!(!ledger.admit(Transaction::new("a|b", "c", 1)));
        assert!(!ledger.admit(Transaction::new("a", "b|c", 1)));
        assert!(!ledger.admit(Transaction::new("a", "b;c", 0)));
        assert_eq!(ledger.pending(), &before);
        assert_eq!(
            ledger.check_admission(&Transaction::new("a", "b|c", 1)),
            Err(AdmissionRejected::InvalidUserId("b|c".into()))
        );
    }

    #[test]
    fn next_index_is_chain_height() {
        let mut ledger = funded(&[Transaction::new("grahm", "alice", 100)]);
        assert_eq!(ledger.next_index(), 2);
        assert_eq!(ledger.pending().index(), ledger.next_index());
        let block = mine_pending(&mut ledger, &easy());
        ledger.commit(&block);
        assert_eq!(ledger.next_index(), 3);
    }

    #[test]
    fn attempt_mine_links_to_tip() {
        let mut ledger = funded(&[Transaction::new("grahm", "alice", 100)]);
        let tip = ledger.tip().hash();
        let (_, block) = ledger.attempt_mine(9, 3, &easy());
        assert_eq!(block.index(), 9);
        assert_eq!(block.nonce(), 3);
        assert_eq!(block.previous_hash(), tip);
        assert!(block.is_sealed());
    }

    #[test]
    fn attempt_mine_success_matches_target() {
        let mut ledger = funded(&[]);
        let target = easy();
        for nonce in 0..64 {
            let (found, block) = ledger.attempt_mine(1, nonce, &target);
            assert_eq!(found, target.is_met_by(&block.compute_hash()));
        }
        let (found, _) = ledger.attempt_mine(1, 0, &Target::from_bytes([0xFF; 32]));
        assert!(found);
        let (found, _) = ledger.attempt_mine(1, 0, &Target::from_bytes([0; 32]));
        assert!(!found);
    }

    #[test]
    fn validate_and_commit_mined_block() {
        let mut ledger = funded(&[Transaction::new("grahm", "alice", 100)]);
        assert!(ledger.admit(Transaction::new("alice", "bob", 10)));
        let block = mine_pending(&mut ledger, &easy());
        assert!(ledger.validate(&block, &easy()));
        ledger.commit(&block);
        assert_eq!(ledger.committed().len(), 3);
        assert_eq!(ledger.tip(), &block);
        assert_eq!(ledger.balance_of("bob"), 10);
        assert!(ledger.pending().transactions().is_empty());
        assert_eq!(ledger.pending().previous_hash(), block.hash());
        // the same block no longer extends the tip
        assert!(matches!(
            ledger.check_block(&block, &easy()),
            Err(BlockRejected::BrokenLink { .. })
        ));
    }

    #[test]
    fn validate_rejects_weak_block() {
        let ledger = funded(&[]);
        let block = Block::new(1, ledger.tip().hash(), TS, Vec::new());
        assert!(matches!(
            ledger.check_block(&block, &Target::from_bytes([0; 32])),
            Err(BlockRejected::InsufficientWork(_))
        ));
    }

    #[test]
    fn validate_recomputes_hash() {
        let mut ledger = funded(&[]);
        let block = mine_pending(&mut ledger, &easy());
        let mut json = serde_json::to_value(&block).unwrap();
        json["header"]["nonce"] = serde_json::json!(block.nonce() + 1);
        let forged: Block = serde_json::from_value(json).unwrap();
        assert!(matches!(
            ledger.check_block(&forged, &easy()),
            Err(BlockRejected::HashMismatch { .. })
        ));
    }

    #[test]
    fn committed_copy_is_independent() {
        let mut ledger = funded(&[]);
        let mut block = mine_pending(&mut ledger, &easy());
        ledger.commit(&block);
        block.set_nonce(block.nonce() + 1);
        assert_ne!(ledger.tip().hash(), block.hash());
        assert!(ledger.tip().is_sealed());
    }
}
