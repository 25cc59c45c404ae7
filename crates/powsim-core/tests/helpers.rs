#![allow(dead_code)]

use powsim_core::{MinerSpec, SimulationConfig, Target, Transaction};

pub const TS: u64 = 1_600_000_000;

pub fn easy_target() -> Target {
    Target::from_leading_zero_bits(8)
}

/// grahm grants 100 to alice, bob and charlie.
pub fn grants() -> Vec<Transaction> {
    ["alice", "bob", "charlie"]
        .into_iter()
        .map(|user| Transaction::new("grahm", user, 100))
        .collect()
}

pub fn three_miners() -> Vec<MinerSpec> {
    vec![
        MinerSpec::new("Arif", 1),
        MinerSpec::new("Akin", 2),
        MinerSpec::new("Nagmat", 3),
    ]
}

/// Three miners over the grants, fixed clock and seed, easy target.
pub fn scenario(transactions: Vec<Transaction>) -> SimulationConfig {
    SimulationConfig::new(three_miners(), grants(), transactions, easy_target())
        .with_seed(2024)
        .with_timestamp(TS)
}

pub fn demo_transactions() -> Vec<Transaction> {
    vec![
        Transaction::new("alice", "bob", 10),
        Transaction::new("alice", "charlie", 50),
        Transaction::new("bob", "charlie", 30),
        Transaction::new("charlie", "bob", 76),
        Transaction::new("bob", "alice", 20),
        Transaction::new("charlie", "alice", 30),
    ]
}
