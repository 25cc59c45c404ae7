use powsim_core::{MinerSpec, SimulationConfig, Target, Transaction};

/// Three miners with 1, 2 and 3 compute shares. grahm funds alice, bob and
/// charlie with 100 each, then six transfers compete for blocks.
pub fn demo() -> SimulationConfig {
    let miners = vec![
        MinerSpec::new("Arif", 1),
        MinerSpec::new("Akin", 2),
        MinerSpec::new("Nagmat", 3),
    ];
    let predefined = vec![
        Transaction::new("grahm", "alice", 100),
        Transaction::new("grahm", "bob", 100),
        Transaction::new("grahm", "charlie", 100),
    ];
    let transactions = vec![
        Transaction::new("alice", "bob", 10),
        Transaction::new("alice", "charlie", 50),
        Transaction::new("bob", "charlie", 30),
        Transaction::new("charlie", "bob", 76),
        Transaction::new("bob", "alice", 20),
        Transaction::new("charlie", "alice", 30),
    ];
    SimulationConfig::new(miners, predefined, transactions, Target::default())
}
