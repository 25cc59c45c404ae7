use thiserror::Error;

/// Problems with the inputs a simulation is built from.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("roster is empty: at least one miner is required")]
    EmptyRoster,

    #[error("duplicate miner identity: {0}")]
    DuplicateMiner(String),

    #[error("miner {0} has zero compute weight")]
    ZeroWeight(String),

    #[error("invalid user id {0:?}: '|' and ';' are reserved")]
    InvalidUserId(String),

    #[error("invalid difficulty target: {0}")]
    InvalidTarget(String),

    #[error("failed to read scenario: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse scenario: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why a ledger refused a transaction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdmissionRejected {
    #[error("{from} holds {available} but tried to send {requested}")]
    InsufficientFunds {
        from: String,
        available: i128,
        requested: u64,
    },

    #[error("invalid user id {0:?}: '|' and ';' are reserved")]
    InvalidUserId(String),
}

/// Why a ledger refused a broadcast block.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockRejected {
    #[error("carried hash {carried} does not match recomputed hash {computed}")]
    HashMismatch { carried: String, computed: String },

    #[error("hash {0} does not meet the difficulty target")]
    InsufficientWork(String),

    #[error("previous hash {found} does not extend tip {expected}")]
    BrokenLink { expected: String, found: String },
}
