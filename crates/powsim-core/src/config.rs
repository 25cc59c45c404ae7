//! Simulation inputs, loadable from a JSON scenario file.
use crate::error::ConfigError;
use crate::mine::RaceMode;
use crate::pow::Target;
use crate::simulation::AdmissionMode;
use crate::{Clock, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinerSpec {
    pub identity: String,
    #[serde(default = "default_weight")]
    pub compute_weight: u32,
}

fn default_weight() -> u32 {
    1
}

impl MinerSpec {
    pub fn new(identity: impl Into<String>, compute_weight: u32) -> Self {
        Self {
            identity: identity.into(),
            compute_weight,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Distinct miners, in roster order.
    pub miners: Vec<MinerSpec>,
    /// Mined into the shared prefix before the race begins.
    pub predefined: Vec<Transaction>,
    /// Fed one by one through admission, race and broadcast.
    pub transactions: Vec<Transaction>,
    pub target: Target,
    /// Seed for the schedule permutation; drawn at random when absent.
    pub seed: Option<u64>,
    pub admission: AdmissionMode,
    pub race: RaceMode,
    /// Pins every block timestamp; the system clock is used when absent.
    pub timestamp: Option<u64>,
}

impl SimulationConfig {
    pub fn new(
        miners: Vec<MinerSpec>,
        predefined: Vec<Transaction>,
        transactions: Vec<Transaction>,
        target: Target,
    ) -> Self {
        Self {
            miners,
            predefined,
            transactions,
            target,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_admission(mut self, admission: AdmissionMode) -> Self {
        self.admission = admission;
        self
    }

    pub fn with_race(mut self, race: RaceMode) -> Self {
        self.race = race;
        self
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn clock(&self) -> Clock {
        self.timestamp.map_or(Clock::System, Clock::Fixed)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.miners.is_empty() {
            return Err(ConfigError::EmptyRoster);
        }
        let mut seen = HashSet::new();
        for miner in &self.miners {
            if !seen.insert(miner.identity.as_str()) {
                return Err(ConfigError::DuplicateMiner(miner.identity.clone()));
            }
            if miner.compute_weight == 0 {
                return Err(ConfigError::ZeroWeight(miner.identity.clone()));
            }
        }
        self.predefined
            .iter()
            .chain(&self.transactions)
            .try_for_each(Transaction::validate)
    }
}
