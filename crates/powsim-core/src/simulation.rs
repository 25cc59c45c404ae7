//! The multi-miner consensus loop.
//!
//! Every simulated transaction goes through admission on every ledger, a
//! mining race over the weighted schedule, and a broadcast in which each
//! miner independently validates and commits the winning block.
use crate::config::SimulationConfig;
use crate::error::ConfigError;
use crate::mine::{self, RaceMode, Schedule};
use crate::pow::{self, Target};
use crate::{to_hex, Block, Clock, Ledger, Miner, Transaction};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionMode {
    /// Every ledger admits in turn and nothing is rolled back when another
    /// ledger refuses, so pending blocks may diverge.
    #[default]
    Optimistic,
    /// Every ledger is checked first; the transaction is applied only if all agree.
    TwoPhase,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Seeding,
    Admitting,
    Mining,
    Broadcasting,
    Done,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// At least one ledger refused the transaction.
    Discarded { rejected_by: Vec<String> },
    Mined {
        winner: String,
        index: u64,
        nonce: u64,
        hash: String,
        accepted_by: Vec<String>,
        rejected_by: Vec<String>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransactionOutcome {
    pub transaction: Transaction,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl TransactionOutcome {
    pub fn is_mined(&self) -> bool {
        matches!(self.outcome, Outcome::Mined { .. })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SimulationReport {
    /// Seed the schedule was shuffled with; feed it back to replay the run.
    pub seed: u64,
    pub outcomes: Vec<TransactionOutcome>,
}

impl SimulationReport {
    pub fn mined(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_mined()).count()
    }

    pub fn discarded(&self) -> usize {
        self.outcomes.len() - self.mined()
    }
}

pub struct Simulation {
    roster: Vec<Miner>,
    schedule: Schedule,
    target: Target,
    admission: AdmissionMode,
    race: RaceMode,
    predefined: Vec<Transaction>,
    transactions: Vec<Transaction>,
    clock: Clock,
    seed: u64,
    phase: Phase,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let clock = config.clock();
        let seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());
        let weights: Vec<u32> = config.miners.iter().map(|m| m.compute_weight).collect();
        let schedule = Schedule::weighted(&weights, seed);
        let roster: Vec<Miner> = config
            .miners
            .iter()
            .map(|spec| Miner::new(spec.identity.clone(), spec.compute_weight, Ledger::new(clock)))
            .collect();

        info!(
            miners = roster.len(),
            slots = schedule.len(),
            seed,
            target = %config.target,
            "simulation configured"
        );

        Ok(Self {
            roster,
            schedule,
            target: config.target,
            admission: config.admission,
            race: config.race,
            predefined: config.predefined,
            transactions: config.transactions,
            clock,
            seed,
            phase: Phase::Seeding,
        })
    }

    pub fn roster(&self) -> &[Miner] {
        &self.roster
    }

    pub fn miner(&self, identity: &str) -> Option<&Miner> {
        self.roster.iter().find(|m| m.identity() == identity)
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Mines the predefined chain once and hands every miner its own copy.
    pub fn seed_ledgers(&mut self) {
        let chain = predefined_chain(&self.predefined, &self.target, &self.clock);
        for miner in self.roster.iter_mut() {
            miner.adopt(Ledger::from_blocks(chain.clone(), self.clock));
        }
        self.phase = Phase::Admitting;
        info!(blocks = chain.len(), "seeded every miner with the predefined chain");
    }

    /// Seeds if needed, then feeds every configured transaction through
    /// [`Simulation::process`].
    pub fn run(&mut self) -> SimulationReport {
        if self.phase == Phase::Seeding {
            self.seed_ledgers();
        }
        let transactions = std::mem::take(&mut self.transactions);
        let outcomes = transactions.iter().map(|tx| self.process(tx)).collect();
        self.phase = Phase::Done;
        info!("simulation done");
        SimulationReport {
            seed: self.seed,
            outcomes,
        }
    }

    /// Admission, race and broadcast for a single transaction.
    pub fn process(&mut self, tx: &Transaction) -> TransactionOutcome {
        if self.phase == Phase::Seeding {
            self.seed_ledgers();
        }
        info!(%tx, "transaction received");

        self.phase = Phase::Admitting;
        let rejected_by = self.admit_everywhere(tx);
        if !rejected_by.is_empty() {
            info!(%tx, ?rejected_by, "transaction discarded");
            return TransactionOutcome {
                transaction: tx.clone(),
                outcome: Outcome::Discarded { rejected_by },
            };
        }

        self.phase = Phase::Mining;
        let win = mine::race(self.race, &mut self.roster, &self.schedule, &self.target);
        let candidate = self.roster[win.miner].ledger().pending().clone();
        let winner = self.roster[win.miner].identity().to_string();

        self.phase = Phase::Broadcasting;
        let (accepted_by, rejected_by) = self.broadcast(&candidate);
        self.phase = Phase::Admitting;

        TransactionOutcome {
            transaction: tx.clone(),
            outcome: Outcome::Mined {
                winner,
                index: candidate.index(),
                nonce: win.nonce,
                hash: to_hex(&candidate.hash()),
                accepted_by,
                rejected_by,
            },
        }
    }

    /// Returns the identities that refused `tx`; empty means system-wide acceptance.
    fn admit_everywhere(&mut self, tx: &Transaction) -> Vec<String> {
        match self.admission {
            AdmissionMode::Optimistic => {
                let mut rejected = Vec::new();
                // no short-circuit: every ledger gets to mutate its pending block
                for miner in self.roster.iter_mut() {
                    let admitted = miner.admit(tx);
                    debug!(miner = miner.identity(), admitted, "admission verdict");
                    if !admitted {
                        rejected.push(miner.identity().to_string());
                    }
                }
                rejected
            }
            AdmissionMode::TwoPhase => {
                let rejected: Vec<String> = self
                    .roster
                    .iter()
                    .filter_map(|miner| match miner.check_admission(tx) {
                        Ok(()) => None,
                        Err(reason) => {
                            debug!(miner = miner.identity(), %reason, "admission refused");
                            Some(miner.identity().to_string())
                        }
                    })
                    .collect();
                if rejected.is_empty() {
                    for miner in self.roster.iter_mut() {
                        let admitted = miner.admit(tx);
                        debug_assert!(admitted, "checked transaction must be admitted");
                    }
                }
                rejected
            }
        }
    }

    /// Every miner validates `candidate` against its own tip and commits it
    /// if valid. Returns `(accepted_by, rejected_by)`.
    pub fn broadcast(&mut self, candidate: &Block) -> (Vec<String>, Vec<String>) {
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();
        for miner in self.roster.iter_mut() {
            match miner.check_block(candidate, &self.target) {
                Ok(()) => {
                    miner.commit(candidate);
                    debug!(miner = miner.identity(), index = candidate.index(), "block committed");
                    accepted.push(miner.identity().to_string());
                }
                Err(reason) => {
                    warn!(miner = miner.identity(), %reason, "block rejected");
                    rejected.push(miner.identity().to_string());
                }
            }
        }
        (accepted, rejected)
    }
}

/// Genesis plus one block per predefined transaction, each chained to the
/// previous one and solved serially at `target`.
pub fn predefined_chain(predefined: &[Transaction], target: &Target, clock: &Clock) -> Vec<Block> {
    let mut chain = vec![Block::genesis(clock.now())];
    for tx in predefined {
        let tip = &chain[chain.len() - 1];
        let block = Block::new(tip.index() + 1, tip.hash(), clock.now(), vec![tx.clone()]);
        let block = pow::mine_block(block, target);
        debug!(index = block.index(), nonce = block.nonce(), "predefined block solved");
        chain.push(block);
    }
    chain
}
