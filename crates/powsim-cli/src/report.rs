use anyhow::Result;
use powsim_core::{BlockRecord, Outcome, Simulation, SimulationReport};
use serde::Serialize;
use std::fmt;

#[derive(Serialize)]
struct MinerChain<'a> {
    identity: &'a str,
    compute_weight: u32,
    chain: Vec<BlockRecord>,
}

#[derive(Serialize)]
struct RunDump<'a> {
    #[serde(flatten)]
    report: &'a SimulationReport,
    miners: Vec<MinerChain<'a>>,
}

pub fn to_json(sim: &Simulation, report: &SimulationReport) -> Result<String> {
    let miners = sim
        .roster()
        .iter()
        .map(|m| MinerChain {
            identity: m.identity(),
            compute_weight: m.compute_weight(),
            chain: m.chain_report(),
        })
        .collect();
    Ok(serde_json::to_string_pretty(&RunDump { report, miners })?)
}

/// One line per simulated transaction.
struct Outcomes<'a>(&'a SimulationReport);

impl fmt::Display for Outcomes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.0.outcomes {
            write!(f, "[{}] ", outcome.transaction)?;
            match &outcome.outcome {
                Outcome::Discarded { rejected_by } => {
                    writeln!(f, "discarded, rejected by {}", rejected_by.join(", "))?
                }
                Outcome::Mined {
                    winner,
                    index,
                    nonce,
                    accepted_by,
                    rejected_by,
                    ..
                } => {
                    write!(
                        f,
                        "block {index} mined by {winner} at nonce {nonce}; accepted by {}",
                        accepted_by.join(", ")
                    )?;
                    if !rejected_by.is_empty() {
                        write!(f, "; rejected by {}", rejected_by.join(", "))?;
                    }
                    writeln!(f)?
                }
            }
        }
        Ok(())
    }
}

/// Every miner's committed chain in the block log layout.
struct Chains<'a>(&'a Simulation);

impl fmt::Display for Chains<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for miner in self.0.roster() {
            writeln!(f, "\n******** {} ********", miner.identity())?;
            for block in miner.chain_report() {
                let i = block.index;
                let txs: Vec<String> = block.transactions.iter().map(ToString::to_string).collect();
                writeln!(f, " <{i}> timestamp: {}", block.timestamp)?;
                writeln!(f, " <{i}> nonce: {} transactions: [{}]", block.nonce, txs.join(", "))?;
                writeln!(
                    f,
                    " <{i}> merkle root: {}",
                    block.merkle_root.as_deref().unwrap_or("")
                )?;
                writeln!(f, " <{i}> prev_hash: {} hash: {}", block.previous_hash, block.hash)?;
            }
        }
        Ok(())
    }
}

pub fn outcomes(report: &SimulationReport) -> String {
    Outcomes(report).to_string()
}

pub fn chains(sim: &Simulation) -> String {
    Chains(sim).to_string()
}
