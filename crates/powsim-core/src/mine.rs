use crate::pow::{count_leading_zero_bits, Target};
use crate::{to_hex, Block, Miner};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceMode {
    /// Miners take turns in schedule order on one thread.
    #[default]
    RoundRobin,
    /// The same nonce-to-miner assignment searched across rayon workers.
    Parallel,
}

/// Turn order of the mining race: every roster index repeated by its
/// compute weight, shuffled once with a seeded RNG.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schedule {
    slots: Vec<usize>,
}

impl Schedule {
    pub fn weighted(weights: &[u32], seed: u64) -> Self {
        let mut slots: Vec<usize> = weights
            .iter()
            .enumerate()
            .flat_map(|(miner, &weight)| std::iter::repeat(miner).take(weight as usize))
            .collect();
        let mut rng = StdRng::seed_from_u64(seed);
        slots.shuffle(&mut rng);
        Self { slots }
    }

    pub fn slots(&self) -> &[usize] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The roster index that tries `nonce` in a race starting at nonce 0.
    pub fn miner_for(&self, nonce: u64) -> usize {
        self.slots[(nonce % self.slots.len() as u64) as usize]
    }

    pub fn turns_of(&self, miner: usize) -> usize {
        self.slots.iter().filter(|&&slot| slot == miner).count()
    }
}

/// Winner of one race: roster index and the winning nonce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RaceWin {
    pub miner: usize,
    pub nonce: u64,
}

/// Runs a race over `miners`. Each miner mines on top of its own tip, so the
/// block index is that miner's chain height. On return the winner's pending
/// block is sealed with the winning nonce.
///
/// `schedule` must be non-empty and only reference indices into `miners`.
pub fn race(mode: RaceMode, miners: &mut [Miner], schedule: &Schedule, target: &Target) -> RaceWin {
    let win = match mode {
        RaceMode::RoundRobin => race_round_robin(miners, schedule, target),
        RaceMode::Parallel => race_parallel(miners, schedule, target),
    };
    let pending = miners[win.miner].ledger().pending();
    info!(
        "{} mined block {} with nonce {} and hash {} ({} leading zero bits)",
        miners[win.miner].identity(),
        pending.index(),
        win.nonce,
        to_hex(&pending.hash()),
        count_leading_zero_bits(&pending.hash())
    );
    win
}

/// One shared nonce, bumped after every miss; scheduled miners take turns
/// cyclically until one of them hits.
pub fn race_round_robin(miners: &mut [Miner], schedule: &Schedule, target: &Target) -> RaceWin {
    debug_assert!(!schedule.is_empty(), "race needs at least one scheduled miner");
    let mut nonce = 0u64;
    loop {
        for &slot in schedule.slots() {
            let index = miners[slot].next_index();
            let (found, _) = miners[slot].attempt_mine(index, nonce, target);
            if found {
                return RaceWin { miner: slot, nonce };
            }
            nonce = nonce.wrapping_add(1);
        }
    }
}

/// Splits the nonce space across rayon workers. Nonce `n` is tried against
/// the template of `schedule.miner_for(n)`, the same pairing the round-robin
/// race uses, but the first worker to hit wins and the rest are cancelled.
pub fn race_parallel(miners: &mut [Miner], schedule: &Schedule, target: &Target) -> RaceWin {
    debug_assert!(!schedule.is_empty(), "race needs at least one scheduled miner");
    // Link every pending block to its tip; templates only vary by nonce from here.
    let templates: Vec<Block> = miners
        .iter_mut()
        .map(|miner| {
            let index = miner.next_index();
            miner.attempt_mine(index, 0, target).1.clone()
        })
        .collect();

    let found = (0u64..u64::MAX).into_par_iter().find_any(|nonce| {
        let template = &templates[schedule.miner_for(*nonce)];
        target.is_met_by(&template.hash_with_nonce(*nonce))
    });

    let Some(nonce) = found else {
        debug!("parallel search exhausted, continuing round robin");
        return race_round_robin(miners, schedule, target);
    };

    let miner = schedule.miner_for(nonce);
    let index = miners[miner].next_index();
    let (sealed, _) = miners[miner].attempt_mine(index, nonce, target);
    debug_assert!(sealed, "winning nonce must reproduce on the winner's ledger");
    RaceWin { miner, nonce }
}
