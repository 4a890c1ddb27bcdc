use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng, thread_rng};

use crate::commands::giveaway::models::Participant;
use crate::commands::giveaway::strategies::base::{Selection, SelectionStrategy};

// Uniform sampling without replacement: every draw picks an index over the
// participants that are still left in the pool.
#[derive(Debug)]
pub struct RandomSelectStrategy {
    seeded: Option<Mutex<StdRng>>,
}

impl RandomSelectStrategy {
    pub fn new() -> Self {
        RandomSelectStrategy { seeded: None }
    }

    // Reproducible draws, for replaying a giveaway with a known seed.
    pub fn with_seed(seed: u64) -> Self {
        RandomSelectStrategy {
            seeded: Some(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }
}

impl Default for RandomSelectStrategy {
    fn default() -> Self {
        RandomSelectStrategy::new()
    }
}

fn draw<R: Rng + ?Sized>(
    rng: &mut R,
    mut pool: Vec<Participant>,
    winner_count: usize,
) -> Vec<Participant> {
    let effective_count = winner_count.min(pool.len());
    let mut winners = Vec::with_capacity(effective_count);
    for _ in 0..effective_count {
        let index = rng.gen_range(0..pool.len());
        winners.push(pool.swap_remove(index));
    }
    winners
}

impl SelectionStrategy for RandomSelectStrategy {
    fn select(&self, pool: Vec<Participant>, winner_count: usize) -> Selection {
        if pool.is_empty() {
            return Selection::NoEligibleParticipants;
        }

        let winners = match &self.seeded {
            Some(rng) => match rng.lock() {
                Ok(mut guard) => draw(&mut *guard, pool, winner_count),
                Err(poisoned) => draw(&mut *poisoned.into_inner(), pool, winner_count),
            },
            None => draw(&mut thread_rng(), pool, winner_count),
        };
        Selection::Winners(winners)
    }
}
