use crate::commands::giveaway::models::Participant;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Selection {
    // Picked winners, in the order of drawing
    Winners(Vec<Participant>),
    // Nobody passed the eligibility checks
    NoEligibleParticipants,
}

impl Selection {
    pub fn winners(&self) -> &[Participant] {
        match self {
            Selection::Winners(winners) => winners,
            Selection::NoEligibleParticipants => &[],
        }
    }
}

pub trait SelectionStrategy: Send + Sync {
    // Picks up to `winner_count` distinct winners out of the eligible pool.
    fn select(&self, pool: Vec<Participant>, winner_count: usize) -> Selection;
}
