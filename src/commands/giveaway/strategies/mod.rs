pub mod base;
pub mod random;

pub use crate::commands::giveaway::strategies::base::{Selection, SelectionStrategy};
pub use crate::commands::giveaway::strategies::random::RandomSelectStrategy;
