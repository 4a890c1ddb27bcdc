use std::sync::Arc;

pub mod eligibility;
pub mod formatters;
pub mod gatekeeper;
pub mod handlers;
pub mod manager;
pub mod messaging;
pub mod models;
pub mod parser;
pub mod storage;
pub mod strategies;
pub mod sweeper;
pub mod terminator;
pub mod token;

#[cfg(test)]
pub mod testing;

use crate::commands::giveaway::formatters::GiveawayFormatter;
use crate::commands::giveaway::messaging::Messenger;
use crate::commands::giveaway::storage::GiveawayStore;
use crate::commands::giveaway::strategies::SelectionStrategy;

// Handles shared between the command handlers, the gatekeeper and the sweeper
pub type SharedStore = Arc<dyn GiveawayStore>;
pub type SharedMessenger = Arc<dyn Messenger>;
pub type SharedFormatter = Arc<Box<dyn GiveawayFormatter + Send + Sync>>;
pub type SharedStrategy = Arc<Box<dyn SelectionStrategy>>;

pub use crate::commands::giveaway::handlers::{
    // Giveaway management
    giveaway,
    create_giveaway,
    end_giveaway,
    list_giveaways,
};
