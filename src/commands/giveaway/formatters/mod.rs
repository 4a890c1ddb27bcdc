pub mod base;
pub mod giveaway;

pub use crate::commands::giveaway::formatters::base::{Announcement, FinalResult, GiveawayFormatter};
pub use crate::commands::giveaway::formatters::giveaway::DefaultGiveawayFormatter;
