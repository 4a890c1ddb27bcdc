use serenity::model::id::RoleId;

use crate::commands::giveaway::models::{Giveaway, Winner};
use crate::commands::giveaway::token::EntryToken;

// What the announcement shows. Rendered before the message exists, so it
// doesn't depend on the stored record.
#[derive(Debug, Clone, Copy)]
pub struct Announcement<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub requirements: Option<&'a str>,
    pub required_role_id: Option<RoleId>,
    pub min_invites: Option<u64>,
    pub winner_count: u32,
    pub end_time_epoch_ms: i64,
    pub entry_token: &'a EntryToken,
}

impl<'a> From<&'a Giveaway> for Announcement<'a> {
    fn from(giveaway: &'a Giveaway) -> Self {
        Announcement {
            id: &giveaway.id,
            title: &giveaway.title,
            description: &giveaway.description,
            requirements: giveaway.requirements.as_deref(),
            required_role_id: giveaway.required_role_id,
            min_invites: giveaway.min_invites,
            winner_count: giveaway.winner_count,
            end_time_epoch_ms: giveaway.end_time_epoch_ms,
            entry_token: &giveaway.entry_token,
        }
    }
}

// The final state of a giveaway, as shown to users.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FinalResult<'a> {
    Winners(&'a [Winner]),
    NoEligibleParticipants,
    NoParticipants,
}

pub trait GiveawayFormatter {
    // The announcement message users react to while the giveaway is open.
    fn announcement(&self, announcement: Announcement<'_>) -> String;
    // Replaces the announcement once the giveaway is over.
    fn ended(&self, giveaway: &Giveaway, result: FinalResult<'_>) -> String;
    // A separate message in the channel with the outcome.
    fn results(&self, giveaway: &Giveaway, result: FinalResult<'_>) -> String;
    // Private message for each winner.
    fn winner_notice(&self, giveaway: &Giveaway) -> String;
    // Private message for users whose entry was revoked.
    fn entry_denied(&self, giveaway: &Giveaway, reason: &str) -> String;
    // Sent to the channel when the announcement message can't be found.
    fn message_lost(&self, giveaway: &Giveaway) -> String;
    // Sent to the channel when the reactions can't be read.
    fn entries_unavailable(&self, giveaway: &Giveaway) -> String;
    // One-line summary used in listings.
    fn summary(&self, giveaway: &Giveaway) -> String;
}
