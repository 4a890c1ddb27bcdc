use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serenity::model::id::{ChannelId, GuildId, MessageId, RoleId, UserId};
use uuid::Uuid;

use crate::commands::giveaway::token::EntryToken;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Winner {
    pub id: UserId,
    pub display_name: String,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Giveaway {
    // Unique identifier in a `<guild>-<created ms>-<suffix>` form
    pub id: String,
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    // The announcement message that users react to
    pub message_id: MessageId,
    pub title: String,
    pub description: String,
    // Free-form requirements text, displayed on the announcement
    #[serde(default)]
    pub requirements: Option<String>,
    pub entry_token: EntryToken,
    pub winner_count: u32,
    #[serde(default)]
    pub required_role_id: Option<RoleId>,
    #[serde(default)]
    pub min_invites: Option<u64>,
    // The only signal used for detecting expiration
    pub end_time_epoch_ms: i64,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    // true - entries are open
    // false - terminated, never switched back
    pub active: bool,
    #[serde(default)]
    pub winners: Vec<Winner>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
}

impl Giveaway {
    // Generates a new identifier scoped by the guild and creation time.
    pub fn generate_id(guild_id: GuildId, created_at: DateTime<Utc>) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!(
            "{}-{}-{}",
            guild_id.get(),
            created_at.timestamp_millis(),
            &suffix[..8]
        )
    }

    // Checks that the entry period is over at the given moment.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.end_time_epoch_ms <= now.timestamp_millis()
    }

    // Applies a partial update. Ended giveaways are frozen and nothing is
    // allowed to switch `active` back on.
    pub fn apply(&mut self, update: &GiveawayUpdate) -> Result<()> {
        if !self.active {
            let message = format!("The giveaway {} has already ended.", self.id);
            return Err(Error::Storage(message));
        }
        if update.active == Some(true) {
            let message = format!("The giveaway {} can't be re-activated.", self.id);
            return Err(Error::Storage(message));
        }

        if let Some(active) = update.active {
            self.active = active;
        }
        if let Some(winners) = &update.winners {
            self.winners = winners.clone();
        }
        if let Some(ended_at) = update.ended_at {
            self.ended_at = Some(ended_at);
        }
        Ok(())
    }
}

// A set of fields to change in the stored giveaway record.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct GiveawayUpdate {
    pub active: Option<bool>,
    pub winners: Option<Vec<Winner>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl GiveawayUpdate {
    // Closes the giveaway with no winners at all (used by degraded paths).
    pub fn close(ended_at: DateTime<Utc>) -> Self {
        GiveawayUpdate {
            active: Some(false),
            winners: Some(Vec::new()),
            ended_at: Some(ended_at),
        }
    }

    pub fn with_winners(mut self, winners: Vec<Winner>) -> Self {
        self.winners = Some(winners);
        self
    }
}

// Everything needed for creating a new giveaway, collected from the command.
#[derive(Debug, Clone)]
pub struct NewGiveaway {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub created_by: UserId,
    pub title: String,
    pub description: String,
    pub duration: String,
    pub entry_token: Option<String>,
    pub winner_count: u32,
    pub requirements: Option<String>,
    pub required_role_id: Option<RoleId>,
    pub min_invites: Option<u64>,
}

// A user that reacted on the announcement, with the eligibility verdict.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Participant {
    user_id: UserId,
    display_name: String,
    eligible: bool,
    reason: String,
}

impl Participant {
    pub fn new(user_id: UserId, display_name: &str, eligible: bool, reason: &str) -> Self {
        Participant {
            user_id,
            display_name: display_name.to_string(),
            eligible,
            reason: reason.to_string(),
        }
    }

    // Returns a unique identifier in Discord
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn is_eligible(&self) -> bool {
        self.eligible
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl From<&Participant> for Winner {
    fn from(participant: &Participant) -> Self {
        Winner {
            id: participant.user_id,
            display_name: participant.display_name.clone(),
        }
    }
}
