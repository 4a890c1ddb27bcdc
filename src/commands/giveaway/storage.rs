pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use serenity::model::id::{GuildId, MessageId};
use uuid::Uuid;

use crate::commands::giveaway::models::{Giveaway, GiveawayUpdate};
use crate::error::Result;

pub use crate::commands::giveaway::storage::memory::MemoryGiveawayStore;
pub use crate::commands::giveaway::storage::sqlite::SqliteGiveawayStore;

// A short-lived claim on running the termination of a giveaway.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Lease {
    pub holder: Uuid,
    pub expires_at_ms: i64,
}

impl Lease {
    // Checks whether the lease still blocks other holders.
    pub fn is_live(&self, now_ms: i64) -> bool {
        self.expires_at_ms > now_ms
    }
}

// Durable source of truth for giveaway records. No other component keeps
// giveaway state for longer than a single operation.
#[async_trait]
pub trait GiveawayStore: Send + Sync {
    // Returns the record by its identifier.
    async fn get(&self, id: &str) -> Result<Option<Giveaway>>;

    // Writes the whole record. Refuses to overwrite an ended giveaway with
    // an active one.
    async fn set(&self, giveaway: &Giveaway) -> Result<()>;

    // Changes the given fields of an active record. Ended records are frozen.
    async fn update_partial(&self, id: &str, update: &GiveawayUpdate) -> Result<()>;

    // Returns every giveaway that is still accepting entries.
    async fn scan_active(&self) -> Result<Vec<Giveaway>>;

    // Indexed lookup of the active giveaway announced by the message.
    async fn find_active_by_message(
        &self,
        guild_id: GuildId,
        message_id: MessageId,
    ) -> Result<Option<Giveaway>>;

    // Active giveaways of the guild, ordered by the end time.
    async fn list_active_by_guild(&self, guild_id: GuildId) -> Result<Vec<Giveaway>>;

    // Conditional write: takes the lease when nobody holds a live one.
    async fn try_acquire_lease(&self, id: &str, holder: Uuid, now_ms: i64, ttl_ms: i64)
    -> Result<bool>;

    // Drops the lease if it still belongs to the holder.
    async fn release_lease(&self, id: &str, holder: Uuid) -> Result<()>;
}

pub(crate) fn sort_by_end_time(giveaways: &mut [Giveaway]) {
    giveaways.sort_by(|left, right| {
        left.end_time_epoch_ms
            .cmp(&right.end_time_epoch_ms)
            .then_with(|| left.id.cmp(&right.id))
    });
}
