use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serenity::model::id::{GuildId, MessageId};
use uuid::Uuid;

use crate::commands::giveaway::models::{Giveaway, GiveawayUpdate};
use crate::commands::giveaway::storage::{GiveawayStore, Lease, sort_by_end_time};
use crate::error::{Error, Result};

// Keeps giveaways in the process memory. Nothing survives a restart, so it is
// meant for tests and throwaway runs.
#[derive(Debug, Default)]
pub struct MemoryGiveawayStore {
    giveaways: DashMap<String, Giveaway>,
    // (guild, announcement message) -> giveaway id
    message_index: DashMap<(GuildId, MessageId), String>,
    leases: DashMap<String, Lease>,
}

impl MemoryGiveawayStore {
    pub fn new() -> Self {
        MemoryGiveawayStore::default()
    }
}

#[async_trait]
impl GiveawayStore for MemoryGiveawayStore {
    async fn get(&self, id: &str) -> Result<Option<Giveaway>> {
        Ok(self.giveaways.get(id).map(|pair| pair.value().clone()))
    }

    async fn set(&self, giveaway: &Giveaway) -> Result<()> {
        match self.giveaways.entry(giveaway.id.clone()) {
            Entry::Occupied(mut entry) => {
                if !entry.get().active && giveaway.active {
                    let message = format!("The giveaway {} can't be re-activated.", giveaway.id);
                    return Err(Error::Storage(message));
                }
                entry.insert(giveaway.clone());
            }
            Entry::Vacant(entry) => {
                entry.insert(giveaway.clone());
            }
        }

        self.message_index.insert(
            (giveaway.guild_id, giveaway.message_id),
            giveaway.id.clone(),
        );
        Ok(())
    }

    async fn update_partial(&self, id: &str, update: &GiveawayUpdate) -> Result<()> {
        match self.giveaways.get_mut(id) {
            Some(mut record) => record.apply(update),
            None => Err(Error::Storage(format!("The giveaway {} doesn't exist.", id))),
        }
    }

    async fn scan_active(&self) -> Result<Vec<Giveaway>> {
        let giveaways = self
            .giveaways
            .iter()
            .filter(|pair| pair.value().active)
            .map(|pair| pair.value().clone())
            .collect::<Vec<Giveaway>>();
        Ok(giveaways)
    }

    async fn find_active_by_message(
        &self,
        guild_id: GuildId,
        message_id: MessageId,
    ) -> Result<Option<Giveaway>> {
        let id = match self.message_index.get(&(guild_id, message_id)) {
            Some(pair) => pair.value().clone(),
            None => return Ok(None),
        };

        Ok(self
            .giveaways
            .get(&id)
            .filter(|pair| pair.value().active)
            .map(|pair| pair.value().clone()))
    }

    async fn list_active_by_guild(&self, guild_id: GuildId) -> Result<Vec<Giveaway>> {
        let mut giveaways = self
            .giveaways
            .iter()
            .filter(|pair| pair.value().active && pair.value().guild_id == guild_id)
            .map(|pair| pair.value().clone())
            .collect::<Vec<Giveaway>>();
        sort_by_end_time(&mut giveaways);
        Ok(giveaways)
    }

    async fn try_acquire_lease(
        &self,
        id: &str,
        holder: Uuid,
        now_ms: i64,
        ttl_ms: i64,
    ) -> Result<bool> {
        if !self.giveaways.contains_key(id) {
            return Ok(false);
        }

        let lease = Lease {
            holder,
            expires_at_ms: now_ms.saturating_add(ttl_ms),
        };
        match self.leases.entry(id.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().is_live(now_ms) && entry.get().holder != holder {
                    return Ok(false);
                }
                entry.insert(lease);
            }
            Entry::Vacant(entry) => {
                entry.insert(lease);
            }
        }
        Ok(true)
    }

    async fn release_lease(&self, id: &str, holder: Uuid) -> Result<()> {
        self.leases.remove_if(id, |_, lease| lease.holder == holder);
        Ok(())
    }
}
