use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serenity::model::id::GuildId;
use tracing::{info, warn};

use crate::commands::giveaway::formatters::{Announcement, DefaultGiveawayFormatter};
use crate::commands::giveaway::gatekeeper::{EntryDecision, EntrySignal, Gatekeeper};
use crate::commands::giveaway::messaging::MessageRef;
use crate::commands::giveaway::models::{Giveaway, NewGiveaway};
use crate::commands::giveaway::parser::parse_duration_ms;
use crate::commands::giveaway::strategies::RandomSelectStrategy;
use crate::commands::giveaway::sweeper::Sweeper;
use crate::commands::giveaway::terminator::{TerminationOutcome, Terminator};
use crate::commands::giveaway::token::EntryToken;
use crate::commands::giveaway::{SharedFormatter, SharedMessenger, SharedStore, SharedStrategy};
use crate::error::{Error, Result};
use crate::settings::Settings;

// Entry point for everything users can do with giveaways. Keeps no state of
// its own: every operation goes through the store.
#[non_exhaustive]
pub struct GiveawayManager {
    store: SharedStore,
    messenger: SharedMessenger,
    formatter: SharedFormatter,
    terminator: Terminator,
    gatekeeper: Gatekeeper,
    sweep_interval: Duration,
    default_entry_emoji: String,
}

impl GiveawayManager {
    pub fn new(store: SharedStore, messenger: SharedMessenger, settings: &Settings) -> Self {
        let strategy = match settings.selection_seed {
            Some(seed) => {
                info!("Winners are drawn with the fixed seed {}", seed);
                RandomSelectStrategy::with_seed(seed)
            }
            None => RandomSelectStrategy::new(),
        };
        let strategy: SharedStrategy = Arc::new(Box::new(strategy));
        GiveawayManager::with_strategy(store, messenger, strategy, settings)
    }

    pub fn with_strategy(
        store: SharedStore,
        messenger: SharedMessenger,
        strategy: SharedStrategy,
        settings: &Settings,
    ) -> Self {
        let formatter: SharedFormatter = Arc::new(Box::new(DefaultGiveawayFormatter::new()));
        let terminator = Terminator::new(
            store.clone(),
            messenger.clone(),
            formatter.clone(),
            strategy,
            settings.lease_ttl(),
        );
        let gatekeeper = Gatekeeper::new(store.clone(), messenger.clone(), formatter.clone());

        GiveawayManager {
            store,
            messenger,
            formatter,
            terminator,
            gatekeeper,
            sweep_interval: settings.sweep_interval(),
            default_entry_emoji: settings.default_entry_emoji.clone(),
        }
    }

    pub fn formatter(&self) -> &SharedFormatter {
        &self.formatter
    }

    pub fn sweeper(&self) -> Sweeper {
        Sweeper::new(self.store.clone(), self.terminator.clone(), self.sweep_interval)
    }

    // Announces a new giveaway in the channel and stores it. Nothing is
    // announced when the input is invalid, and nothing stays announced when
    // the record can't be written.
    pub async fn create_giveaway(&self, request: NewGiveaway) -> Result<Giveaway> {
        let duration_ms = parse_duration_ms(&request.duration)?;
        let duration_ms = i64::try_from(duration_ms).map_err(|_| too_long(&request.duration))?;

        if request.winner_count < 1 {
            let message = format!("A giveaway needs at least one winner.");
            return Err(Error::Giveaway(message));
        }
        let title = request.title.trim();
        if title.is_empty() {
            let message = format!("A giveaway needs a title.");
            return Err(Error::Giveaway(message));
        }

        let entry_emoji = request
            .entry_token
            .as_deref()
            .unwrap_or(self.default_entry_emoji.as_str());
        let entry_token = EntryToken::parse(entry_emoji).ok_or_else(|| {
            let message = format!("Can't use `{}` as the entry emoji.", entry_emoji);
            Error::Giveaway(message)
        })?;

        let created_at = Utc::now();
        let end_time_epoch_ms = created_at
            .timestamp_millis()
            .checked_add(duration_ms)
            .ok_or_else(|| too_long(&request.duration))?;
        let id = Giveaway::generate_id(request.guild_id, created_at);
        let requirements = request
            .requirements
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty());

        let content = self.formatter.announcement(Announcement {
            id: &id,
            title,
            description: request.description.trim(),
            requirements,
            required_role_id: request.required_role_id,
            min_invites: request.min_invites,
            winner_count: request.winner_count,
            end_time_epoch_ms,
            entry_token: &entry_token,
        });
        let announcement = self.messenger.send(request.channel_id, &content).await?;
        if let Err(err) = self.messenger.react(announcement, &entry_token).await {
            warn!("Can't add the entry reaction to giveaway {}: {}", id, err);
        }

        let giveaway = Giveaway {
            id,
            guild_id: request.guild_id,
            channel_id: request.channel_id,
            message_id: announcement.message_id,
            title: title.to_string(),
            description: request.description.trim().to_string(),
            requirements: requirements.map(str::to_string),
            entry_token,
            winner_count: request.winner_count,
            required_role_id: request.required_role_id,
            min_invites: request.min_invites,
            end_time_epoch_ms,
            created_by: request.created_by,
            created_at,
            active: true,
            winners: Vec::new(),
            ended_at: None,
        };

        if let Err(err) = self.store.set(&giveaway).await {
            warn!("Can't store giveaway {}: {}", giveaway.id, err);
            self.withdraw(&giveaway, announcement).await;
            return Err(err);
        }

        info!(
            "Giveaway {} created by {} in channel {}",
            giveaway.id, giveaway.created_by, giveaway.channel_id
        );
        Ok(giveaway)
    }

    // Ends the giveaway right away, the same way as when its time is up.
    // Giveaways of other guilds are treated as missing.
    pub async fn end_giveaway(&self, guild_id: GuildId, id: &str) -> Result<TerminationOutcome> {
        let giveaway = match self.store.get(id).await? {
            Some(giveaway) if giveaway.guild_id == guild_id => giveaway,
            _ => {
                let message = format!("The requested giveaway was not found.");
                return Err(Error::Giveaway(message));
            }
        };

        if !giveaway.active {
            let message = format!("This giveaway has already ended.");
            return Err(Error::Giveaway(message));
        }

        info!("Ending giveaway {} on request", giveaway.id);
        self.terminator.terminate(&giveaway.id).await
    }

    pub async fn list_giveaways(&self, guild_id: GuildId) -> Result<Vec<Giveaway>> {
        self.store.list_active_by_guild(guild_id).await
    }

    pub async fn handle_entry(&self, signal: &EntrySignal) -> Result<EntryDecision> {
        self.gatekeeper.handle_entry(signal).await
    }

    async fn withdraw(&self, giveaway: &Giveaway, announcement: MessageRef) {
        if let Err(err) = self.messenger.delete(announcement).await {
            warn!(
                "Can't delete the announcement of unsaved giveaway {}: {}",
                giveaway.id, err
            );
        }
    }
}

fn too_long(duration: &str) -> Error {
    Error::InvalidDuration(format!("The `{}` duration is too long.", duration))
}
