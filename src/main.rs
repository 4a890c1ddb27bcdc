pub mod commands;
pub mod error;
pub mod settings;
pub mod storage;

use std::sync::Arc;

use poise::serenity_prelude::GatewayIntents;
use serenity::async_trait;
use serenity::client::{Client, Context, EventHandler};
use serenity::http::Http;
use serenity::model::channel::Reaction;
use serenity::model::gateway::Ready;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::commands::giveaway::gatekeeper::{EntryDecision, EntrySignal};
use crate::commands::giveaway::manager::GiveawayManager;
use crate::commands::giveaway::messaging::DiscordMessenger;
use crate::commands::giveaway::storage::{MemoryGiveawayStore, SqliteGiveawayStore};
use crate::commands::giveaway::token::EntryToken;
use crate::commands::giveaway::{SharedMessenger, SharedStore};
use crate::commands::{UserData, giveaway};
use crate::error::Error;
use crate::settings::{IN_MEMORY_DATABASE, Settings};
use crate::storage::{BotIdStorage, GiveawayStorage};

pub struct Handler;

#[async_trait]
impl EventHandler for Handler {
    async fn reaction_add(&self, ctx: Context, reaction: Reaction) {
        let (guild_id, user_id) = match (reaction.guild_id, reaction.user_id) {
            (Some(guild_id), Some(user_id)) => (guild_id, user_id),
            _ => return,
        };

        let (bot_id, giveaway_manager) = {
            let data = ctx.data.read().await;
            (
                data.get::<BotIdStorage>().cloned(),
                data.get::<GiveawayStorage>().cloned(),
            )
        };
        if bot_id.is_some_and(|bot_id| *bot_id == user_id) {
            return;
        }
        let giveaway_manager = match giveaway_manager {
            Some(giveaway_manager) => giveaway_manager,
            None => {
                error!("Expected GiveawayManager in ShareMap.");
                return;
            }
        };

        let signal = EntrySignal {
            guild_id,
            channel_id: reaction.channel_id,
            message_id: reaction.message_id,
            user_id,
            token: EntryToken::from(&reaction.emoji),
        };
        match giveaway_manager.handle_entry(&signal).await {
            Ok(EntryDecision::Rejected(reason)) => {
                debug!("Entry of user {} was rejected: {}", user_id, reason)
            }
            Ok(_) => (),
            Err(err) => error!("Can't handle the reaction of user {}: {}", user_id, err),
        }
    }

    async fn ready(&self, _: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);
    }
}

async fn on_error(error: poise::FrameworkError<'_, UserData, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            warn!(
                "Command '{}' by user '{}' failed: {}",
                ctx.command().qualified_name,
                ctx.author().name,
                error
            );
            if let Err(err) = ctx.say(error.to_string()).await {
                error!("Can't reply with the error: {}", err);
            }
        }
        other => {
            if let Err(err) = poise::builtins::on_error(other).await {
                error!("Error while handling an error: {}", err);
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = Settings::load().expect("Cannot load the settings");
    let token = settings
        .discord_token
        .clone()
        .expect("Expected a DISCORD_TOKEN in the environment");

    let store: SharedStore = match settings.database_path.as_str() {
        IN_MEMORY_DATABASE => {
            warn!("Giveaways are kept in memory and will be lost on restart");
            Arc::new(MemoryGiveawayStore::new())
        }
        path => Arc::new(SqliteGiveawayStore::open(path).expect("Cannot open the giveaway database")),
    };
    let http = Arc::new(Http::new(&token));
    let messenger: SharedMessenger = Arc::new(DiscordMessenger::new(http));
    let giveaway_manager = Arc::new(GiveawayManager::new(store, messenger, &settings));

    let user_data_manager = giveaway_manager.clone();
    let framework = poise::Framework::<UserData, Error>::builder()
        .options(poise::FrameworkOptions {
            commands: vec![giveaway()],
            on_error: |error| Box::pin(on_error(error)),
            pre_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Got command '{}' by user '{}'",
                        ctx.command().qualified_name,
                        ctx.author().name
                    );
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(UserData {
                    manager: user_data_manager,
                })
            })
        })
        .build();

    let intents = GatewayIntents::non_privileged() | GatewayIntents::GUILD_MEMBERS;
    let mut client = Client::builder(&token, intents)
        .event_handler(Handler)
        .framework(framework)
        .await
        .expect("Cannot create a Discord client");

    let bot_id = match client.http.get_current_user().await {
        Ok(user) => user.id,
        Err(why) => panic!("Could not access the bot user: {:?}", why),
    };
    {
        let mut data = client.data.write().await;
        data.insert::<GiveawayStorage>(giveaway_manager.clone());
        data.insert::<BotIdStorage>(Arc::new(bot_id));
    }

    tokio::spawn(giveaway_manager.sweeper().run());

    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }
}
