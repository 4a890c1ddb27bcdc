use poise::CreateReply;
use poise::serenity_prelude::{GuildId, Role};
use tracing::info;

use crate::commands::context::Context;
use crate::commands::giveaway::formatters::GiveawayFormatter;
use crate::commands::giveaway::models::{Giveaway, NewGiveaway};
use crate::commands::giveaway::terminator::{Degradation, TerminationOutcome};
use crate::error::{Error, Result};

/// Manage giveaways of this server
#[poise::command(
    slash_command,
    guild_only,
    subcommands("create_giveaway", "end_giveaway", "list_giveaways"),
    subcommand_required
)]
pub async fn giveaway(_: Context<'_>) -> Result<()> {
    Ok(())
}

/// Start a new giveaway in this channel
#[poise::command(slash_command, guild_only, rename = "create")]
pub async fn create_giveaway(
    ctx: Context<'_>,
    #[description = "What is given away"] title: String,
    #[description = "Details about the prize"] description: String,
    #[description = "How long entries are accepted, e.g. 30m, 12h or 2d"] duration: String,
    #[description = "Number of winners (1 by default)"]
    #[min = 1]
    winners: Option<u32>,
    #[description = "Emoji to react with for entering"] emoji: Option<String>,
    #[description = "Free-form requirements shown to participants"] requirements: Option<String>,
    #[description = "Role every winner must have"] role: Option<Role>,
    #[description = "Minimum number of invites every winner must have made"] min_invites: Option<u64>,
) -> Result<()> {
    let guild_id = current_guild(&ctx)?;
    ctx.defer_ephemeral().await?;

    let request = NewGiveaway {
        guild_id,
        channel_id: ctx.channel_id(),
        created_by: ctx.author().id,
        title,
        description,
        duration,
        entry_token: emoji,
        winner_count: winners.unwrap_or(1),
        requirements,
        required_role_id: role.map(|role| role.id),
        min_invites,
    };
    let giveaway = ctx.data().manager.create_giveaway(request).await?;

    let content = format!("Giveaway `{}` has started!", giveaway.id);
    ctx.send(CreateReply::default().content(content).ephemeral(true))
        .await?;
    Ok(())
}

/// End a giveaway right now and pick the winners
#[poise::command(slash_command, guild_only, rename = "end")]
pub async fn end_giveaway(
    ctx: Context<'_>,
    #[description = "Giveaway ID, as shown in the announcement"] id: String,
) -> Result<()> {
    let guild_id = current_guild(&ctx)?;
    info!("User '{}' ends giveaway {}", ctx.author().name, id);
    ctx.defer_ephemeral().await?;

    let id = id.trim();
    let outcome = ctx.data().manager.end_giveaway(guild_id, id).await?;

    let content = describe_outcome(id, &outcome);
    ctx.send(CreateReply::default().content(content).ephemeral(true))
        .await?;
    Ok(())
}

/// Get a list of active giveaways
#[poise::command(slash_command, guild_only, rename = "list")]
pub async fn list_giveaways(ctx: Context<'_>) -> Result<()> {
    let guild_id = current_guild(&ctx)?;

    let manager = &ctx.data().manager;
    let giveaways = manager.list_giveaways(guild_id).await?;
    let content = render_listing(&***manager.formatter(), &giveaways);

    ctx.send(CreateReply::default().content(content).ephemeral(true))
        .await?;
    Ok(())
}

fn current_guild(ctx: &Context<'_>) -> Result<GuildId> {
    ctx.guild_id().ok_or_else(|| {
        let message = "Giveaways are available only in servers.".to_string();
        Error::Giveaway(message)
    })
}

fn render_listing(formatter: &dyn GiveawayFormatter, giveaways: &[Giveaway]) -> String {
    let lines = giveaways
        .iter()
        .enumerate()
        .map(|(index, giveaway)| format!("{}. {}", index + 1, formatter.summary(giveaway)))
        .collect::<Vec<String>>();

    match lines.len() {
        0 => "There are no active giveaways.".to_string(),
        _ => lines.join("\n"),
    }
}

fn describe_outcome(id: &str, outcome: &TerminationOutcome) -> String {
    match outcome {
        TerminationOutcome::Completed(winners) => {
            format!("Giveaway `{}` has ended with {} winner(s).", id, winners.len())
        }
        TerminationOutcome::NoParticipants => {
            format!("Giveaway `{}` has ended with no participants.", id)
        }
        TerminationOutcome::NoEligibleParticipants => {
            format!("Giveaway `{}` has ended, but nobody was eligible.", id)
        }
        TerminationOutcome::Degraded(degradation) => {
            let cause = match degradation {
                Degradation::GuildUnavailable => "the server is unavailable",
                Degradation::ChannelUnavailable => "its channel is unavailable",
                Degradation::MessageLost => "its message was deleted",
                Degradation::EntriesUnavailable => "its entries couldn't be read",
            };
            format!("Giveaway `{}` has ended without winners: {}.", id, cause)
        }
        TerminationOutcome::InProgress => {
            format!("Giveaway `{}` is being ended right now.", id)
        }
        TerminationOutcome::AlreadyEnded => "This giveaway has already ended.".to_string(),
        TerminationOutcome::Missing => "The requested giveaway was not found.".to_string(),
    }
}
