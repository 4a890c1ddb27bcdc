use std::sync::Arc;

use async_trait::async_trait;
use serenity::builder::{CreateMessage, EditMessage};
use serenity::http::Http;
use serenity::model::channel::ReactionType;
use serenity::model::guild::Member;
use serenity::model::id::{ChannelId, GuildId, UserId};
use serenity::model::user::User as DiscordUser;
use tracing::debug;

use crate::commands::giveaway::messaging::{
    FetchedMessage, GuildMember, InviteUsage, MessageRef, Messenger, Reactor,
};
use crate::commands::giveaway::token::EntryToken;
use crate::error::Result;

// Discord returns at most 100 reactors per request
const REACTORS_PAGE_SIZE: u8 = 100;

pub struct DiscordMessenger {
    http: Arc<Http>,
}

impl DiscordMessenger {
    pub fn new(http: Arc<Http>) -> Self {
        DiscordMessenger { http }
    }
}

impl From<DiscordUser> for Reactor {
    fn from(user: DiscordUser) -> Self {
        Reactor {
            user_id: user.id,
            name: user.global_name.clone().unwrap_or_else(|| user.name.clone()),
            bot: user.bot,
        }
    }
}

impl From<Member> for GuildMember {
    fn from(member: Member) -> Self {
        let display_name = member
            .nick
            .clone()
            .or_else(|| member.user.global_name.clone())
            .unwrap_or_else(|| member.user.name.clone());

        GuildMember {
            user_id: member.user.id,
            display_name,
            bot: member.user.bot,
            roles: member.roles,
        }
    }
}

#[async_trait]
impl Messenger for DiscordMessenger {
    async fn resolve_guild(&self, guild_id: GuildId) -> Result<()> {
        guild_id.to_partial_guild(&*self.http).await?;
        Ok(())
    }

    async fn resolve_channel(&self, channel_id: ChannelId) -> Result<()> {
        channel_id.to_channel(&*self.http).await?;
        Ok(())
    }

    async fn send(&self, channel_id: ChannelId, content: &str) -> Result<MessageRef> {
        let message = channel_id.say(&*self.http, content).await?;
        Ok(MessageRef::new(message.channel_id, message.id))
    }

    async fn edit(&self, message: MessageRef, content: &str) -> Result<()> {
        message
            .channel_id
            .edit_message(
                &*self.http,
                message.message_id,
                EditMessage::new().content(content),
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, message: MessageRef) -> Result<()> {
        message
            .channel_id
            .delete_message(&*self.http, message.message_id)
            .await?;
        Ok(())
    }

    async fn react(&self, message: MessageRef, token: &EntryToken) -> Result<()> {
        message
            .channel_id
            .create_reaction(&*self.http, message.message_id, ReactionType::from(token))
            .await?;
        Ok(())
    }

    async fn fetch_message(&self, message: MessageRef) -> Result<FetchedMessage> {
        let fetched = message
            .channel_id
            .message(&*self.http, message.message_id)
            .await?;
        let reactions = fetched
            .reactions
            .iter()
            .map(|reaction| EntryToken::from(&reaction.reaction_type))
            .collect::<Vec<EntryToken>>();

        Ok(FetchedMessage {
            reference: message,
            reactions,
        })
    }

    async fn fetch_reactors(
        &self,
        message: MessageRef,
        token: &EntryToken,
    ) -> Result<Vec<Reactor>> {
        let reaction_type = ReactionType::from(token);
        let mut reactors = Vec::new();
        let mut after: Option<UserId> = None;

        loop {
            let page = message
                .channel_id
                .reaction_users(
                    &*self.http,
                    message.message_id,
                    reaction_type.clone(),
                    Some(REACTORS_PAGE_SIZE),
                    after,
                )
                .await?;
            let page_len = page.len();
            after = page.last().map(|user| user.id);
            reactors.extend(page.into_iter().map(Reactor::from));

            if page_len < REACTORS_PAGE_SIZE as usize {
                break;
            }
        }

        debug!(
            "Fetched {} reactors for message {}",
            reactors.len(),
            message.message_id
        );
        Ok(reactors)
    }

    async fn remove_reaction(
        &self,
        message: MessageRef,
        token: &EntryToken,
        user_id: UserId,
    ) -> Result<()> {
        message
            .channel_id
            .delete_reaction(
                &*self.http,
                message.message_id,
                Some(user_id),
                ReactionType::from(token),
            )
            .await?;
        Ok(())
    }

    async fn send_direct(&self, user_id: UserId, content: &str) -> Result<()> {
        user_id
            .direct_message(&*self.http, CreateMessage::new().content(content))
            .await?;
        Ok(())
    }

    async fn fetch_member(&self, guild_id: GuildId, user_id: UserId) -> Result<GuildMember> {
        let member = guild_id.member(&*self.http, user_id).await?;
        Ok(GuildMember::from(member))
    }

    async fn fetch_invites(&self, guild_id: GuildId) -> Result<Vec<InviteUsage>> {
        let invites = guild_id
            .invites(&*self.http)
            .await?
            .into_iter()
            .map(|invite| InviteUsage {
                inviter_id: invite.inviter.as_ref().map(|user| user.id),
                uses: invite.uses,
            })
            .collect::<Vec<InviteUsage>>();
        Ok(invites)
    }
}
