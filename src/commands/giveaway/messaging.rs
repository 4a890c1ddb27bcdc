pub mod discord;

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId, MessageId, RoleId, UserId};

use crate::commands::giveaway::token::EntryToken;
use crate::error::Result;

pub use crate::commands::giveaway::messaging::discord::DiscordMessenger;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct MessageRef {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

impl MessageRef {
    pub fn new(channel_id: ChannelId, message_id: MessageId) -> Self {
        MessageRef {
            channel_id,
            message_id,
        }
    }
}

// The announcement message together with the reactions put on it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FetchedMessage {
    pub reference: MessageRef,
    pub reactions: Vec<EntryToken>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Reactor {
    pub user_id: UserId,
    pub name: String,
    pub bot: bool,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct GuildMember {
    pub user_id: UserId,
    pub display_name: String,
    pub bot: bool,
    pub roles: Vec<RoleId>,
}

impl GuildMember {
    pub fn has_role(&self, role_id: RoleId) -> bool {
        self.roles.contains(&role_id)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct InviteUsage {
    pub inviter_id: Option<UserId>,
    pub uses: u64,
}

// Everything the giveaway engine needs from the chat platform. Every call is
// allowed to fail independently; callers decide how to degrade.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn resolve_guild(&self, guild_id: GuildId) -> Result<()>;

    async fn resolve_channel(&self, channel_id: ChannelId) -> Result<()>;

    async fn send(&self, channel_id: ChannelId, content: &str) -> Result<MessageRef>;

    async fn edit(&self, message: MessageRef, content: &str) -> Result<()>;

    async fn delete(&self, message: MessageRef) -> Result<()>;

    async fn react(&self, message: MessageRef, token: &EntryToken) -> Result<()>;

    async fn fetch_message(&self, message: MessageRef) -> Result<FetchedMessage>;

    // Returns every user that reacted with the token, following pagination.
    async fn fetch_reactors(&self, message: MessageRef, token: &EntryToken)
    -> Result<Vec<Reactor>>;

    async fn remove_reaction(
        &self,
        message: MessageRef,
        token: &EntryToken,
        user_id: UserId,
    ) -> Result<()>;

    async fn send_direct(&self, user_id: UserId, content: &str) -> Result<()>;

    async fn fetch_member(&self, guild_id: GuildId, user_id: UserId) -> Result<GuildMember>;

    async fn fetch_invites(&self, guild_id: GuildId) -> Result<Vec<InviteUsage>>;
}
