// In-memory chat platform used by the engine tests
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId, MessageId, RoleId, UserId};
use uuid::Uuid;

use crate::commands::giveaway::messaging::{
    FetchedMessage, GuildMember, InviteUsage, MessageRef, Messenger, Reactor,
};
use crate::commands::giveaway::models::{Giveaway, GiveawayUpdate};
use crate::commands::giveaway::storage::GiveawayStore;
use crate::commands::giveaway::token::EntryToken;
use crate::error::{Error, Result};

#[derive(Default)]
struct FakeState {
    missing_guilds: HashSet<GuildId>,
    missing_channels: HashSet<ChannelId>,
    missing_messages: HashSet<MessageId>,
    exploding_messages: HashSet<MessageId>,
    broken_reactors: bool,
    broken_sends: bool,
    reactions: HashMap<MessageId, Vec<EntryToken>>,
    reactors: HashMap<MessageId, Vec<Reactor>>,
    members: HashMap<UserId, GuildMember>,
    invites: Option<Vec<InviteUsage>>,
    invite_fetches: usize,
    closed_dms: HashSet<UserId>,
    next_message_id: u64,
    sent: Vec<(ChannelId, String)>,
    edits: Vec<(MessageId, String)>,
    deleted: Vec<MessageId>,
    reacted: Vec<(MessageId, EntryToken)>,
    removed: Vec<(MessageId, UserId)>,
    directs: Vec<(UserId, String)>,
}

pub struct FakeMessenger {
    state: Mutex<FakeState>,
}

impl FakeMessenger {
    pub fn new() -> Self {
        let state = FakeState {
            invites: Some(Vec::new()),
            next_message_id: 1_000,
            ..FakeState::default()
        };
        FakeMessenger {
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn add_member(&self, user_id: u64, name: &str, roles: &[u64]) {
        let member = GuildMember {
            user_id: UserId::new(user_id),
            display_name: name.to_string(),
            bot: false,
            roles: roles.iter().map(|role| RoleId::new(*role)).collect(),
        };
        self.state().members.insert(member.user_id, member);
    }

    pub fn add_bot(&self, user_id: u64, name: &str) {
        let member = GuildMember {
            user_id: UserId::new(user_id),
            display_name: name.to_string(),
            bot: true,
            roles: Vec::new(),
        };
        self.state().members.insert(member.user_id, member);
    }

    // Puts the reaction on the message on behalf of the given users. Unknown
    // users are still listed as reactors (e.g. people who left the guild).
    pub fn add_entrants(&self, message_id: u64, token: EntryToken, user_ids: &[u64]) {
        let mut state = self.state();
        let message_id = MessageId::new(message_id);
        let reactors = user_ids
            .iter()
            .map(|id| {
                let user_id = UserId::new(*id);
                match state.members.get(&user_id) {
                    Some(member) => Reactor {
                        user_id,
                        name: member.display_name.clone(),
                        bot: member.bot,
                    },
                    None => Reactor {
                        user_id,
                        name: format!("ghost-{}", id),
                        bot: false,
                    },
                }
            })
            .collect::<Vec<Reactor>>();
        state.reactions.entry(message_id).or_default().push(token);
        state.reactors.insert(message_id, reactors);
    }

    pub fn remove_guild(&self, guild_id: u64) {
        self.state().missing_guilds.insert(GuildId::new(guild_id));
    }

    pub fn remove_channel(&self, channel_id: u64) {
        self.state().missing_channels.insert(ChannelId::new(channel_id));
    }

    pub fn remove_message(&self, message_id: u64) {
        self.state().missing_messages.insert(MessageId::new(message_id));
    }

    // Reading the message panics, like a bug deep inside a termination
    pub fn explode_on(&self, message_id: u64) {
        self.state().exploding_messages.insert(MessageId::new(message_id));
    }

    pub fn break_reactors(&self) {
        self.state().broken_reactors = true;
    }

    pub fn break_sends(&self) {
        self.state().broken_sends = true;
    }

    pub fn close_dms(&self, user_id: u64) {
        self.state().closed_dms.insert(UserId::new(user_id));
    }

    pub fn set_invites(&self, invites: Vec<InviteUsage>) {
        self.state().invites = Some(invites);
    }

    pub fn fail_invites(&self) {
        self.state().invites = None;
    }

    pub fn invite_fetches(&self) -> usize {
        self.state().invite_fetches
    }

    pub fn sent(&self) -> Vec<(ChannelId, String)> {
        self.state().sent.clone()
    }

    pub fn edits(&self) -> Vec<(MessageId, String)> {
        self.state().edits.clone()
    }

    pub fn deleted(&self) -> Vec<MessageId> {
        self.state().deleted.clone()
    }

    pub fn reacted(&self) -> Vec<(MessageId, EntryToken)> {
        self.state().reacted.clone()
    }

    pub fn removed(&self) -> Vec<(MessageId, UserId)> {
        self.state().removed.clone()
    }

    pub fn directs(&self) -> Vec<(UserId, String)> {
        self.state().directs.clone()
    }
}

fn not_found(what: &str) -> Error {
    Error::SerenityError(format!("Unknown {}", what))
}

#[async_trait]
impl Messenger for FakeMessenger {
    async fn resolve_guild(&self, guild_id: GuildId) -> Result<()> {
        match self.state().missing_guilds.contains(&guild_id) {
            true => Err(not_found("Guild")),
            false => Ok(()),
        }
    }

    async fn resolve_channel(&self, channel_id: ChannelId) -> Result<()> {
        match self.state().missing_channels.contains(&channel_id) {
            true => Err(not_found("Channel")),
            false => Ok(()),
        }
    }

    async fn send(&self, channel_id: ChannelId, content: &str) -> Result<MessageRef> {
        let mut state = self.state();
        if state.broken_sends {
            return Err(not_found("Channel"));
        }

        state.next_message_id += 1;
        state.sent.push((channel_id, content.to_string()));
        Ok(MessageRef::new(channel_id, MessageId::new(state.next_message_id)))
    }

    async fn edit(&self, message: MessageRef, content: &str) -> Result<()> {
        let mut state = self.state();
        if state.missing_messages.contains(&message.message_id) {
            return Err(not_found("Message"));
        }

        state.edits.push((message.message_id, content.to_string()));
        Ok(())
    }

    async fn delete(&self, message: MessageRef) -> Result<()> {
        self.state().deleted.push(message.message_id);
        Ok(())
    }

    async fn react(&self, message: MessageRef, token: &EntryToken) -> Result<()> {
        self.state().reacted.push((message.message_id, token.clone()));
        Ok(())
    }

    async fn fetch_message(&self, message: MessageRef) -> Result<FetchedMessage> {
        let exploding = self.state().exploding_messages.contains(&message.message_id);
        if exploding {
            panic!("Message {} exploded", message.message_id);
        }
        // Lets other tasks run in between, like a real HTTP call
        tokio::task::yield_now().await;

        let state = self.state();
        if state.missing_messages.contains(&message.message_id) {
            return Err(not_found("Message"));
        }

        Ok(FetchedMessage {
            reference: message,
            reactions: state
                .reactions
                .get(&message.message_id)
                .cloned()
                .unwrap_or_default(),
        })
    }

    async fn fetch_reactors(
        &self,
        message: MessageRef,
        _token: &EntryToken,
    ) -> Result<Vec<Reactor>> {
        tokio::task::yield_now().await;
        let state = self.state();
        if state.broken_reactors {
            return Err(not_found("Reaction"));
        }

        Ok(state
            .reactors
            .get(&message.message_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn remove_reaction(
        &self,
        message: MessageRef,
        _token: &EntryToken,
        user_id: UserId,
    ) -> Result<()> {
        self.state().removed.push((message.message_id, user_id));
        Ok(())
    }

    async fn send_direct(&self, user_id: UserId, content: &str) -> Result<()> {
        let mut state = self.state();
        if state.closed_dms.contains(&user_id) {
            return Err(Error::SerenityError("Cannot send messages to this user".to_string()));
        }

        state.directs.push((user_id, content.to_string()));
        Ok(())
    }

    async fn fetch_member(&self, _guild_id: GuildId, user_id: UserId) -> Result<GuildMember> {
        self.state()
            .members
            .get(&user_id)
            .cloned()
            .ok_or_else(|| not_found("Member"))
    }

    async fn fetch_invites(&self, _guild_id: GuildId) -> Result<Vec<InviteUsage>> {
        let mut state = self.state();
        state.invite_fetches += 1;
        state.invites.clone().ok_or_else(|| not_found("Invite"))
    }
}

// Store wrapper that can be told to fail every write, to hand out an
// outdated record once or to stop granting leases.
pub struct FlakyStore {
    inner: Arc<dyn GiveawayStore>,
    failing: AtomicBool,
    stale: Mutex<Option<Giveaway>>,
    lease_requests: AtomicUsize,
    leases_left: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<dyn GiveawayStore>) -> Self {
        FlakyStore {
            inner,
            failing: AtomicBool::new(false),
            stale: Mutex::new(None),
            lease_requests: AtomicUsize::new(0),
            leases_left: AtomicUsize::new(usize::MAX),
        }
    }

    pub fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    // The next `get` returns this record instead of the stored one
    pub fn serve_stale(&self, giveaway: Giveaway) {
        *self.stale.lock().unwrap() = Some(giveaway);
    }

    // Grants this many more lease requests and refuses the rest
    pub fn grant_leases(&self, count: usize) {
        self.leases_left.store(count, Ordering::SeqCst);
    }

    pub fn lease_requests(&self) -> usize {
        self.lease_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GiveawayStore for FlakyStore {
    async fn get(&self, id: &str) -> Result<Option<Giveaway>> {
        let stale = self.stale.lock().unwrap().take();
        match stale {
            Some(giveaway) => Ok(Some(giveaway)),
            None => self.inner.get(id).await,
        }
    }

    async fn set(&self, giveaway: &Giveaway) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Storage("SQLite error: database is locked".to_string()));
        }
        self.inner.set(giveaway).await
    }

    async fn update_partial(&self, id: &str, update: &GiveawayUpdate) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Storage("SQLite error: database is locked".to_string()));
        }
        self.inner.update_partial(id, update).await
    }

    async fn scan_active(&self) -> Result<Vec<Giveaway>> {
        self.inner.scan_active().await
    }

    async fn find_active_by_message(
        &self,
        guild_id: GuildId,
        message_id: MessageId,
    ) -> Result<Option<Giveaway>> {
        self.inner.find_active_by_message(guild_id, message_id).await
    }

    async fn list_active_by_guild(&self, guild_id: GuildId) -> Result<Vec<Giveaway>> {
        self.inner.list_active_by_guild(guild_id).await
    }

    async fn try_acquire_lease(
        &self,
        id: &str,
        holder: Uuid,
        now_ms: i64,
        ttl_ms: i64,
    ) -> Result<bool> {
        self.lease_requests.fetch_add(1, Ordering::SeqCst);
        let granted = self
            .leases_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if !granted {
            return Ok(false);
        }
        self.inner.try_acquire_lease(id, holder, now_ms, ttl_ms).await
    }

    async fn release_lease(&self, id: &str, holder: Uuid) -> Result<()> {
        self.inner.release_lease(id, holder).await
    }
}
