use serenity::model::id::{ChannelId, GuildId, MessageId, UserId};
use tracing::{debug, info, warn};

use crate::commands::giveaway::eligibility::EligibilityEvaluator;
use crate::commands::giveaway::messaging::MessageRef;
use crate::commands::giveaway::token::EntryToken;
use crate::commands::giveaway::{SharedFormatter, SharedMessenger, SharedStore};
use crate::error::Result;

// A user reacted on some message in a guild.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EntrySignal {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub user_id: UserId,
    pub token: EntryToken,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum EntryDecision {
    // Not an entry to any open giveaway
    Ignored,
    Accepted,
    // The reaction was revoked, with the reason sent to the user
    Rejected(String),
}

// Real-time advice for entrants. The reaction itself is the entry, so an
// accepted entry needs no further action; the authoritative check happens
// again when the giveaway ends.
#[derive(Clone)]
pub struct Gatekeeper {
    store: SharedStore,
    messenger: SharedMessenger,
    formatter: SharedFormatter,
}

impl Gatekeeper {
    pub fn new(store: SharedStore, messenger: SharedMessenger, formatter: SharedFormatter) -> Self {
        Gatekeeper {
            store,
            messenger,
            formatter,
        }
    }

    pub async fn handle_entry(&self, signal: &EntrySignal) -> Result<EntryDecision> {
        let giveaway = match self
            .store
            .find_active_by_message(signal.guild_id, signal.message_id)
            .await?
        {
            Some(giveaway) => giveaway,
            None => return Ok(EntryDecision::Ignored),
        };

        if !giveaway.entry_token.matches(&signal.token) {
            debug!(
                "Reaction {} on giveaway {} isn't the entry token",
                signal.token, giveaway.id
            );
            return Ok(EntryDecision::Ignored);
        }

        let member = match self
            .messenger
            .fetch_member(signal.guild_id, signal.user_id)
            .await
        {
            Ok(member) => member,
            Err(err) => {
                warn!(
                    "Can't resolve member {} for giveaway {}: {}",
                    signal.user_id, giveaway.id, err
                );
                return Ok(EntryDecision::Ignored);
            }
        };

        if member.bot {
            debug!("Ignoring a bot reaction on giveaway {}", giveaway.id);
            return Ok(EntryDecision::Ignored);
        }

        let evaluator = EligibilityEvaluator::new(self.messenger.as_ref(), giveaway.guild_id);
        let verdict = evaluator.evaluate(&giveaway, &member).await;
        if verdict.eligible {
            info!("User {} entered giveaway {}", member.user_id, giveaway.id);
            return Ok(EntryDecision::Accepted);
        }

        info!(
            "Revoking entry of user {} to giveaway {}: {}",
            member.user_id, giveaway.id, verdict.reason
        );
        let announcement = MessageRef::new(giveaway.channel_id, giveaway.message_id);
        if let Err(err) = self
            .messenger
            .remove_reaction(announcement, &signal.token, member.user_id)
            .await
        {
            warn!(
                "Can't remove the reaction of user {} on giveaway {}: {}",
                member.user_id, giveaway.id, err
            );
        }

        let notice = self.formatter.entry_denied(&giveaway, &verdict.reason);
        if let Err(err) = self.messenger.send_direct(member.user_id, &notice).await {
            warn!(
                "Can't notify user {} about the denied entry: {}",
                member.user_id, err
            );
        }

        Ok(EntryDecision::Rejected(verdict.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serenity::model::id::{ChannelId, GuildId, MessageId, RoleId, UserId};

    use crate::commands::giveaway::formatters::DefaultGiveawayFormatter;
    use crate::commands::giveaway::gatekeeper::{EntryDecision, EntrySignal, Gatekeeper};
    use crate::commands::giveaway::models::fixtures::{CHANNEL, GUILD, giveaway};
    use crate::commands::giveaway::models::GiveawayUpdate;
    use crate::commands::giveaway::storage::{GiveawayStore, MemoryGiveawayStore};
    use crate::commands::giveaway::testing::FakeMessenger;
    use crate::commands::giveaway::token::EntryToken;

    fn signal(message_id: u64, user_id: u64, token: &str) -> EntrySignal {
        EntrySignal {
            guild_id: GuildId::new(GUILD),
            channel_id: ChannelId::new(CHANNEL),
            message_id: MessageId::new(message_id),
            user_id: UserId::new(user_id),
            token: EntryToken::Unicode(token.to_string()),
        }
    }

    async fn setup() -> (Gatekeeper, Arc<MemoryGiveawayStore>, Arc<FakeMessenger>) {
        let store = Arc::new(MemoryGiveawayStore::new());
        let messenger = Arc::new(FakeMessenger::new());
        let mut record = giveaway("g1", 100, i64::MAX);
        record.required_role_id = Some(RoleId::new(5));
        store.set(&record).await.unwrap();

        let gatekeeper = Gatekeeper::new(
            store.clone(),
            messenger.clone(),
            Arc::new(Box::new(DefaultGiveawayFormatter::new())),
        );
        (gatekeeper, store, messenger)
    }

    #[tokio::test]
    async fn test_eligible_entry_is_accepted_silently() {
        let (gatekeeper, _, messenger) = setup().await;
        messenger.add_member(7, "Alice", &[5]);

        let decision = gatekeeper.handle_entry(&signal(100, 7, "🎉")).await.unwrap();
        assert_eq!(decision, EntryDecision::Accepted);
        assert_eq!(messenger.removed().is_empty(), true);
        assert_eq!(messenger.directs().is_empty(), true);
    }

    #[tokio::test]
    async fn test_ineligible_entry_is_revoked_and_notified() {
        let (gatekeeper, _, messenger) = setup().await;
        messenger.add_member(8, "Bob", &[]);

        let decision = gatekeeper.handle_entry(&signal(100, 8, "🎉")).await.unwrap();
        let reason = "You need the <@&5> role to enter the \"Test giveaway\" giveaway.";
        assert_eq!(decision, EntryDecision::Rejected(reason.to_string()));
        assert_eq!(
            messenger.removed(),
            vec![(MessageId::new(100), UserId::new(8))]
        );

        let directs = messenger.directs();
        assert_eq!(directs.len(), 1);
        assert_eq!(directs[0].0, UserId::new(8));
        assert!(directs[0].1.contains(reason));
    }

    #[tokio::test]
    async fn test_closed_dms_dont_break_the_revocation() {
        let (gatekeeper, _, messenger) = setup().await;
        messenger.add_member(8, "Bob", &[]);
        messenger.close_dms(8);

        let decision = gatekeeper.handle_entry(&signal(100, 8, "🎉")).await.unwrap();
        assert!(matches!(decision, EntryDecision::Rejected(_)));
        assert_eq!(messenger.removed().len(), 1);
    }

    #[tokio::test]
    async fn test_unrelated_message_is_ignored() {
        let (gatekeeper, _, messenger) = setup().await;
        messenger.add_member(8, "Bob", &[]);

        let decision = gatekeeper.handle_entry(&signal(999, 8, "🎉")).await.unwrap();
        assert_eq!(decision, EntryDecision::Ignored);
        assert_eq!(messenger.removed().is_empty(), true);
    }

    #[tokio::test]
    async fn test_other_emoji_is_ignored() {
        let (gatekeeper, _, messenger) = setup().await;
        messenger.add_member(8, "Bob", &[]);

        let decision = gatekeeper.handle_entry(&signal(100, 8, "👍")).await.unwrap();
        assert_eq!(decision, EntryDecision::Ignored);
    }

    #[tokio::test]
    async fn test_bot_reaction_is_ignored() {
        let (gatekeeper, _, messenger) = setup().await;
        messenger.add_bot(9, "Helper");

        let decision = gatekeeper.handle_entry(&signal(100, 9, "🎉")).await.unwrap();
        assert_eq!(decision, EntryDecision::Ignored);
        assert_eq!(messenger.removed().is_empty(), true);
    }

    #[tokio::test]
    async fn test_ended_giveaway_is_ignored() {
        let (gatekeeper, store, messenger) = setup().await;
        messenger.add_member(8, "Bob", &[]);
        store
            .update_partial("g1", &GiveawayUpdate::close(chrono::Utc::now()))
            .await
            .unwrap();

        let decision = gatekeeper.handle_entry(&signal(100, 8, "🎉")).await.unwrap();
        assert_eq!(decision, EntryDecision::Ignored);
    }

    #[tokio::test]
    async fn test_unknown_member_is_ignored() {
        let (gatekeeper, _, messenger) = setup().await;

        let decision = gatekeeper.handle_entry(&signal(100, 42, "🎉")).await.unwrap();
        assert_eq!(decision, EntryDecision::Ignored);
        assert_eq!(messenger.removed().is_empty(), true);
    }
}
