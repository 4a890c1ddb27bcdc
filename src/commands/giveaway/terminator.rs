use std::collections::HashSet;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serenity::model::id::ChannelId;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::commands::giveaway::eligibility::EligibilityEvaluator;
use crate::commands::giveaway::formatters::FinalResult;
use crate::commands::giveaway::messaging::{MessageRef, Reactor};
use crate::commands::giveaway::models::{Giveaway, GiveawayUpdate, Participant, Winner};
use crate::commands::giveaway::{SharedFormatter, SharedMessenger, SharedStore, SharedStrategy};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Degradation {
    GuildUnavailable,
    ChannelUnavailable,
    MessageLost,
    EntriesUnavailable,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum TerminationOutcome {
    // Nothing to terminate
    Missing,
    AlreadyEnded,
    // Another termination of the same giveaway holds the lease
    InProgress,
    // Closed without winners because something couldn't be resolved
    Degraded(Degradation),
    NoParticipants,
    NoEligibleParticipants,
    Completed(Vec<Winner>),
}

// Claim on one giveaway held by a running termination
struct Lease {
    holder: Uuid,
    renewed_at: Instant,
}

// Closes giveaways. Safe to call any number of times and from any trigger:
// ended giveaways are left untouched and concurrent runs are serialized by a
// lease kept in the store. The terminal state is persisted as the very last
// step, so a crash in the middle leaves the giveaway active and the next
// sweep runs the whole sequence again.
#[derive(Clone)]
pub struct Terminator {
    store: SharedStore,
    messenger: SharedMessenger,
    formatter: SharedFormatter,
    strategy: SharedStrategy,
    lease_ttl: Duration,
}

impl Terminator {
    pub fn new(
        store: SharedStore,
        messenger: SharedMessenger,
        formatter: SharedFormatter,
        strategy: SharedStrategy,
        lease_ttl: Duration,
    ) -> Self {
        Terminator {
            store,
            messenger,
            formatter,
            strategy,
            lease_ttl,
        }
    }

    pub async fn terminate(&self, id: &str) -> Result<TerminationOutcome> {
        match self.store.get(id).await? {
            None => {
                info!("Giveaway {} doesn't exist, nothing to terminate", id);
                return Ok(TerminationOutcome::Missing);
            }
            Some(giveaway) if !giveaway.active => {
                info!("Giveaway {} has already been terminated", id);
                return Ok(TerminationOutcome::AlreadyEnded);
            }
            Some(_) => (),
        }

        let holder = Uuid::new_v4();
        let now_ms = Utc::now().timestamp_millis();
        if !self.store.try_acquire_lease(id, holder, now_ms, self.lease_ttl_ms()).await? {
            info!("Giveaway {} is being terminated by someone else", id);
            return Ok(TerminationOutcome::InProgress);
        }
        let mut lease = Lease {
            holder,
            renewed_at: Instant::now(),
        };

        // The previous holder could have finished between the first read
        // and taking the lease.
        let result = match self.store.get(id).await {
            Ok(Some(giveaway)) if giveaway.active => self.run(giveaway, &mut lease).await,
            Ok(Some(_)) => Ok(TerminationOutcome::AlreadyEnded),
            Ok(None) => Ok(TerminationOutcome::Missing),
            Err(err) => Err(err),
        };

        if let Err(err) = self.store.release_lease(id, holder).await {
            warn!("Can't release the lease of giveaway {}: {}", id, err);
        }
        result
    }

    fn lease_ttl_ms(&self) -> i64 {
        i64::try_from(self.lease_ttl.as_millis()).unwrap_or(i64::MAX)
    }

    // Extends the lease once half of its TTL is gone, so long terminations
    // keep it. Fails when another termination has taken the giveaway over.
    async fn keep_lease(&self, giveaway: &Giveaway, lease: &mut Lease) -> Result<()> {
        if lease.renewed_at.elapsed() < self.lease_ttl / 2 {
            return Ok(());
        }

        let now_ms = Utc::now().timestamp_millis();
        let renewed = self
            .store
            .try_acquire_lease(&giveaway.id, lease.holder, now_ms, self.lease_ttl_ms())
            .await?;
        if !renewed {
            warn!("Lost the lease of giveaway {}", giveaway.id);
            let message = format!("Giveaway {} is being terminated by someone else.", giveaway.id);
            return Err(Error::Giveaway(message));
        }

        debug!("Renewed the lease of giveaway {}", giveaway.id);
        lease.renewed_at = Instant::now();
        Ok(())
    }

    async fn run(&self, giveaway: Giveaway, lease: &mut Lease) -> Result<TerminationOutcome> {
        info!("Terminating giveaway {} ({})", giveaway.id, giveaway.title);

        if let Err(err) = self.messenger.resolve_guild(giveaway.guild_id).await {
            warn!(
                "Guild {} of giveaway {} is unavailable: {}",
                giveaway.guild_id, giveaway.id, err
            );
            return self.close_degraded(&giveaway, Degradation::GuildUnavailable).await;
        }

        if let Err(err) = self.messenger.resolve_channel(giveaway.channel_id).await {
            warn!(
                "Channel {} of giveaway {} is unavailable: {}",
                giveaway.channel_id, giveaway.id, err
            );
            return self.close_degraded(&giveaway, Degradation::ChannelUnavailable).await;
        }

        let announcement = MessageRef::new(giveaway.channel_id, giveaway.message_id);
        let message = match self.messenger.fetch_message(announcement).await {
            Ok(message) => message,
            Err(err) => {
                warn!(
                    "Announcement {} of giveaway {} is lost: {}",
                    giveaway.message_id, giveaway.id, err
                );
                let notice = self.formatter.message_lost(&giveaway);
                self.notify_channel(&giveaway, giveaway.channel_id, &notice).await;
                return self.close_degraded(&giveaway, Degradation::MessageLost).await;
            }
        };

        let token = match message
            .reactions
            .iter()
            .find(|reaction| reaction.matches(&giveaway.entry_token))
        {
            Some(token) => token.clone(),
            None => {
                info!("Giveaway {} has no entry reactions", giveaway.id);
                self.keep_lease(&giveaway, lease).await?;
                return self.finish(&giveaway, message.reference, None).await;
            }
        };

        self.keep_lease(&giveaway, lease).await?;
        let reactors = match self.messenger.fetch_reactors(message.reference, &token).await {
            Ok(reactors) => reactors,
            Err(err) => {
                warn!("Can't read entries of giveaway {}: {}", giveaway.id, err);
                let notice = self.formatter.entries_unavailable(&giveaway);
                self.notify_channel(&giveaway, giveaway.channel_id, &notice).await;
                return self.close_degraded(&giveaway, Degradation::EntriesUnavailable).await;
            }
        };

        let participants = self.collect_participants(&giveaway, reactors, lease).await?;
        self.keep_lease(&giveaway, lease).await?;
        if participants.is_empty() {
            info!("Giveaway {} has no participants", giveaway.id);
            return self.finish(&giveaway, message.reference, None).await;
        }

        let eligible = participants
            .into_iter()
            .filter(|participant| participant.is_eligible())
            .collect::<Vec<Participant>>();
        let selection = self
            .strategy
            .select(eligible, giveaway.winner_count as usize);
        let winners = selection
            .winners()
            .iter()
            .map(Winner::from)
            .collect::<Vec<Winner>>();

        self.finish(&giveaway, message.reference, Some(winners)).await
    }

    // Resolves every human reactor to a guild member and evaluates them from
    // scratch. Reactors that can't be resolved are skipped.
    async fn collect_participants(
        &self,
        giveaway: &Giveaway,
        reactors: Vec<Reactor>,
        lease: &mut Lease,
    ) -> Result<Vec<Participant>> {
        let evaluator = EligibilityEvaluator::new(self.messenger.as_ref(), giveaway.guild_id);
        let mut seen = HashSet::new();
        let mut participants = Vec::new();

        for reactor in reactors.into_iter().filter(|reactor| !reactor.bot) {
            if !seen.insert(reactor.user_id) {
                continue;
            }
            self.keep_lease(giveaway, lease).await?;

            let member = match self
                .messenger
                .fetch_member(giveaway.guild_id, reactor.user_id)
                .await
            {
                Ok(member) => member,
                Err(err) => {
                    debug!(
                        "Skipping reactor {} ({}) of giveaway {}: {}",
                        reactor.user_id, reactor.name, giveaway.id, err
                    );
                    continue;
                }
            };

            let verdict = evaluator.evaluate(giveaway, &member).await;
            let participant = Participant::new(
                member.user_id,
                &member.display_name,
                verdict.eligible,
                &verdict.reason,
            );
            if !participant.is_eligible() {
                debug!(
                    "User {} ({}) isn't eligible for giveaway {}: {}",
                    participant.user_id(),
                    participant.display_name(),
                    giveaway.id,
                    participant.reason()
                );
            }
            participants.push(participant);
        }

        let eligible = participants.iter().filter(|p| p.is_eligible()).count();
        info!(
            "Giveaway {}: {} participants, {} eligible",
            giveaway.id,
            participants.len(),
            eligible
        );
        Ok(participants)
    }

    // Announces the outcome, updates the original message and persists the
    // terminal state. `None` means nobody entered at all.
    async fn finish(
        &self,
        giveaway: &Giveaway,
        announcement: MessageRef,
        winners: Option<Vec<Winner>>,
    ) -> Result<TerminationOutcome> {
        let ended_at = Utc::now();
        let winners_list = winners.clone().unwrap_or_default();
        let result = match &winners {
            None => FinalResult::NoParticipants,
            Some(winners) if winners.is_empty() => FinalResult::NoEligibleParticipants,
            Some(winners) => FinalResult::Winners(winners),
        };

        let mut closed = giveaway.clone();
        closed.active = false;
        closed.ended_at = Some(ended_at);
        closed.winners = winners_list.clone();

        let results = self.formatter.results(&closed, result);
        self.notify_channel(giveaway, giveaway.channel_id, &results).await;

        let notice = self.formatter.winner_notice(&closed);
        for winner in &winners_list {
            if let Err(err) = self.messenger.send_direct(winner.id, &notice).await {
                warn!(
                    "Can't notify winner {} of giveaway {}: {}",
                    winner.id, giveaway.id, err
                );
            }
        }

        let terminal = self.formatter.ended(&closed, result);
        if let Err(err) = self.messenger.edit(announcement, &terminal).await {
            warn!(
                "Can't update the announcement of giveaway {}: {}",
                giveaway.id, err
            );
        }

        let outcome = match result {
            FinalResult::NoParticipants => TerminationOutcome::NoParticipants,
            FinalResult::NoEligibleParticipants => TerminationOutcome::NoEligibleParticipants,
            FinalResult::Winners(_) => TerminationOutcome::Completed(winners_list.clone()),
        };
        self.persist(giveaway, ended_at, winners_list).await?;
        info!("Giveaway {} ended: {:?}", giveaway.id, outcome);
        Ok(outcome)
    }

    async fn close_degraded(
        &self,
        giveaway: &Giveaway,
        degradation: Degradation,
    ) -> Result<TerminationOutcome> {
        self.persist(giveaway, Utc::now(), Vec::new()).await?;
        info!("Giveaway {} closed without winners: {:?}", giveaway.id, degradation);
        Ok(TerminationOutcome::Degraded(degradation))
    }

    async fn persist(
        &self,
        giveaway: &Giveaway,
        ended_at: DateTime<Utc>,
        winners: Vec<Winner>,
    ) -> Result<()> {
        let update = GiveawayUpdate::close(ended_at).with_winners(winners);
        self.store
            .update_partial(&giveaway.id, &update)
            .await
            .inspect_err(|err| {
                warn!(
                    "Can't persist the end of giveaway {}, it will be retried: {}",
                    giveaway.id, err
                )
            })
    }

    async fn notify_channel(&self, giveaway: &Giveaway, channel_id: ChannelId, content: &str) {
        if let Err(err) = self.messenger.send(channel_id, content).await {
            warn!(
                "Can't post to channel {} for giveaway {}: {}",
                channel_id, giveaway.id, err
            );
        }
    }
}
