use std::collections::HashMap;

use serenity::model::id::{GuildId, UserId};
use tokio::sync::OnceCell;
use tracing::warn;

use crate::commands::giveaway::messaging::{GuildMember, InviteUsage, Messenger};
use crate::commands::giveaway::models::Giveaway;
use crate::error::{Error, Result};

#[readonly::make]
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Verdict {
    pub eligible: bool,
    // Human readable explanation, sent to users whose entry was denied
    pub reason: String,
}

impl Verdict {
    fn eligible() -> Self {
        Verdict {
            eligible: true,
            reason: "All requirements are met.".to_string(),
        }
    }

    fn ineligible(reason: String) -> Self {
        Verdict {
            eligible: false,
            reason,
        }
    }
}

// Decides whether a guild member can win the giveaway. One evaluator is
// created per entry event or per termination, so the guild invites are
// requested at most once for all candidates checked by it.
pub struct EligibilityEvaluator<'a> {
    messenger: &'a dyn Messenger,
    guild_id: GuildId,
    invites: OnceCell<Option<HashMap<UserId, u64>>>,
}

impl<'a> EligibilityEvaluator<'a> {
    pub fn new(messenger: &'a dyn Messenger, guild_id: GuildId) -> Self {
        EligibilityEvaluator {
            messenger,
            guild_id,
            invites: OnceCell::new(),
        }
    }

    pub async fn evaluate(&self, giveaway: &Giveaway, candidate: &GuildMember) -> Verdict {
        match self.check_requirements(giveaway, candidate).await {
            Ok(()) => Verdict::eligible(),
            Err(err) => Verdict::ineligible(err.to_string()),
        }
    }

    // Runs the checks in order, stopping on the first failed one.
    async fn check_requirements(&self, giveaway: &Giveaway, candidate: &GuildMember) -> Result<()> {
        self.check_not_a_bot(candidate)?;
        self.check_required_role(giveaway, candidate)?;
        self.check_min_invites(giveaway, candidate).await?;
        Ok(())
    }

    fn check_not_a_bot(&self, candidate: &GuildMember) -> Result<()> {
        if candidate.bot {
            let message = "Bots can't take part in giveaways.".to_string();
            return Err(Error::Ineligible(message));
        }

        Ok(())
    }

    fn check_required_role(&self, giveaway: &Giveaway, candidate: &GuildMember) -> Result<()> {
        if let Some(role_id) = giveaway.required_role_id {
            if !candidate.has_role(role_id) {
                let message = format!(
                    "You need the <@&{}> role to enter the \"{}\" giveaway.",
                    role_id.get(),
                    giveaway.title
                );
                return Err(Error::Ineligible(message));
            }
        }

        Ok(())
    }

    async fn check_min_invites(&self, giveaway: &Giveaway, candidate: &GuildMember) -> Result<()> {
        let min_invites = match giveaway.min_invites {
            Some(min_invites) => min_invites,
            None => return Ok(()),
        };

        let tally = match self.invite_tally().await {
            Some(tally) => tally,
            None => {
                let message = "Your invites couldn't be verified right now, so the entry \
                    wasn't accepted.".to_string();
                return Err(Error::Ineligible(message));
            }
        };

        let invited = tally.get(&candidate.user_id).copied().unwrap_or(0);
        if invited < min_invites {
            let message = format!(
                "You need at least {} invites to enter the \"{}\" giveaway (you have {}).",
                min_invites, giveaway.title, invited
            );
            return Err(Error::Ineligible(message));
        }

        Ok(())
    }

    // Invite uses summed up per inviter. `None` when the invites can't be
    // fetched, which makes every invite-gated candidate ineligible.
    async fn invite_tally(&self) -> Option<&HashMap<UserId, u64>> {
        self.invites
            .get_or_init(|| async {
                match self.messenger.fetch_invites(self.guild_id).await {
                    Ok(invites) => Some(count_invite_uses(&invites)),
                    Err(err) => {
                        warn!("Can't fetch invites of the guild {}: {}", self.guild_id, err);
                        None
                    }
                }
            })
            .await
            .as_ref()
    }
}

pub fn count_invite_uses(invites: &[InviteUsage]) -> HashMap<UserId, u64> {
    let mut tally = HashMap::new();
    for invite in invites {
        if let Some(inviter_id) = invite.inviter_id {
            let uses = tally.entry(inviter_id).or_insert(0u64);
            *uses = uses.saturating_add(invite.uses);
        }
    }
    tally
}
