// Plain text rendering of giveaway messages
use serenity::utils::MessageBuilder;

use crate::commands::giveaway::formatters::base::{Announcement, FinalResult, GiveawayFormatter};
use crate::commands::giveaway::models::{Giveaway, Winner};

pub struct DefaultGiveawayFormatter;

impl DefaultGiveawayFormatter {
    pub fn new() -> Self {
        DefaultGiveawayFormatter {}
    }

    // Discord renders `<t:..>` tags in the local time of every reader.
    fn timestamp(&self, epoch_ms: i64, style: char) -> String {
        format!("<t:{}:{}>", epoch_ms.div_euclid(1000), style)
    }

    fn mentions(&self, winners: &[Winner]) -> String {
        let mut builder = MessageBuilder::new();
        for (index, winner) in winners.iter().enumerate() {
            if index > 0 {
                builder.push(", ");
            }
            builder.mention(&winner.id);
        }
        builder.build()
    }
}

impl Default for DefaultGiveawayFormatter {
    fn default() -> Self {
        DefaultGiveawayFormatter::new()
    }
}

impl GiveawayFormatter for DefaultGiveawayFormatter {
    fn announcement(&self, announcement: Announcement<'_>) -> String {
        let mut builder = MessageBuilder::new();
        builder
            .push_bold_line(format!("🎉 GIVEAWAY: {} 🎉", announcement.title))
            .push_line(announcement.description);

        if let Some(requirements) = announcement.requirements {
            builder.push("Requirements: ").push_line(requirements);
        }
        if let Some(role_id) = announcement.required_role_id {
            builder.push("Required role: ").mention(&role_id).push_line("");
        }
        if let Some(min_invites) = announcement.min_invites {
            builder.push_line(format!("Minimum invites: {}", min_invites));
        }

        builder
            .push_line(format!("Winners: {}", announcement.winner_count))
            .push_line(format!(
                "Ends: {} ({})",
                self.timestamp(announcement.end_time_epoch_ms, 'R'),
                self.timestamp(announcement.end_time_epoch_ms, 'F'),
            ))
            .push_line(format!("React with {} to enter!", announcement.entry_token))
            .push("ID: ")
            .push_mono(announcement.id)
            .build()
    }

    fn ended(&self, giveaway: &Giveaway, result: FinalResult<'_>) -> String {
        let outcome = match result {
            FinalResult::Winners(winners) => format!("Winners: {}", self.mentions(winners)),
            FinalResult::NoEligibleParticipants => "No eligible participants.".to_string(),
            FinalResult::NoParticipants => "No participants.".to_string(),
        };
        let ended_at = giveaway
            .ended_at
            .map(|ended_at| ended_at.timestamp_millis())
            .unwrap_or(giveaway.end_time_epoch_ms);

        MessageBuilder::new()
            .push_bold_line(format!("🎉 GIVEAWAY ENDED: {} 🎉", giveaway.title))
            .push_line(giveaway.description.as_str())
            .push_line(outcome)
            .push_line(format!("Ended: {}", self.timestamp(ended_at, 'F')))
            .push("ID: ")
            .push_mono(giveaway.id.as_str())
            .build()
    }

    fn results(&self, giveaway: &Giveaway, result: FinalResult<'_>) -> String {
        match result {
            FinalResult::Winners(winners) => MessageBuilder::new()
                .push("Congratulations ")
                .push(self.mentions(winners))
                .push("! You won ")
                .push_bold(giveaway.title.as_str())
                .push("!")
                .build(),
            FinalResult::NoEligibleParticipants => MessageBuilder::new()
                .push("The ")
                .push_bold(giveaway.title.as_str())
                .push(" giveaway has ended, but nobody was eligible to win.")
                .build(),
            FinalResult::NoParticipants => MessageBuilder::new()
                .push("The ")
                .push_bold(giveaway.title.as_str())
                .push(" giveaway has ended with no participants.")
                .build(),
        }
    }

    fn winner_notice(&self, giveaway: &Giveaway) -> String {
        MessageBuilder::new()
            .push("You won the ")
            .push_bold(giveaway.title.as_str())
            .push(" giveaway in ")
            .mention(&giveaway.channel_id)
            .push("! The host will contact you soon.")
            .build()
    }

    fn entry_denied(&self, giveaway: &Giveaway, reason: &str) -> String {
        MessageBuilder::new()
            .push("Your entry to the ")
            .push_bold(giveaway.title.as_str())
            .push(" giveaway was removed. ")
            .push(reason)
            .build()
    }

    fn message_lost(&self, giveaway: &Giveaway) -> String {
        MessageBuilder::new()
            .push("The ")
            .push_bold(giveaway.title.as_str())
            .push(" giveaway (")
            .push_mono(giveaway.id.as_str())
            .push(") has ended, but its original message was lost, so no winners were picked.")
            .build()
    }

    fn entries_unavailable(&self, giveaway: &Giveaway) -> String {
        MessageBuilder::new()
            .push("The ")
            .push_bold(giveaway.title.as_str())
            .push(" giveaway (")
            .push_mono(giveaway.id.as_str())
            .push(") has ended, but its entries couldn't be read, so no winners were picked.")
            .build()
    }

    fn summary(&self, giveaway: &Giveaway) -> String {
        format!(
            "{} [winners: {}, ends {}, id: `{}`]",
            giveaway.title,
            giveaway.winner_count,
            self.timestamp(giveaway.end_time_epoch_ms, 'R'),
            giveaway.id,
        )
    }
}
