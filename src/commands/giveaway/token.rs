// Normalized representation of the reaction that marks an entry
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serenity::model::channel::ReactionType;
use serenity::model::id::EmojiId;

lazy_static! {
    static ref CUSTOM_EMOJI_REGEX: Regex =
        Regex::new(r"^<(?P<animated>a?):(?P<name>[A-Za-z0-9_~]+):(?P<id>\d+)>$").unwrap();
    static ref NAMED_ID_REGEX: Regex =
        Regex::new(r"^(?P<name>[A-Za-z0-9_~]+):(?P<id>\d+)$").unwrap();
}

const VARIATION_SELECTOR: char = '\u{FE0F}';

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum EntryToken {
    Unicode(String),
    Custom {
        id: u64,
        name: Option<String>,
        #[serde(default)]
        animated: bool,
    },
}

impl EntryToken {
    // Builds a token from whatever the user typed in the command: a unicode
    // emoji, a `<:name:id>` mention, `name:id` or a bare emoji id.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        if let Some(captures) = CUSTOM_EMOJI_REGEX.captures(text) {
            let id = captures["id"].parse::<u64>().ok().filter(|id| *id > 0)?;
            return Some(EntryToken::Custom {
                id,
                name: Some(captures["name"].to_string()),
                animated: !captures["animated"].is_empty(),
            });
        }

        if let Some(captures) = NAMED_ID_REGEX.captures(text) {
            let id = captures["id"].parse::<u64>().ok().filter(|id| *id > 0)?;
            return Some(EntryToken::Custom {
                id,
                name: Some(captures["name"].to_string()),
                animated: false,
            });
        }

        if text.chars().all(|c| c.is_ascii_digit()) {
            let id = text.parse::<u64>().ok().filter(|id| *id > 0)?;
            return Some(EntryToken::Custom {
                id,
                name: None,
                animated: false,
            });
        }

        Some(EntryToken::Unicode(text.to_string()))
    }

    // The single equality used for every entry comparison. Custom emojis are
    // equal by id, unicode ones ignoring variation selectors, and a unicode
    // value matches a custom emoji by its name, mention form or id.
    pub fn matches(&self, other: &EntryToken) -> bool {
        match (self, other) {
            (EntryToken::Unicode(left), EntryToken::Unicode(right)) => {
                strip_variation(left) == strip_variation(right)
            }
            (EntryToken::Custom { id: left, .. }, EntryToken::Custom { id: right, .. }) => {
                left == right
            }
            (EntryToken::Unicode(text), custom @ EntryToken::Custom { .. })
            | (custom @ EntryToken::Custom { .. }, EntryToken::Unicode(text)) => {
                custom.representations().iter().any(|form| form == text)
            }
        }
    }

    // All string forms a custom emoji can be referred by.
    fn representations(&self) -> Vec<String> {
        match self {
            EntryToken::Unicode(text) => vec![text.clone()],
            EntryToken::Custom { id, name, .. } => {
                let mut forms = vec![id.to_string(), self.to_string()];
                if let Some(name) = name {
                    forms.push(name.clone());
                    forms.push(format!("{}:{}", name, id));
                }
                forms
            }
        }
    }
}

fn strip_variation(text: &str) -> String {
    text.chars().filter(|c| *c != VARIATION_SELECTOR).collect()
}

impl fmt::Display for EntryToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryToken::Unicode(text) => write!(f, "{}", text),
            EntryToken::Custom { id, name, animated } => {
                let prefix = if *animated { "a" } else { "" };
                let name = name.as_deref().unwrap_or("emoji");
                write!(f, "<{}:{}:{}>", prefix, name, id)
            }
        }
    }
}

impl From<&ReactionType> for EntryToken {
    fn from(reaction: &ReactionType) -> Self {
        match reaction {
            ReactionType::Custom { animated, id, name } => EntryToken::Custom {
                id: id.get(),
                name: name.clone(),
                animated: *animated,
            },
            ReactionType::Unicode(text) => EntryToken::Unicode(text.clone()),
            // Newer reaction kinds carry no stable identity, so only the
            // textual form is kept.
            other => EntryToken::Unicode(other.to_string()),
        }
    }
}

impl From<&EntryToken> for ReactionType {
    fn from(token: &EntryToken) -> Self {
        match token {
            EntryToken::Unicode(text) => ReactionType::Unicode(text.clone()),
            EntryToken::Custom { id, name, animated } => ReactionType::Custom {
                animated: *animated,
                id: EmojiId::new(*id),
                name: name.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serenity::model::channel::ReactionType;
    use serenity::model::id::EmojiId;

    use crate::commands::giveaway::token::EntryToken;

    fn custom(id: u64, name: &str) -> EntryToken {
        EntryToken::Custom {
            id,
            name: Some(name.to_string()),
            animated: false,
        }
    }

    #[test]
    fn test_parse_unicode_emoji() {
        assert_eq!(
            EntryToken::parse("🎉"),
            Some(EntryToken::Unicode("🎉".to_string()))
        );
    }

    #[test]
    fn test_parse_custom_emoji_mention() {
        assert_eq!(EntryToken::parse("<:party:1234>"), Some(custom(1234, "party")));
        assert_eq!(
            EntryToken::parse("<a:party:1234>"),
            Some(EntryToken::Custom {
                id: 1234,
                name: Some("party".to_string()),
                animated: true,
            })
        );
    }

    #[test]
    fn test_parse_named_id_and_bare_id() {
        assert_eq!(EntryToken::parse("party:1234"), Some(custom(1234, "party")));
        assert_eq!(
            EntryToken::parse("1234"),
            Some(EntryToken::Custom {
                id: 1234,
                name: None,
                animated: false,
            })
        );
    }

    #[test]
    fn test_parse_empty_input() {
        assert_eq!(EntryToken::parse("   "), None);
        assert_eq!(EntryToken::parse("0"), None);
    }

    #[test]
    fn test_custom_tokens_match_by_id_only() {
        let stored = custom(1234, "party");
        let renamed = custom(1234, "celebrate");
        let other = custom(4321, "party");

        assert!(stored.matches(&renamed));
        assert!(!stored.matches(&other));
    }

    #[test]
    fn test_unicode_matches_custom_by_any_representation() {
        let stored = custom(1234, "party");

        assert!(EntryToken::Unicode("party".to_string()).matches(&stored));
        assert!(EntryToken::Unicode("<:party:1234>".to_string()).matches(&stored));
        assert!(EntryToken::Unicode("1234".to_string()).matches(&stored));
        assert!(stored.matches(&EntryToken::Unicode("party:1234".to_string())));
        assert!(!EntryToken::Unicode("tada".to_string()).matches(&stored));
    }

    #[test]
    fn test_unicode_ignores_variation_selector() {
        let plain = EntryToken::Unicode("\u{2764}".to_string());
        let with_selector = EntryToken::Unicode("\u{2764}\u{FE0F}".to_string());

        assert!(plain.matches(&with_selector));
    }

    #[test]
    fn test_reaction_type_conversion_keeps_identity() {
        let reaction = ReactionType::Custom {
            animated: false,
            id: EmojiId::new(1234),
            name: Some("party".to_string()),
        };
        let token = EntryToken::from(&reaction);

        assert_eq!(token, custom(1234, "party"));
        assert_eq!(ReactionType::from(&token), reaction);
    }

    #[test]
    fn test_display_custom_token() {
        assert_eq!(custom(1234, "party").to_string(), "<:party:1234>");
    }

    #[test]
    fn test_tokens_serialize_with_kind_and_value() {
        let unicode = EntryToken::Unicode("🎉".to_string());
        let unicode_json = serde_json::to_string(&unicode).unwrap();
        assert_eq!(unicode_json, r#"{"kind":"unicode","value":"🎉"}"#);
        assert_eq!(serde_json::from_str::<EntryToken>(&unicode_json).unwrap(), unicode);

        let custom_json = serde_json::to_string(&custom(1234, "party")).unwrap();
        assert_eq!(
            custom_json,
            r#"{"kind":"custom","value":{"id":1234,"name":"party","animated":false}}"#
        );
        assert_eq!(
            serde_json::from_str::<EntryToken>(&custom_json).unwrap(),
            custom(1234, "party")
        );
    }
}
