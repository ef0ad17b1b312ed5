use serde::{Deserialize, Serialize};

use crate::domain::event::ConversationKind;

/// Which group messages may trigger a reply.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupTrigger {
    #[default]
    MentionOrCommand,
    MentionOnly,
    CommandOnly,
}

impl GroupTrigger {
    fn allows_mention(self) -> bool {
        matches!(self, Self::MentionOrCommand | Self::MentionOnly)
    }

    fn allows_command(self) -> bool {
        matches!(self, Self::MentionOrCommand | Self::CommandOnly)
    }
}

impl std::str::FromStr for GroupTrigger {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mention_or_command" => Ok(Self::MentionOrCommand),
            "mention_only" => Ok(Self::MentionOnly),
            "command_only" => Ok(Self::CommandOnly),
            other => Err(format!(
                "unsupported group trigger `{other}` (expected mention_or_command|mention_only|command_only)"
            )),
        }
    }
}

/// Decides whether an inbound message deserves a reply and, if so, which
/// text to answer.
///
/// Direct chats answer any non-empty message. Group chats answer when the
/// bot's handle appears anywhere in the text (matched case-insensitively,
/// first occurrence removed) or when the text starts with the command
/// prefix. A command addressed to this bot (`/ask@handle ...`) counts as the
/// command, not as a mention.
#[derive(Clone, Debug)]
pub struct ReplyRouter {
    mention_handle: String,
    command_prefix: String,
    group_trigger: GroupTrigger,
}

impl ReplyRouter {
    /// `mention_handle` is normalized to carry a leading `@`; both the
    /// handle and `command_prefix` are trimmed.
    pub fn new(
        mention_handle: impl Into<String>,
        command_prefix: impl Into<String>,
        group_trigger: GroupTrigger,
    ) -> Self {
        let mention_handle = mention_handle.into().trim().to_owned();
        let mention_handle = if mention_handle.starts_with('@') {
            mention_handle
        } else {
            format!("@{mention_handle}")
        };

        let command_prefix = command_prefix.into().trim().to_owned();

        Self { mention_handle, command_prefix, group_trigger }
    }

    pub fn mention_handle(&self) -> &str {
        &self.mention_handle
    }

    pub fn route(&self, kind: ConversationKind, text: &str) -> Option<String> {
        match kind {
            ConversationKind::Direct => non_empty(text.trim()),
            ConversationKind::Group => self.route_group(text),
        }
    }

    fn route_group(&self, text: &str) -> Option<String> {
        let command = self.command_remainder(text);
        // with commands disabled an addressed command still counts as a mention
        if let Some(CommandMatch::Addressed(remainder)) = command {
            if self.group_trigger.allows_command() {
                return non_empty(remainder);
            }
        }

        if self.group_trigger.allows_mention() {
            if let Some(position) = find_ignore_ascii_case(text, &self.mention_handle) {
                let mut stripped = String::with_capacity(text.len());
                stripped.push_str(&text[..position]);
                stripped.push_str(&text[position + self.mention_handle.len()..]);
                return non_empty(stripped.trim());
            }
        }

        match command {
            Some(CommandMatch::Plain(remainder)) if self.group_trigger.allows_command() => {
                non_empty(remainder)
            }
            _ => None,
        }
    }

    fn command_remainder<'a>(&self, text: &'a str) -> Option<CommandMatch<'a>> {
        if self.command_prefix.is_empty() {
            return None;
        }
        let rest = text.trim_start().strip_prefix(self.command_prefix.as_str())?;

        if let Some(addressed) = rest.strip_prefix('@') {
            let handle_end = addressed.find(char::is_whitespace).unwrap_or(addressed.len());
            let handle = &addressed[..handle_end];
            let ours = handle.eq_ignore_ascii_case(&self.mention_handle[1..]);
            // commands addressed to another bot are never ours
            return ours.then(|| CommandMatch::Addressed(addressed[handle_end..].trim()));
        }

        match rest.chars().next() {
            None => Some(CommandMatch::Plain("")),
            Some(next) if next.is_whitespace() => Some(CommandMatch::Plain(rest.trim())),
            Some(_) => None,
        }
    }
}

enum CommandMatch<'a> {
    Plain(&'a str),
    Addressed(&'a str),
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_owned())
}

fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    let needle = needle.as_bytes();
    haystack.as_bytes().windows(needle.len()).enumerate().find_map(|(index, window)| {
        (window.eq_ignore_ascii_case(needle)
            && haystack.is_char_boundary(index)
            && haystack.is_char_boundary(index + needle.len()))
        .then_some(index)
    })
}

#[cfg(test)]
mod tests {
    use super::{GroupTrigger, ReplyRouter};
    use crate::domain::event::ConversationKind::{Direct, Group};

    fn router() -> ReplyRouter {
        ReplyRouter::new("@bot", "/ask", GroupTrigger::MentionOrCommand)
    }

    #[test]
    fn direct_chat_triggers_on_trimmed_text() {
        assert_eq!(router().route(Direct, "  /start motivation "), Some("/start motivation".into()));
        assert_eq!(router().route(Direct, "hello"), Some("hello".into()));
    }

    #[test]
    fn direct_chat_ignores_blank_text() {
        assert_eq!(router().route(Direct, "   \n"), None);
        assert_eq!(router().route(Direct, ""), None);
    }

    #[test]
    fn group_mention_anywhere_is_removed_once() {
        assert_eq!(
            router().route(Group, "hello @bot how are you"),
            Some("hello  how are you".into())
        );
        assert_eq!(router().route(Group, "@BOT tell @bot a joke"), Some("tell @bot a joke".into()));
    }

    #[test]
    fn group_mention_alone_is_ignored() {
        assert_eq!(router().route(Group, "  @bot  "), None);
    }

    #[test]
    fn group_command_prefix_triggers_with_remainder() {
        assert_eq!(router().route(Group, "/ask what is focus?"), Some("what is focus?".into()));
        assert_eq!(router().route(Group, "/ask@Bot  what now"), Some("what now".into()));
        assert_eq!(router().route(Group, "/ask"), None);
        assert_eq!(router().route(Group, "/ask   "), None);
    }

    #[test]
    fn group_command_prefix_requires_word_boundary() {
        assert_eq!(router().route(Group, "/asking for a friend"), None);
        assert_eq!(router().route(Group, "/ask@otherbot question"), None);
    }

    #[test]
    fn group_without_mention_or_command_never_triggers() {
        assert_eq!(router().route(Group, "just chatting here"), None);
        assert_eq!(router().route(Group, "ask the bot later"), None);
    }

    #[test]
    fn group_mention_match_is_not_word_anchored() {
        assert_eq!(
            router().route(Group, "email me at me@botany.org"),
            Some("email me at meany.org".into())
        );
    }

    #[test]
    fn group_policy_limits_trigger_kinds() {
        let mention_only = ReplyRouter::new("bot", "/ask", GroupTrigger::MentionOnly);
        assert_eq!(mention_only.mention_handle(), "@bot");
        assert_eq!(mention_only.route(Group, "/ask hi"), None);
        assert_eq!(mention_only.route(Group, "hi @bot"), Some("hi".into()));

        let command_only = ReplyRouter::new("@bot", "/ask", GroupTrigger::CommandOnly);
        assert_eq!(command_only.route(Group, "hi @bot"), None);
        assert_eq!(command_only.route(Group, "/ask hi"), Some("hi".into()));
        assert_eq!(command_only.route(Direct, "hi"), Some("hi".into()));
    }

    #[test]
    fn addressed_command_counts_as_mention_when_commands_are_off() {
        let mention_only = ReplyRouter::new("@bot", "/ask", GroupTrigger::MentionOnly);
        assert_eq!(mention_only.route(Group, "/ask@bot hi"), Some("/ask hi".into()));

        let command_only = ReplyRouter::new("@bot", "/ask", GroupTrigger::CommandOnly);
        assert_eq!(command_only.route(Group, "/ask@bot hi"), Some("hi".into()));
    }

    #[test]
    fn padded_command_prefix_still_matches() {
        let router = ReplyRouter::new(" @bot ", "/ask ", GroupTrigger::MentionOrCommand);
        assert_eq!(router.mention_handle(), "@bot");
        assert_eq!(router.route(Group, "/ask hi"), Some("hi".into()));
        assert_eq!(router.route(Group, "/asking"), None);
    }

    #[test]
    fn group_trigger_parses_from_config_strings() {
        assert_eq!("mention_only".parse::<GroupTrigger>(), Ok(GroupTrigger::MentionOnly));
        assert!("sometimes".parse::<GroupTrigger>().is_err());
    }
}
