/// A `/name[@bot] args` bot command split into its parts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BotCommand<'a> {
    pub name: &'a str,
    pub addressed_to: Option<&'a str>,
    pub args: &'a str,
}

impl<'a> BotCommand<'a> {
    pub fn parse(text: &'a str) -> Option<Self> {
        let body = text.trim_start().strip_prefix('/')?;
        let head_end = body.find(char::is_whitespace).unwrap_or(body.len());
        let (head, args) = body.split_at(head_end);

        let (name, addressed_to) = match head.split_once('@') {
            Some((name, bot)) => (name, Some(bot)),
            None => (head, None),
        };
        if name.is_empty() {
            return None;
        }

        Some(Self { name, addressed_to, args: args.trim() })
    }

    /// Commands addressed to another bot in a shared group are not ours.
    pub fn is_for(&self, bot_username: &str) -> bool {
        let ours = bot_username.trim_start_matches('@');
        self.addressed_to.map_or(true, |target| target.eq_ignore_ascii_case(ours))
    }
}

/// True for a bare `/start` (or `/start@<us>`) that should get the welcome
/// text. `/start` with arguments is an ordinary message.
pub fn is_welcome_request(text: &str, bot_username: &str) -> bool {
    BotCommand::parse(text).is_some_and(|command| {
        command.name.eq_ignore_ascii_case("start") && command.args.is_empty() && command.is_for(bot_username)
    })
}

#[cfg(test)]
mod tests {
    use super::{is_welcome_request, BotCommand};

    #[test]
    fn parses_addressed_command_with_args() {
        let command = BotCommand::parse("/ask@RelayBot  how do I focus? ").expect("command");
        assert_eq!(command.name, "ask");
        assert_eq!(command.addressed_to, Some("RelayBot"));
        assert_eq!(command.args, "how do I focus?");
        assert!(command.is_for("@relaybot"));
        assert!(!command.is_for("otherbot"));
    }

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(BotCommand::parse("hello /start"), None);
        assert_eq!(BotCommand::parse("/ nothing"), None);
    }

    #[test]
    fn only_bare_start_is_a_welcome_request() {
        assert!(is_welcome_request("/start", "relaybot"));
        assert!(is_welcome_request("  /start@RelayBot ", "relaybot"));
        assert!(!is_welcome_request("/start motivation", "relaybot"));
        assert!(!is_welcome_request("/start@otherbot", "relaybot"));
        assert!(!is_welcome_request("/started", "relaybot"));
        assert!(!is_welcome_request("/ask", "relaybot"));
    }
}
