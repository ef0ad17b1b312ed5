use chatrelay_core::config::RepliesConfig;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Proceed,
    Canned { reason_code: &'static str, reply: String },
}

/// Answers a few questions with fixed text instead of asking the backend.
/// A canned answer touches neither history nor the rate window.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GuardrailPolicy {
    creator_reply: Option<String>,
    identity_phrases: Vec<String>,
}

impl GuardrailPolicy {
    pub fn new(creator_reply: Option<String>, identity_phrases: Vec<String>) -> Self {
        let identity_phrases = identity_phrases
            .into_iter()
            .map(|phrase| phrase.trim().to_lowercase())
            .filter(|phrase| !phrase.is_empty())
            .collect();
        Self { creator_reply, identity_phrases }
    }

    pub fn from_config(replies: &RepliesConfig) -> Self {
        Self::new(replies.creator.clone(), replies.identity_phrases.clone())
    }

    pub fn evaluate(&self, trigger_text: &str) -> GuardrailDecision {
        let Some(reply) = &self.creator_reply else {
            return GuardrailDecision::Proceed;
        };

        let lowered = trigger_text.to_lowercase();
        if self.identity_phrases.iter().any(|phrase| lowered.contains(phrase.as_str())) {
            return GuardrailDecision::Canned { reason_code: "identity_question", reply: reply.clone() };
        }

        GuardrailDecision::Proceed
    }
}

#[cfg(test)]
mod tests {
    use super::{GuardrailDecision, GuardrailPolicy};

    fn policy() -> GuardrailPolicy {
        GuardrailPolicy::new(
            Some("I was built by the relay maintainers.".to_string()),
            vec!["who made you".to_string(), "Who Created You".to_string()],
        )
    }

    #[test]
    fn identity_question_gets_canned_reply() {
        let decision = policy().evaluate("Hey, WHO MADE YOU anyway?");
        assert_eq!(
            decision,
            GuardrailDecision::Canned {
                reason_code: "identity_question",
                reply: "I was built by the relay maintainers.".to_string(),
            }
        );
        assert!(matches!(policy().evaluate("who created you"), GuardrailDecision::Canned { .. }));
    }

    #[test]
    fn ordinary_text_proceeds() {
        assert_eq!(policy().evaluate("who made this plan work?"), GuardrailDecision::Proceed);
        assert_eq!(policy().evaluate("give me a pep talk"), GuardrailDecision::Proceed);
    }

    #[test]
    fn without_creator_reply_nothing_is_canned() {
        let policy = GuardrailPolicy::new(None, vec!["who made you".to_string()]);
        assert_eq!(policy.evaluate("who made you"), GuardrailDecision::Proceed);
        assert_eq!(GuardrailPolicy::default().evaluate("who made you"), GuardrailDecision::Proceed);
    }
}
