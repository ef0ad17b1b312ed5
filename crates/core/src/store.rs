use std::collections::VecDeque;

use crate::cache::{lock, BoundedKeyedCache};
use crate::domain::conversation::{ConversationKey, Turn};

/// Bounded per-conversation message history.
///
/// Each history holds at most `max_history` turns; appending past the bound
/// drops turns from the front. The number of tracked conversations is itself
/// bounded by `max_conversations` with least-recently-used eviction.
pub struct ConversationStore {
    histories: BoundedKeyedCache<ConversationKey, VecDeque<Turn>>,
    max_history: usize,
}

impl ConversationStore {
    pub fn new(max_history: usize, max_conversations: usize) -> Self {
        Self {
            histories: BoundedKeyedCache::with_capacity(max_conversations),
            max_history: max_history.max(1),
        }
    }

    pub fn append(&self, key: &ConversationKey, turn: Turn) {
        let slot = self.histories.slot_or_default(key);
        let mut history = lock(&slot);
        history.push_back(turn);
        while history.len() > self.max_history {
            history.pop_front();
        }
    }

    /// Independent copy of the history for `key`, oldest first. Unknown keys
    /// yield an empty history.
    pub fn snapshot(&self, key: &ConversationKey) -> Vec<Turn> {
        match self.histories.slot(key) {
            Some(slot) => lock(&slot).iter().cloned().collect(),
            None => Vec::new(),
        }
    }

    pub fn forget(&self, key: &ConversationKey) -> bool {
        self.histories.remove(key)
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    pub fn conversation_count(&self) -> usize {
        self.histories.len()
    }
}
