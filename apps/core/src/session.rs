//! Session Store.
//!
//! Bounded message and mood logs for one conversation, the conversation
//! context used for repeat-avoidance, and the session crisis state machine.
//! A session has exactly one owner; nothing here is shared between sessions.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, warn};

use crate::brain::selector::ConversationContext;
use crate::models::{Message, MoodEntry};

/// Default message log cap
pub const DEFAULT_MAX_MESSAGES: usize = 50;
/// Default mood log cap
pub const DEFAULT_MAX_MOOD_ENTRIES: usize = 100;
/// Default number of mood entries between periodic trim sweeps
pub const DEFAULT_TRIM_INTERVAL: u64 = 10;

/// Session-level crisis flag.
///
/// `Normal -> Crisis` on the first crisis signal. Only `SessionStore::reset`
/// goes back to `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrisisState {
    #[default]
    Normal,
    Crisis,
}

/// Capacity policy for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub max_messages: usize,
    pub max_mood_entries: usize,
    pub recent_responses: usize,
    pub trim_interval: u64,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_messages: DEFAULT_MAX_MESSAGES,
            max_mood_entries: DEFAULT_MAX_MOOD_ENTRIES,
            recent_responses: crate::brain::selector::DEFAULT_RECENT_CAPACITY,
            trim_interval: DEFAULT_TRIM_INTERVAL,
        }
    }
}

/// State of one conversation
#[derive(Debug, Clone)]
pub struct SessionStore {
    limits: SessionLimits,
    messages: VecDeque<Message>,
    moods: VecDeque<MoodEntry>,
    context: ConversationContext,
    crisis: CrisisState,
    /// User turns since creation or last reset
    turns: u64,
    /// Mood entries appended since creation or last reset, evicted ones included
    moods_recorded: u64,
}

impl SessionStore {
    pub fn new(limits: SessionLimits) -> Self {
        Self {
            limits,
            messages: VecDeque::with_capacity(limits.max_messages),
            moods: VecDeque::with_capacity(limits.max_mood_entries),
            context: ConversationContext::new(limits.recent_responses),
            crisis: CrisisState::Normal,
            turns: 0,
            moods_recorded: 0,
        }
    }

    /// Appends a message, evicting the oldest past the cap.
    pub fn append_message(&mut self, message: Message) {
        self.messages.push_back(message);
        while self.messages.len() > self.limits.max_messages {
            self.messages.pop_front();
        }
    }

    /// Appends a mood entry, evicting the oldest past the cap. A crisis entry
    /// also latches the crisis flag.
    ///
    /// Every `trim_interval`-th entry also runs a full `trim` sweep over both
    /// logs. The appends already hold their caps, so the sweep is a guard and
    /// normally finds nothing to drop.
    pub fn append_mood(&mut self, entry: MoodEntry) {
        if entry.crisis {
            self.mark_crisis();
        }
        self.moods.push_back(entry);
        while self.moods.len() > self.limits.max_mood_entries {
            self.moods.pop_front();
        }

        self.moods_recorded += 1;
        if self.limits.trim_interval > 0 && self.moods_recorded % self.limits.trim_interval == 0 {
            self.trim();
        }
    }

    /// Drops the oldest entries until every log is within its cap.
    pub fn trim(&mut self) {
        let messages_over = self.messages.len().saturating_sub(self.limits.max_messages);
        let moods_over = self.moods.len().saturating_sub(self.limits.max_mood_entries);
        if messages_over > 0 {
            self.messages.drain(..messages_over);
        }
        if moods_over > 0 {
            self.moods.drain(..moods_over);
        }
        if messages_over + moods_over > 0 {
            debug!(messages_over, moods_over, "Trimmed session logs");
        }
    }

    /// Counts a completed user turn.
    pub fn complete_turn(&mut self) {
        self.turns += 1;
    }

    /// Latches the crisis flag. Idempotent.
    pub fn mark_crisis(&mut self) {
        if self.crisis == CrisisState::Normal {
            warn!("Session entered crisis state");
        }
        self.crisis = CrisisState::Crisis;
    }

    pub fn crisis_state(&self) -> CrisisState {
        self.crisis
    }

    pub fn in_crisis(&self) -> bool {
        self.crisis == CrisisState::Crisis
    }

    /// Full re-initialization: logs, context, crisis flag and turn counter.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.moods.clear();
        self.context.clear();
        self.crisis = CrisisState::Normal;
        self.turns = 0;
        self.moods_recorded = 0;
    }

    pub fn messages(&self) -> &VecDeque<Message> {
        &self.messages
    }

    pub fn moods(&self) -> &VecDeque<MoodEntry> {
        &self.moods
    }

    pub fn context(&self) -> &ConversationContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ConversationContext {
        &mut self.context
    }

    pub fn turns(&self) -> u64 {
        self.turns
    }

    pub fn moods_recorded(&self) -> u64 {
        self.moods_recorded
    }
}
