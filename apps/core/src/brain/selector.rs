//! Response selection.
//!
//! Picks the reply template for a classified message. Crisis replies are
//! returned untouched; otherwise trend overrides come first, then a random
//! template that avoids the last few replies, optionally followed by a
//! follow-up question.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;

use super::catalog::{Category, CategoryCatalog};
use super::trend::{Trend, TrendSummary};
use crate::error::AppError;

/// Default probability of appending a follow-up question
pub const DEFAULT_FOLLOW_UP_PROBABILITY: f64 = 0.28;
/// Default number of recent replies excluded from the candidate pool
pub const DEFAULT_REPEAT_WINDOW: usize = 3;
/// Default number of recent replies remembered
pub const DEFAULT_RECENT_CAPACITY: usize = 10;

/// Per-session memory of recently served replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationContext {
    recent_responses: VecDeque<String>,
    capacity: usize,
}

impl Default for ConversationContext {
    fn default() -> Self {
        Self::new(DEFAULT_RECENT_CAPACITY)
    }
}

impl ConversationContext {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            recent_responses: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Records a served base reply, dropping the oldest past capacity.
    pub fn remember(&mut self, response: impl Into<String>) {
        self.recent_responses.push_back(response.into());
        while self.recent_responses.len() > self.capacity {
            self.recent_responses.pop_front();
        }
    }

    /// The last `n` replies, oldest first.
    pub fn last(&self, n: usize) -> impl Iterator<Item = &str> {
        let skip = self.recent_responses.len().saturating_sub(n);
        self.recent_responses.iter().skip(skip).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.recent_responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent_responses.is_empty()
    }

    pub fn clear(&mut self) {
        self.recent_responses.clear();
    }
}

/// Why a reply was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionReason {
    Crisis,
    CopingOverride,
    CheckInOverride,
    Template,
}

/// A chosen reply, before bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Reply without the follow-up; this is what repeat-avoidance remembers
    pub base: String,
    /// Full reply text
    pub text: String,
    pub reason: SelectionReason,
}

/// Selector tuning
#[derive(Debug, Clone, Copy)]
pub struct SelectorSettings {
    pub follow_up_probability: f64,
    pub repeat_window: usize,
}

impl Default for SelectorSettings {
    fn default() -> Self {
        Self {
            follow_up_probability: DEFAULT_FOLLOW_UP_PROBABILITY,
            repeat_window: DEFAULT_REPEAT_WINDOW,
        }
    }
}

/// Response selector over a category catalog
pub struct ResponseSelector {
    catalog: Arc<CategoryCatalog>,
    settings: SelectorSettings,
}

impl ResponseSelector {
    pub fn new(catalog: Arc<CategoryCatalog>, settings: SelectorSettings) -> Self {
        Self { catalog, settings }
    }

    /// Chooses a reply without touching the context.
    pub fn choose<R: Rng + ?Sized>(
        &self,
        category: Category,
        mood: u8,
        stress: u8,
        trends: &TrendSummary,
        context: &ConversationContext,
        rng: &mut R,
    ) -> Result<Selection, AppError> {
        let definition = self.catalog.definition(category)?;

        if definition.is_crisis {
            let base = pick(&definition.responses, rng, category)?.to_string();
            return Ok(Selection {
                text: base.clone(),
                base,
                reason: SelectionReason::Crisis,
            });
        }

        let texts = self.catalog.texts();
        if trends.stress_trend == Trend::Worsening && stress >= 4 {
            return Ok(fixed(&texts.coping_prompt, SelectionReason::CopingOverride));
        }
        if trends.mood_trend == Trend::Declining && mood <= 2 {
            return Ok(fixed(&texts.check_in, SelectionReason::CheckInOverride));
        }

        let recent: Vec<&str> = context.last(self.settings.repeat_window).collect();
        let candidates: Vec<&String> = definition
            .responses
            .iter()
            .filter(|r| !recent.contains(&r.as_str()))
            .collect();

        let base = match candidates.choose(rng) {
            Some(response) => (*response).clone(),
            // Every template was served recently: reuse the full pool.
            None => pick(&definition.responses, rng, category)?.to_string(),
        };

        let mut text = base.clone();
        if !definition.follow_ups.is_empty() && rng.gen_bool(self.settings.follow_up_probability)
        {
            if let Some(follow_up) = definition.follow_ups.choose(rng) {
                text.push_str("\n\n");
                text.push_str(follow_up);
            }
        }

        Ok(Selection {
            base,
            text,
            reason: SelectionReason::Template,
        })
    }

    /// Chooses a reply and records it in the context.
    pub fn select<R: Rng + ?Sized>(
        &self,
        category: Category,
        mood: u8,
        stress: u8,
        trends: &TrendSummary,
        context: &mut ConversationContext,
        rng: &mut R,
    ) -> Result<String, AppError> {
        let selection = self.choose(category, mood, stress, trends, context, rng)?;
        context.remember(selection.base);
        Ok(selection.text)
    }

    /// String-keyed entry point; unknown ids are an error.
    pub fn select_by_id<R: Rng + ?Sized>(
        &self,
        category_id: &str,
        mood: u8,
        stress: u8,
        trends: &TrendSummary,
        context: &mut ConversationContext,
        rng: &mut R,
    ) -> Result<String, AppError> {
        let category = category_id.parse::<Category>()?;
        self.select(category, mood, stress, trends, context, rng)
    }
}

fn pick<'a, R: Rng + ?Sized>(
    responses: &'a [String],
    rng: &mut R,
    category: Category,
) -> Result<&'a str, AppError> {
    responses
        .choose(rng)
        .map(String::as_str)
        .ok_or_else(|| AppError::Internal(format!("Category '{}' has no responses", category)))
}

fn fixed(text: &str, reason: SelectionReason) -> Selection {
    Selection {
        base: text.to_string(),
        text: text.to_string(),
        reason,
    }
}
