//! Orchestrator - wires one user turn through the engine.
//!
//! A turn is split in two:
//! 1. `plan_turn`: pure computation (mood estimate, trends, reply choice)
//! 2. `apply_turn`: the only step that mutates the session
//!
//! Crisis classification is latched onto the session before planning, so a
//! failure later in the turn can never lose it.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::catalog::{Category, CategoryCatalog, QuickTopic};
use super::classifier::{ClassificationCache, ClassificationResult, TextClassifier};
use super::mood::MoodEstimator;
use super::selector::{ResponseSelector, Selection, SelectionReason, SelectorSettings};
use super::trend::{compute_trends, TrendSummary};
use crate::clock::{Clock, SystemClock};
use crate::error::AppError;
use crate::models::{Message, MoodEntry, MoodReading};
use crate::session::{CrisisState, SessionLimits, SessionStore};

/// Everything computed for a turn, not yet applied.
#[derive(Debug, Clone)]
pub struct TurnPlan {
    pub user_message: Message,
    pub classification: ClassificationResult,
    pub entry: MoodEntry,
    pub trends: TrendSummary,
    pub selection: Selection,
    pub tip: Option<String>,
    pub resources: Option<String>,
    pub replied_at: DateTime<Utc>,
}

/// What the front end receives for a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnReply {
    /// Selected reply, including any follow-up question
    pub text: String,
    pub category: Category,
    /// Crisis language in this message
    pub crisis: bool,
    /// Latched session crisis flag
    pub session_crisis: bool,
    pub mood: u8,
    pub stress: u8,
    pub trends: TrendSummary,
    pub reason: SelectionReason,
    pub tip: Option<String>,
    /// Emergency contacts, present on crisis turns
    pub resources: Option<String>,
}

impl TurnReply {
    /// Reply text with the tip and resources appended, as stored in the log.
    pub fn full_text(&self) -> String {
        let mut text = self.text.clone();
        for extra in [&self.tip, &self.resources].into_iter().flatten() {
            text.push_str("\n\n");
            text.push_str(extra);
        }
        text
    }
}

/// Serializable view of a session for export and charting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub messages: Vec<Message>,
    pub moods: Vec<MoodEntry>,
    pub trends: TrendSummary,
    pub crisis: CrisisState,
    pub turns: u64,
}

/// The support engine.
pub struct Orchestrator {
    catalog: Arc<CategoryCatalog>,
    classifier: TextClassifier,
    selector: ResponseSelector,
    estimator: Arc<dyn MoodEstimator>,
    clock: Arc<dyn Clock>,
    limits: SessionLimits,
}

impl Orchestrator {
    pub fn new(
        catalog: Arc<CategoryCatalog>,
        estimator: Arc<dyn MoodEstimator>,
        settings: SelectorSettings,
        limits: SessionLimits,
    ) -> Self {
        Self {
            classifier: TextClassifier::new(catalog.clone()),
            selector: ResponseSelector::new(catalog.clone(), settings),
            catalog,
            estimator,
            clock: Arc::new(SystemClock),
            limits,
        }
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Shares a classification cache with other orchestrators.
    pub fn with_cache(mut self, cache: Arc<ClassificationCache>) -> Self {
        self.classifier = TextClassifier::with_cache(self.catalog.clone(), cache);
        self
    }

    pub fn catalog(&self) -> &Arc<CategoryCatalog> {
        &self.catalog
    }

    /// A fresh session, opened with the welcome message.
    pub fn new_session(&self) -> SessionStore {
        let mut session = SessionStore::new(self.limits);
        self.greet(&mut session);
        session
    }

    fn greet(&self, session: &mut SessionStore) {
        session.append_message(Message::assistant(
            self.catalog.texts().welcome.clone(),
            self.clock.now(),
        ));
    }

    /// Category and crisis flag for a message.
    pub fn analyze_message(&self, text: &str) -> ClassificationResult {
        self.classifier.analyze(text)
    }

    /// Trends over the session's mood history.
    pub fn trends(&self, session: &SessionStore) -> TrendSummary {
        compute_trends(session.moods())
    }

    /// Computes a turn without mutating the session.
    pub fn plan_turn<R: Rng + ?Sized>(
        &self,
        session: &SessionStore,
        text: &str,
        classification: ClassificationResult,
        rng: &mut R,
    ) -> Result<TurnPlan, AppError> {
        let user_message = Message::user(text, self.clock.now());
        let category = classification.category;

        let reading = self.estimator.estimate(text, category);
        let entry = MoodEntry::new(
            user_message.timestamp,
            reading,
            category,
            classification.crisis,
        );

        let trends = compute_trends(session.moods().iter().chain(std::iter::once(&entry)));

        let selection = self.selector.choose(
            category,
            reading.mood(),
            reading.stress(),
            &trends,
            session.context(),
            rng,
        )?;

        let definition = self.catalog.definition(category)?;
        let resources = classification
            .crisis
            .then(|| self.catalog.texts().crisis_resources.clone());

        Ok(TurnPlan {
            user_message,
            classification,
            entry,
            trends,
            selection,
            tip: definition.tip.clone(),
            resources,
            replied_at: self.clock.now(),
        })
    }

    /// Writes a planned turn into the session.
    pub fn apply_turn(&self, session: &mut SessionStore, plan: TurnPlan) -> TurnReply {
        if plan.classification.crisis {
            session.mark_crisis();
        }

        let reply = TurnReply {
            text: plan.selection.text,
            category: plan.classification.category,
            crisis: plan.classification.crisis,
            session_crisis: false,
            mood: plan.entry.mood(),
            stress: plan.entry.stress(),
            trends: plan.trends,
            reason: plan.selection.reason,
            tip: plan.tip,
            resources: plan.resources,
        };

        session.context_mut().remember(plan.selection.base);
        session.append_message(plan.user_message);
        session.append_mood(plan.entry);
        session.append_message(Message::assistant(reply.full_text(), plan.replied_at));
        session.complete_turn();

        TurnReply {
            session_crisis: session.in_crisis(),
            ..reply
        }
    }

    /// Runs a full user turn.
    #[instrument(skip_all)]
    pub fn process_turn<R: Rng + ?Sized>(
        &self,
        session: &mut SessionStore,
        text: &str,
        rng: &mut R,
    ) -> Result<TurnReply, AppError> {
        let classification = self.classifier.analyze(text);
        if classification.crisis {
            session.mark_crisis();
        }

        let plan = self.plan_turn(session, text, classification, rng)?;
        let reply = self.apply_turn(session, plan);

        info!(
            category = %reply.category,
            crisis = reply.crisis,
            session_crisis = reply.session_crisis,
            mood = reply.mood,
            stress = reply.stress,
            mood_trend = %reply.trends.mood_trend,
            stress_trend = %reply.trends.stress_trend,
            "Turn processed"
        );
        Ok(reply)
    }

    /// Runs the canned message for a quick topic as a normal turn.
    pub fn quick_topic<R: Rng + ?Sized>(
        &self,
        session: &mut SessionStore,
        topic: QuickTopic,
        rng: &mut R,
    ) -> Result<TurnReply, AppError> {
        let prompt = self.catalog.quick_topic_prompt(topic)?.to_string();
        self.process_turn(session, &prompt, rng)
    }

    /// Logs the user's request and the emergency contacts reply, then returns
    /// the reply. Does not touch the crisis flag or the mood log.
    pub fn help_now(&self, session: &mut SessionStore) -> String {
        let texts = self.catalog.texts();
        session.append_message(Message::user(texts.help_request.clone(), self.clock.now()));
        let text = texts.help_now.clone();
        session.append_message(Message::assistant(text.clone(), self.clock.now()));
        text
    }

    /// Records a mood/stress entry reported outside a message turn.
    ///
    /// Scores are clamped into 1..=5. A crisis entry latches the session flag.
    pub fn record_mood_entry(
        &self,
        session: &mut SessionStore,
        mood: i32,
        stress: i32,
        category: Category,
        crisis: bool,
    ) -> MoodEntry {
        let reading = MoodReading::new(mood, stress);
        if reading.mood() as i32 != mood || reading.stress() as i32 != stress {
            warn!(mood, stress, "Mood entry out of range, clamped");
        }
        let entry = MoodEntry::new(self.clock.now(), reading, category, crisis);
        session.append_mood(entry.clone());
        entry
    }

    /// Full re-initialization of a session, reopened with the welcome message.
    pub fn reset_session(&self, session: &mut SessionStore) {
        session.reset();
        self.greet(session);
        info!("Session reset");
    }

    pub fn snapshot(&self, session_id: &str, session: &SessionStore) -> SessionSnapshot {
        SessionSnapshot {
            session_id: session_id.to_string(),
            messages: session.messages().iter().cloned().collect(),
            moods: session.moods().iter().cloned().collect(),
            trends: self.trends(session),
            crisis: session.crisis_state(),
            turns: session.turns(),
        }
    }
}
