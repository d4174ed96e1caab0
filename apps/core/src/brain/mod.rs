//! # Brain Module
//!
//! Rule-based analysis and reply engine.
//!
//! ## Components
//! - `catalog`: Category definitions, templates and fixed texts
//! - `classifier`: Keyword scoring with a crisis-first pass
//! - `mood`: Mood/stress estimation strategies
//! - `trend`: Recent-vs-older mood and stress trends
//! - `selector`: Reply choice with repeat avoidance
//! - `orchestrator`: Wires a turn through all of the above

pub mod catalog;
pub mod classifier;
pub mod mood;
pub mod orchestrator;
pub mod selector;
pub mod trend;

// Re-export main types for convenience
pub use catalog::{Category, CategoryCatalog, Language, QuickTopic};
pub use classifier::{ClassificationCache, ClassificationResult, TextClassifier};
pub use mood::{BaselineEstimator, EstimatorKind, LexiconEstimator, ModelEstimator, MoodEstimator};
pub use orchestrator::{Orchestrator, SessionSnapshot, TurnReply};
pub use selector::{ConversationContext, ResponseSelector, SelectionReason, SelectorSettings};
pub use trend::{compute_trends, Trend, TrendSummary};
