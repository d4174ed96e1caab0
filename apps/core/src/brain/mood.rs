//! Mood and stress estimation.
//!
//! Turns a message and its category into a 1..=5 mood/stress reading.
//! Three interchangeable strategies, picked once when the orchestrator is built:
//! - `BaselineEstimator`: fixed per-category defaults
//! - `LexiconEstimator`: defaults adjusted by a small FR/EN word lexicon
//! - `ModelEstimator`: a background-loaded `EmotionModel`, answering through the
//!   lexicon until the model reports ready

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::{Arc, LazyLock, OnceLock};
use tracing::{debug, info, warn};

use super::catalog::Category;
use crate::actors::traits::EmotionModel;
use crate::error::AppError;
use crate::models::MoodReading;

/// Largest adjustment the lexicon may apply to either score
const MAX_ADJUSTMENT: i32 = 2;

const POSITIVE_WORDS: &[&str] = &[
    "happy", "good", "great", "better", "grateful", "excited", "hopeful", "glad", "proud",
    "joyful", "content", "relieved", "motivated", "heureux", "heureuse", "bien", "mieux",
    "contente", "fier", "fière", "reconnaissant", "reconnaissante", "soulagé", "soulagée",
    "motivé", "motivée",
];

const NEGATIVE_WORDS: &[&str] = &[
    "sad", "depressed", "hopeless", "worthless", "miserable", "terrible", "awful", "bad",
    "worse", "cry", "crying", "empty", "hurt", "lost", "triste", "déprimé", "déprimée", "nul",
    "nulle", "vide", "pleure", "pleurer", "désespéré", "désespérée", "pire", "perdu", "perdue",
];

const STRESS_WORDS: &[&str] = &[
    "stressed", "stress", "overwhelmed", "pressure", "panic", "anxious", "tense", "exhausted",
    "burnout", "burned", "swamped", "stressé", "stressée", "pression", "débordé", "débordée",
    "panique", "épuisé", "épuisée", "tendu", "tendue", "anxieux", "anxieuse",
];

const CALM_WORDS: &[&str] = &[
    "calm", "relaxed", "peaceful", "rested", "manageable", "okay", "fine", "calme", "détendu",
    "détendue", "reposé", "reposée", "apaisé", "apaisée", "serein", "sereine",
];

const INTENSIFIERS: &[&str] = &[
    "very", "really", "so", "extremely", "too", "totally", "super", "très", "vraiment", "trop",
    "tellement", "extrêmement",
];

const NEGATORS: &[&str] = &[
    "not", "never", "no", "don't", "dont", "isn't", "aren't", "wasn't", "can't", "pas", "jamais",
    "plus",
];

// NOTE: expect() is acceptable here: the pattern is a compile-time constant.
static WORD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}']+").expect("Invalid regex: word pattern"));

/// Estimates a mood/stress reading for one message.
pub trait MoodEstimator: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Always returns a reading within 1..=5 on both scales.
    fn estimate(&self, text: &str, category: Category) -> MoodReading;
}

/// Which deterministic estimator to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimatorKind {
    Baseline,
    #[default]
    Lexicon,
}

impl FromStr for EstimatorKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "baseline" => Ok(EstimatorKind::Baseline),
            "lexicon" => Ok(EstimatorKind::Lexicon),
            other => Err(AppError::Config(format!("Unknown estimator: {}", other))),
        }
    }
}

impl EstimatorKind {
    pub fn build(self) -> Arc<dyn MoodEstimator> {
        match self {
            EstimatorKind::Baseline => Arc::new(BaselineEstimator),
            EstimatorKind::Lexicon => Arc::new(LexiconEstimator::new()),
        }
    }
}

/// Default reading for a category before any lexical adjustment.
pub fn baseline(category: Category) -> MoodReading {
    let (mood, stress) = match category {
        Category::Crisis => (1, 5),
        Category::Greetings => (4, 2),
        Category::AcademicStress => (3, 4),
        Category::Anxiety => (2, 4),
        Category::Loneliness => (2, 3),
        Category::Spiritual => (3, 3),
        Category::TimeManagement => (3, 4),
        Category::FinancialStress => (3, 4),
        Category::GeneralSupport => (3, 3),
    };
    MoodReading::new(mood, stress)
}

/// Fixed per-category readings
#[derive(Debug, Default, Clone, Copy)]
pub struct BaselineEstimator;

impl MoodEstimator for BaselineEstimator {
    fn name(&self) -> &'static str {
        "baseline"
    }

    fn estimate(&self, _text: &str, category: Category) -> MoodReading {
        baseline(category)
    }
}

/// Word counts gathered from one message
#[derive(Debug, Default, PartialEq, Eq)]
struct LexiconHits {
    positive: i32,
    negative: i32,
    stress: i32,
    calm: i32,
}

/// Category baseline adjusted by lexicon hits
pub struct LexiconEstimator {
    positive: HashSet<&'static str>,
    negative: HashSet<&'static str>,
    stress: HashSet<&'static str>,
    calm: HashSet<&'static str>,
    intensifiers: HashSet<&'static str>,
    negators: HashSet<&'static str>,
}

impl Default for LexiconEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconEstimator {
    pub fn new() -> Self {
        Self {
            positive: POSITIVE_WORDS.iter().copied().collect(),
            negative: NEGATIVE_WORDS.iter().copied().collect(),
            stress: STRESS_WORDS.iter().copied().collect(),
            calm: CALM_WORDS.iter().copied().collect(),
            intensifiers: INTENSIFIERS.iter().copied().collect(),
            negators: NEGATORS.iter().copied().collect(),
        }
    }

    fn count_hits(&self, text: &str) -> LexiconHits {
        let lower = text.to_lowercase();
        let words: Vec<&str> = WORD_PATTERN.find_iter(&lower).map(|m| m.as_str()).collect();

        let mut hits = LexiconHits::default();
        for (i, word) in words.iter().enumerate() {
            // Look back over at most two words: "not very happy", "so happy".
            let window = &words[i.saturating_sub(2)..i];
            let negated = window.iter().any(|w| self.negators.contains(w));
            let weight = if window.last().is_some_and(|w| self.intensifiers.contains(w)) {
                2
            } else {
                1
            };

            let is_positive = self.positive.contains(word);
            let is_negative = self.negative.contains(word);
            if is_positive || is_negative {
                if is_positive != negated {
                    hits.positive += weight;
                } else {
                    hits.negative += weight;
                }
            }

            let is_stress = self.stress.contains(word);
            let is_calm = self.calm.contains(word);
            if is_stress || is_calm {
                if is_stress != negated {
                    hits.stress += weight;
                } else {
                    hits.calm += weight;
                }
            }
        }
        hits
    }
}

impl MoodEstimator for LexiconEstimator {
    fn name(&self) -> &'static str {
        "lexicon"
    }

    fn estimate(&self, text: &str, category: Category) -> MoodReading {
        let base = baseline(category);
        let hits = self.count_hits(text);

        let mood_shift = (hits.positive - hits.negative).clamp(-MAX_ADJUSTMENT, MAX_ADJUSTMENT);
        let stress_shift = (hits.stress - hits.calm).clamp(-MAX_ADJUSTMENT, MAX_ADJUSTMENT);

        MoodReading::new(
            base.mood() as i32 + mood_shift,
            base.stress() as i32 + stress_shift,
        )
    }
}

/// Uses an `EmotionModel` once it has finished loading.
///
/// Loading runs in a background task. Until it completes (or if it fails) the
/// lexicon answers, so a turn never waits on the model.
pub struct ModelEstimator {
    ready: Arc<OnceLock<Arc<dyn EmotionModel>>>,
    fallback: LexiconEstimator,
}

impl ModelEstimator {
    /// Starts loading `model` in the background. Must be called inside a tokio runtime.
    pub fn spawn(model: Arc<dyn EmotionModel>) -> Self {
        let ready = Arc::new(OnceLock::new());
        let slot = ready.clone();

        tokio::spawn(async move {
            info!("Loading emotion model '{}' in the background...", model.name());
            match model.load().await {
                Ok(()) => {
                    info!("Emotion model '{}' ready", model.name());
                    let _ = slot.set(model);
                }
                Err(e) => warn!(
                    "Emotion model '{}' failed to load, staying on lexicon: {}",
                    model.name(),
                    e
                ),
            }
        });

        Self {
            ready,
            fallback: LexiconEstimator::new(),
        }
    }

    /// True once the model has loaded.
    pub fn is_ready(&self) -> bool {
        self.ready.get().is_some()
    }
}

impl MoodEstimator for ModelEstimator {
    fn name(&self) -> &'static str {
        "model"
    }

    fn estimate(&self, text: &str, category: Category) -> MoodReading {
        match self.ready.get() {
            Some(model) => match model.infer(text, category) {
                Some(reading) => reading,
                None => {
                    debug!("Emotion model gave no reading, using lexicon");
                    self.fallback.estimate(text, category)
                }
            },
            None => {
                debug!("Emotion model not ready, using lexicon");
                self.fallback.estimate(text, category)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_ignores_text() {
        let estimator = BaselineEstimator;
        let reading = estimator.estimate("I am so happy today", Category::Crisis);
        assert_eq!((reading.mood(), reading.stress()), (1, 5));
    }

    #[test]
    fn test_positive_words_raise_mood() {
        let estimator = LexiconEstimator::new();
        let reading = estimator.estimate("I feel good and calm", Category::GeneralSupport);
        assert_eq!(reading.mood(), 4);
        assert_eq!(reading.stress(), 2);
    }

    #[test]
    fn test_negation_flips_polarity() {
        let estimator = LexiconEstimator::new();
        let hits = estimator.count_hits("I am not happy");
        assert_eq!(hits.negative, 1);
        assert_eq!(hits.positive, 0);
    }

    #[test]
    fn test_intensifier_doubles_weight() {
        let estimator = LexiconEstimator::new();
        let hits = estimator.count_hits("I'm so stressed");
        assert_eq!(hits.stress, 2);
    }

    #[test]
    fn test_adjustment_is_capped_and_clamped() {
        let estimator = LexiconEstimator::new();
        let reading = estimator.estimate(
            "sad sad sad terrible awful, so overwhelmed and stressed and exhausted",
            Category::Anxiety,
        );
        // Anxiety baseline is (2, 4); shifts are capped at 2 and clamped into 1..=5.
        assert_eq!(reading.mood(), 1);
        assert_eq!(reading.stress(), 5);
    }

    #[test]
    fn test_french_words_are_counted() {
        let estimator = LexiconEstimator::new();
        let hits = estimator.count_hits("je suis vraiment triste et épuisée");
        assert_eq!(hits.negative, 2);
        assert_eq!(hits.stress, 1);
    }

    #[test]
    fn test_estimator_kind_parsing() {
        assert_eq!("Lexicon".parse::<EstimatorKind>().unwrap(), EstimatorKind::Lexicon);
        assert_eq!("baseline".parse::<EstimatorKind>().unwrap(), EstimatorKind::Baseline);
        assert!("neural".parse::<EstimatorKind>().is_err());
    }
}
