//! Category Catalog.
//!
//! The closed set of support categories and the keyword patterns, reply
//! templates and follow-up prompts attached to each of them. A catalog is
//! parsed once from JSON (embedded per language, or an override file) and is
//! immutable afterwards.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use crate::error::AppError;

const CATALOG_EN: &str = include_str!("../../data/catalog.en.json");
const CATALOG_FR: &str = include_str!("../../data/catalog.fr.json");

/// Support category a message is classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Self-harm or suicide risk language
    Crisis,
    Greetings,
    AcademicStress,
    Anxiety,
    Loneliness,
    Spiritual,
    TimeManagement,
    FinancialStress,
    /// Neutral fallback when nothing else matches
    GeneralSupport,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Crisis,
        Category::Greetings,
        Category::AcademicStress,
        Category::Anxiety,
        Category::Loneliness,
        Category::Spiritual,
        Category::TimeManagement,
        Category::FinancialStress,
        Category::GeneralSupport,
    ];

    /// Returns the stable identifier used in catalogs and exports
    pub fn id(&self) -> &'static str {
        match self {
            Category::Crisis => "crisis",
            Category::Greetings => "greetings",
            Category::AcademicStress => "academic_stress",
            Category::Anxiety => "anxiety",
            Category::Loneliness => "loneliness",
            Category::Spiritual => "spiritual",
            Category::TimeManagement => "time_management",
            Category::FinancialStress => "financial_stress",
            Category::GeneralSupport => "general_support",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for Category {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.id() == wanted)
            .ok_or_else(|| AppError::UnknownCategory(s.to_string()))
    }
}

/// Language of a template set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "fr")]
    French,
}

impl Language {
    /// Returns the language code
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::French => "fr",
        }
    }
}

impl FromStr for Language {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Language::English),
            "fr" | "french" | "français" => Ok(Language::French),
            other => Err(AppError::Config(format!("Unsupported language: {}", other))),
        }
    }
}

/// Canned conversation starters offered by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickTopic {
    Anxious,
    StudyStress,
    Lonely,
    Spiritual,
    TimeManagement,
    Financial,
}

impl QuickTopic {
    pub const ALL: [QuickTopic; 6] = [
        QuickTopic::Anxious,
        QuickTopic::StudyStress,
        QuickTopic::Lonely,
        QuickTopic::Spiritual,
        QuickTopic::TimeManagement,
        QuickTopic::Financial,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            QuickTopic::Anxious => "anxious",
            QuickTopic::StudyStress => "study_stress",
            QuickTopic::Lonely => "lonely",
            QuickTopic::Spiritual => "spiritual",
            QuickTopic::TimeManagement => "time_management",
            QuickTopic::Financial => "financial",
        }
    }
}

impl FromStr for QuickTopic {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        QuickTopic::ALL
            .into_iter()
            .find(|t| t.id() == wanted)
            .ok_or_else(|| AppError::Validation(format!("Unknown quick topic: {}", s)))
    }
}

/// Keyword patterns and templates for one category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryDefinition {
    pub id: Category,
    /// Lowercase substrings, de-duplicated at load time
    #[serde(default)]
    pub patterns: Vec<String>,
    pub responses: Vec<String>,
    #[serde(default)]
    pub follow_ups: Vec<String>,
    #[serde(default)]
    pub is_crisis: bool,
    /// Practical tip shown next to the reply
    #[serde(default)]
    pub tip: Option<String>,
}

/// One quick topic and the user message it stands for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickTopicPrompt {
    pub topic: QuickTopic,
    pub prompt: String,
}

/// Fixed, category-independent texts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedTexts {
    /// First assistant message of every session
    pub welcome: String,
    /// Returned when stress is worsening and high
    pub coping_prompt: String,
    /// Returned when mood is declining and low
    pub check_in: String,
    /// Appended to crisis replies
    pub crisis_resources: String,
    /// Emergency contacts, on explicit request
    pub help_now: String,
    /// User message logged when emergency contacts are requested
    #[serde(default = "default_help_request")]
    pub help_request: String,
}

fn default_help_request() -> String {
    "I need help right now".to_string()
}

#[derive(Debug, Deserialize)]
struct RawCatalog {
    version: String,
    language: Language,
    texts: FixedTexts,
    quick_topics: Vec<QuickTopicPrompt>,
    categories: Vec<CategoryDefinition>,
}

/// Immutable, validated category catalog.
#[derive(Debug, Clone)]
pub struct CategoryCatalog {
    version: String,
    language: Language,
    texts: FixedTexts,
    quick_topics: Vec<QuickTopicPrompt>,
    /// In declaration order; the order breaks scoring ties
    categories: Vec<CategoryDefinition>,
    fingerprint: u64,
}

impl CategoryCatalog {
    /// Loads the embedded template set for `language`.
    pub fn embedded(language: Language) -> Result<Self, AppError> {
        let raw = match language {
            Language::English => CATALOG_EN,
            Language::French => CATALOG_FR,
        };
        let catalog = Self::from_json(raw)?;
        if catalog.language != language {
            return Err(AppError::Catalog(format!(
                "Embedded catalog for '{}' declares language '{}'",
                language.code(),
                catalog.language.code()
            )));
        }
        Ok(catalog)
    }

    /// Loads a catalog override from disk.
    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&raw)?;
        info!(
            "Loaded catalog '{}' ({}) from {:?}",
            catalog.version,
            catalog.language.code(),
            path
        );
        Ok(catalog)
    }

    /// Parses and validates a catalog document.
    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        let raw: RawCatalog = serde_json::from_str(raw)?;
        Self::validate(raw)
    }

    fn validate(raw: RawCatalog) -> Result<Self, AppError> {
        if raw.version.trim().is_empty() {
            return Err(AppError::Catalog("Catalog version must not be empty".into()));
        }

        let texts = &raw.texts;
        for (name, text) in [
            ("welcome", &texts.welcome),
            ("coping_prompt", &texts.coping_prompt),
            ("check_in", &texts.check_in),
            ("crisis_resources", &texts.crisis_resources),
            ("help_now", &texts.help_now),
            ("help_request", &texts.help_request),
        ] {
            if text.trim().is_empty() {
                return Err(AppError::Catalog(format!("Fixed text '{}' is empty", name)));
            }
        }

        let mut seen_topics = HashSet::new();
        for entry in &raw.quick_topics {
            if !seen_topics.insert(entry.topic) {
                return Err(AppError::Catalog(format!(
                    "Duplicate quick topic '{}'",
                    entry.topic.id()
                )));
            }
        }
        if let Some(missing) = QuickTopic::ALL.iter().find(|t| !seen_topics.contains(t)) {
            return Err(AppError::Catalog(format!(
                "Missing quick topic '{}'",
                missing.id()
            )));
        }

        let mut seen = HashSet::new();
        let mut categories = Vec::with_capacity(raw.categories.len());
        for mut def in raw.categories {
            if !seen.insert(def.id) {
                return Err(AppError::Catalog(format!("Duplicate category '{}'", def.id)));
            }
            if def.is_crisis != (def.id == Category::Crisis) {
                return Err(AppError::Catalog(format!(
                    "Only the crisis category may carry the crisis flag (found on '{}')",
                    def.id
                )));
            }
            if def.responses.iter().all(|r| r.trim().is_empty()) {
                return Err(AppError::Catalog(format!(
                    "Category '{}' has no responses",
                    def.id
                )));
            }

            let mut unique = HashSet::new();
            let mut patterns = Vec::with_capacity(def.patterns.len());
            for pattern in def.patterns {
                let pattern = pattern.trim().to_lowercase();
                if pattern.is_empty() {
                    return Err(AppError::Catalog(format!(
                        "Category '{}' has an empty pattern",
                        def.id
                    )));
                }
                if unique.insert(pattern.clone()) {
                    patterns.push(pattern);
                }
            }
            def.patterns = patterns;
            def.responses.retain(|r| !r.trim().is_empty());
            def.follow_ups.retain(|f| !f.trim().is_empty());
            categories.push(def);
        }

        for required in [Category::Crisis, Category::GeneralSupport] {
            if !seen.contains(&required) {
                return Err(AppError::Catalog(format!(
                    "Catalog must define the '{}' category",
                    required
                )));
            }
        }
        let crisis_has_patterns = categories
            .iter()
            .any(|d| d.is_crisis && !d.patterns.is_empty());
        if !crisis_has_patterns {
            return Err(AppError::Catalog("Crisis category has no patterns".into()));
        }

        let fingerprint = content_fingerprint(&raw.version, &categories);
        Ok(Self {
            version: raw.version,
            language: raw.language,
            texts: raw.texts,
            quick_topics: raw.quick_topics,
            categories,
            fingerprint,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Hash of the version and everything classification reads.
    ///
    /// Two catalogs with the same declared version but different patterns get
    /// different fingerprints.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn texts(&self) -> &FixedTexts {
        &self.texts
    }

    /// Definitions in declaration order.
    pub fn definitions(&self) -> impl Iterator<Item = &CategoryDefinition> {
        self.categories.iter()
    }

    /// Looks up a category. Missing categories are a hard error.
    pub fn definition(&self, category: Category) -> Result<&CategoryDefinition, AppError> {
        self.categories
            .iter()
            .find(|d| d.id == category)
            .ok_or_else(|| AppError::UnknownCategory(category.id().to_string()))
    }

    /// The crisis definition (always present after validation).
    pub fn crisis(&self) -> Result<&CategoryDefinition, AppError> {
        self.definition(Category::Crisis)
    }

    pub fn quick_topic_prompt(&self, topic: QuickTopic) -> Result<&str, AppError> {
        self.quick_topics
            .iter()
            .find(|q| q.topic == topic)
            .map(|q| q.prompt.as_str())
            .ok_or_else(|| AppError::Catalog(format!("Missing quick topic '{}'", topic.id())))
    }
}

fn content_fingerprint(version: &str, categories: &[CategoryDefinition]) -> u64 {
    let mut hasher = DefaultHasher::new();
    version.hash(&mut hasher);
    for def in categories {
        def.id.hash(&mut hasher);
        def.is_crisis.hash(&mut hasher);
        def.patterns.hash(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal_catalog() -> serde_json::Value {
        json!({
            "version": "test-1",
            "language": "en",
            "texts": {
                "welcome": "Welcome",
                "coping_prompt": "Coping",
                "check_in": "Check in",
                "crisis_resources": "Resources",
                "help_now": "Help"
            },
            "quick_topics": [
                {"topic": "anxious", "prompt": "I'm feeling anxious"},
                {"topic": "study_stress", "prompt": "I'm stressed about studying"},
                {"topic": "lonely", "prompt": "I feel lonely"},
                {"topic": "spiritual", "prompt": "I have spiritual questions"},
                {"topic": "time_management", "prompt": "I struggle with time management"},
                {"topic": "financial", "prompt": "I'm worried about money"}
            ],
            "categories": [
                {"id": "crisis", "is_crisis": true, "patterns": ["Suicide"], "responses": ["Call"]},
                {"id": "general_support", "responses": ["Here"]}
            ]
        })
    }

    #[test]
    fn test_embedded_catalogs_load() {
        for language in [Language::English, Language::French] {
            let catalog = CategoryCatalog::embedded(language).unwrap();
            assert_eq!(catalog.language(), language);
            for category in Category::ALL {
                assert!(
                    catalog.definition(category).is_ok(),
                    "{} missing from {}",
                    category,
                    language.code()
                );
            }
        }
    }

    #[test]
    fn test_patterns_are_normalized() {
        let catalog = CategoryCatalog::from_json(&minimal_catalog().to_string()).unwrap();
        assert_eq!(catalog.crisis().unwrap().patterns, vec!["suicide"]);
    }

    #[test]
    fn test_missing_general_support_is_rejected() {
        let mut doc = minimal_catalog();
        doc["categories"].as_array_mut().unwrap().pop();

        let err = CategoryCatalog::from_json(&doc.to_string()).unwrap_err();
        assert!(matches!(err, AppError::Catalog(msg) if msg.contains("general_support")));
    }

    #[test]
    fn test_crisis_flag_on_other_category_is_rejected() {
        let mut doc = minimal_catalog();
        doc["categories"][1]["is_crisis"] = json!(true);

        assert!(CategoryCatalog::from_json(&doc.to_string()).is_err());
    }

    #[test]
    fn test_duplicate_category_is_rejected() {
        let mut doc = minimal_catalog();
        doc["categories"]
            .as_array_mut()
            .unwrap()
            .push(json!({"id": "general_support", "responses": ["Again"]}));

        assert!(CategoryCatalog::from_json(&doc.to_string()).is_err());
    }

    #[test]
    fn test_undefined_category_lookup_fails() {
        let catalog = CategoryCatalog::from_json(&minimal_catalog().to_string()).unwrap();
        let err = catalog.definition(Category::Spiritual).unwrap_err();
        assert!(matches!(err, AppError::UnknownCategory(id) if id == "spiritual"));
    }

    #[test]
    fn test_category_ids_round_trip_through_from_str() {
        for category in Category::ALL {
            assert_eq!(category.id().parse::<Category>().unwrap(), category);
        }
        assert!("nonsense".parse::<Category>().is_err());
    }
}
