//! Integration Tests
//!
//! Whole conversations through the orchestrator: trend-driven overrides,
//! crisis handling and snapshot export.

use crate::brain::{
    compute_trends, BaselineEstimator, Category, CategoryCatalog, ClassificationCache, Language,
    Orchestrator, SelectionReason, SelectorSettings, SessionSnapshot, Trend,
};
use crate::config::BuddyConfig;
use rand::rngs::mock::StepRng;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

fn orchestrator(language: Language) -> Orchestrator {
    let config = BuddyConfig {
        language,
        ..BuddyConfig::default()
    };
    Orchestrator::new(
        Arc::new(CategoryCatalog::embedded(config.language).unwrap()),
        Arc::new(BaselineEstimator),
        config.selector_settings(),
        config.session_limits(),
    )
}

#[test]
fn test_rising_stress_triggers_coping_prompt() {
    let orchestrator = orchestrator(Language::English);
    let mut session = orchestrator.new_session();
    let mut rng = StdRng::seed_from_u64(8);

    for _ in 0..10 {
        orchestrator.record_mood_entry(&mut session, 3, 1, Category::GeneralSupport, false);
    }

    // Anxiety baseline (2, 4): recent stress mean 1.3 against 1.0.
    let reply = orchestrator
        .process_turn(&mut session, "I'm feeling really anxious", &mut rng)
        .unwrap();

    assert_eq!(reply.trends.stress_trend, Trend::Worsening);
    assert_eq!(reply.trends.stress_delta, 0.3);
    assert_eq!(reply.reason, SelectionReason::CopingOverride);
    assert_eq!(reply.text, orchestrator.catalog().texts().coping_prompt);
}

#[test]
fn test_falling_mood_triggers_check_in() {
    let orchestrator = orchestrator(Language::English);
    let mut session = orchestrator.new_session();
    let mut rng = StdRng::seed_from_u64(8);

    for _ in 0..10 {
        orchestrator.record_mood_entry(&mut session, 5, 3, Category::GeneralSupport, false);
    }

    // Loneliness baseline (2, 3): recent mood mean 4.7 against 5.0.
    let reply = orchestrator
        .process_turn(&mut session, "I feel lonely", &mut rng)
        .unwrap();

    assert_eq!(reply.trends.mood_trend, Trend::Declining);
    assert_eq!(reply.trends.stress_trend, Trend::Stable);
    assert_eq!(reply.reason, SelectionReason::CheckInOverride);
    assert_eq!(reply.text, orchestrator.catalog().texts().check_in);
}

#[test]
fn test_crisis_bypasses_overrides() {
    let orchestrator = orchestrator(Language::English);
    let mut session = orchestrator.new_session();
    let mut rng = StepRng::new(0, 0);

    for _ in 0..10 {
        orchestrator.record_mood_entry(&mut session, 5, 1, Category::GeneralSupport, false);
    }

    let reply = orchestrator
        .process_turn(&mut session, "I want to die", &mut rng)
        .unwrap();

    let crisis = orchestrator.catalog().crisis().unwrap();
    assert_eq!(reply.reason, SelectionReason::Crisis);
    assert_eq!(reply.text, crisis.responses[0]);
    assert!(reply.resources.is_some());
    assert!(reply.full_text().ends_with(&orchestrator.catalog().texts().crisis_resources));
}

#[test]
fn test_french_conversation() {
    let orchestrator = orchestrator(Language::French);
    let mut session = orchestrator.new_session();
    let mut rng = StdRng::seed_from_u64(21);

    let greeting = orchestrator
        .process_turn(&mut session, "Bonjour", &mut rng)
        .unwrap();
    assert_eq!(greeting.category, Category::Greetings);

    let crisis = orchestrator
        .process_turn(&mut session, "J'ai envie d'en finir", &mut rng)
        .unwrap();
    assert!(crisis.crisis);
    assert!(crisis.session_crisis);
}

#[test]
fn test_shared_cache_serves_repeated_messages() {
    let cache = Arc::new(ClassificationCache::new(16));
    let orchestrator = orchestrator(Language::English).with_cache(cache.clone());
    let mut first = orchestrator.new_session();
    let mut second = orchestrator.new_session();
    let mut rng = StdRng::seed_from_u64(4);

    let a = orchestrator
        .process_turn(&mut first, "I have an exam tomorrow", &mut rng)
        .unwrap();
    let b = orchestrator
        .process_turn(&mut second, "  I HAVE AN EXAM TOMORROW ", &mut rng)
        .unwrap();

    assert_eq!(a.category, b.category);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_snapshot_serializes_for_export() {
    let orchestrator = orchestrator(Language::English);
    let mut session = orchestrator.new_session();
    let mut rng = StdRng::seed_from_u64(6);

    for text in ["hello there", "I'm worried about money", "I can't go on"] {
        orchestrator.process_turn(&mut session, text, &mut rng).unwrap();
    }

    let snapshot = orchestrator.snapshot("export-test", &session);
    let value = serde_json::to_value(&snapshot).unwrap();

    assert_eq!(value["session_id"], "export-test");
    assert_eq!(value["crisis"], "crisis");
    assert_eq!(value["moods"].as_array().unwrap().len(), 3);
    assert_eq!(value["moods"][1]["category"], "financial_stress");
    assert_eq!(value["messages"][0]["role"], "assistant");

    let restored: SessionSnapshot = serde_json::from_value(value).unwrap();
    assert_eq!(restored, snapshot);
}

#[test]
fn test_imported_snapshot_scores_stay_in_range() {
    let orchestrator = orchestrator(Language::English);
    let mut session = orchestrator.new_session();
    orchestrator.record_mood_entry(&mut session, 1, 5, Category::GeneralSupport, false);
    orchestrator.record_mood_entry(&mut session, 1, 5, Category::GeneralSupport, false);

    let mut value = serde_json::to_value(orchestrator.snapshot("import", &session)).unwrap();
    value["moods"][1]["mood"] = serde_json::json!(9);
    value["moods"][1]["stress"] = serde_json::json!(0);

    let restored: SessionSnapshot = serde_json::from_value(value).unwrap();
    let last = &restored.moods[1];
    assert_eq!((last.mood(), last.stress()), (5, 1));

    let trends = compute_trends(&restored.moods);
    assert_eq!(trends.mood_delta, 4.0);
    assert_eq!(trends.stress_delta, -4.0);
}

#[test]
fn test_follow_up_is_appended_with_blank_line() {
    let orchestrator = Orchestrator::new(
        Arc::new(CategoryCatalog::embedded(Language::English).unwrap()),
        Arc::new(BaselineEstimator),
        SelectorSettings::default(),
        Default::default(),
    );
    let mut session = orchestrator.new_session();
    // StepRng(0, 0) always takes the first candidate and always passes gen_bool.
    let mut rng = StepRng::new(0, 0);

    let reply = orchestrator
        .process_turn(&mut session, "hello there", &mut rng)
        .unwrap();

    let greetings = orchestrator.catalog().definition(Category::Greetings).unwrap();
    let expected = format!("{}\n\n{}", greetings.responses[0], greetings.follow_ups[0]);
    assert_eq!(reply.text, expected);
    assert_eq!(session.context().last(1).next(), Some(greetings.responses[0].as_str()));
}
