//! Session Tests
//!
//! Log caps, crisis latching and reset, driven through the orchestrator so
//! every mutation path is covered.

use crate::brain::{BaselineEstimator, Category, CategoryCatalog, Language, Orchestrator, SelectorSettings};
use crate::clock::SteppingClock;
use crate::models::Role;
use crate::session::{CrisisState, SessionLimits, DEFAULT_MAX_MOOD_ENTRIES};
use chrono::{Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

fn orchestrator(limits: SessionLimits) -> Orchestrator {
    Orchestrator::new(
        Arc::new(CategoryCatalog::embedded(Language::English).unwrap()),
        Arc::new(BaselineEstimator),
        SelectorSettings::default(),
        limits,
    )
    .with_clock(Arc::new(SteppingClock::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        Duration::seconds(30),
    )))
}

const CHATTER: [&str; 5] = [
    "hello there",
    "I have an exam tomorrow",
    "I feel lonely",
    "I'm feeling really anxious",
    "nothing much",
];

#[test]
fn test_caps_hold_after_every_turn() {
    let limits = SessionLimits {
        max_messages: 7,
        max_mood_entries: 5,
        ..SessionLimits::default()
    };
    let orchestrator = orchestrator(limits);
    let mut session = orchestrator.new_session();
    let mut rng = StdRng::seed_from_u64(11);

    for turn in 0..40 {
        let text = CHATTER[turn % CHATTER.len()];
        orchestrator.process_turn(&mut session, text, &mut rng).unwrap();
        assert!(session.messages().len() <= 7);
        assert!(session.moods().len() <= 5);
    }

    // Most recent turn is kept: user message then reply.
    let last_user = &session.messages()[session.messages().len() - 2];
    assert_eq!(last_user.role, Role::User);
    assert_eq!(last_user.content, CHATTER[39 % CHATTER.len()]);
    assert_eq!(session.turns(), 40);
}

#[test]
fn test_mood_log_keeps_exactly_the_latest_entries() {
    let orchestrator = orchestrator(SessionLimits::default());
    let mut session = orchestrator.new_session();

    let recorded: Vec<_> = (0..130)
        .map(|i| {
            orchestrator.record_mood_entry(
                &mut session,
                (i % 5) + 1,
                5 - (i % 5),
                Category::GeneralSupport,
                false,
            )
        })
        .collect();

    assert_eq!(session.moods().len(), DEFAULT_MAX_MOOD_ENTRIES);
    let kept: Vec<_> = session.moods().iter().cloned().collect();
    assert_eq!(kept, recorded[30..].to_vec());
}

#[test]
fn test_crisis_flag_is_monotonic_until_reset() {
    let orchestrator = orchestrator(SessionLimits::default());
    let mut session = orchestrator.new_session();
    let mut rng = StdRng::seed_from_u64(99);

    orchestrator
        .process_turn(&mut session, "hello there", &mut rng)
        .unwrap();
    assert_eq!(session.crisis_state(), CrisisState::Normal);

    let reply = orchestrator
        .process_turn(&mut session, "I can't go on anymore", &mut rng)
        .unwrap();
    assert!(reply.crisis);

    for turn in 0..25 {
        let reply = orchestrator
            .process_turn(&mut session, CHATTER[turn % CHATTER.len()], &mut rng)
            .unwrap();
        assert!(!reply.crisis);
        assert!(reply.session_crisis);
        orchestrator.help_now(&mut session);
        orchestrator.record_mood_entry(&mut session, 5, 1, Category::Greetings, false);
        assert_eq!(session.crisis_state(), CrisisState::Crisis);
    }

    orchestrator.reset_session(&mut session);
    assert_eq!(session.crisis_state(), CrisisState::Normal);
}

#[test]
fn test_reset_starts_over_with_welcome() {
    let orchestrator = orchestrator(SessionLimits::default());
    let mut session = orchestrator.new_session();
    let mut rng = StdRng::seed_from_u64(5);

    for text in CHATTER {
        orchestrator.process_turn(&mut session, text, &mut rng).unwrap();
    }
    orchestrator.reset_session(&mut session);

    assert_eq!(session.messages().len(), 1);
    assert_eq!(
        session.messages()[0].content,
        orchestrator.catalog().texts().welcome
    );
    assert!(session.moods().is_empty());
    assert!(session.context().is_empty());
    assert_eq!(session.turns(), 0);
}

#[test]
fn test_timestamps_follow_the_clock() {
    let orchestrator = orchestrator(SessionLimits::default());
    let mut session = orchestrator.new_session();
    let mut rng = StdRng::seed_from_u64(5);

    orchestrator
        .process_turn(&mut session, "hello there", &mut rng)
        .unwrap();

    let stamps: Vec<_> = session.messages().iter().map(|m| m.timestamp).collect();
    assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(session.moods()[0].timestamp, session.messages()[1].timestamp);
}
