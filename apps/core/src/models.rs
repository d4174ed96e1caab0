use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::brain::catalog::Category;

/// Lowest score on the mood and stress scales.
pub const SCORE_MIN: u8 = 1;
/// Highest score on the mood and stress scales.
pub const SCORE_MAX: u8 = 5;

/// Clamps any integer into the 1..=5 score scale.
pub fn clamp_score(value: i32) -> u8 {
    value.clamp(SCORE_MIN as i32, SCORE_MAX as i32) as u8
}

/// The author of a message within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Represents a single message within a chat session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender.
    pub role: Role,
    /// The text content of the message.
    pub content: String,
    /// When the message was created.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp,
        }
    }

    pub fn assistant(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp,
        }
    }
}

/// A mood/stress estimate for one turn. Both scores are always within 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawScores")]
pub struct MoodReading {
    mood: u8,
    stress: u8,
}

impl MoodReading {
    /// Builds a reading, clamping both scores into range.
    pub fn new(mood: i32, stress: i32) -> Self {
        Self {
            mood: clamp_score(mood),
            stress: clamp_score(stress),
        }
    }

    pub fn mood(&self) -> u8 {
        self.mood
    }

    pub fn stress(&self) -> u8 {
        self.stress
    }
}

/// Scores as they arrive from outside, before clamping.
#[derive(Deserialize)]
struct RawScores {
    mood: i32,
    stress: i32,
}

impl From<RawScores> for MoodReading {
    fn from(raw: RawScores) -> Self {
        MoodReading::new(raw.mood, raw.stress)
    }
}

/// One point of the mood/stress time series.
///
/// Scores are only reachable through `MoodReading`, so deserialized entries
/// are clamped like computed ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawMoodEntry")]
pub struct MoodEntry {
    pub timestamp: DateTime<Utc>,
    mood: u8,
    stress: u8,
    pub category: Category,
    pub crisis: bool,
}

#[derive(Deserialize)]
struct RawMoodEntry {
    timestamp: DateTime<Utc>,
    mood: i32,
    stress: i32,
    category: Category,
    crisis: bool,
}

impl From<RawMoodEntry> for MoodEntry {
    fn from(raw: RawMoodEntry) -> Self {
        MoodEntry::new(
            raw.timestamp,
            MoodReading::new(raw.mood, raw.stress),
            raw.category,
            raw.crisis,
        )
    }
}

impl MoodEntry {
    pub fn new(
        timestamp: DateTime<Utc>,
        reading: MoodReading,
        category: Category,
        crisis: bool,
    ) -> Self {
        Self {
            timestamp,
            mood: reading.mood(),
            stress: reading.stress(),
            category,
            crisis,
        }
    }

    pub fn mood(&self) -> u8 {
        self.mood
    }

    pub fn stress(&self) -> u8 {
        self.stress
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_clamps_both_scores() {
        let low = MoodReading::new(-3, 0);
        assert_eq!((low.mood(), low.stress()), (1, 1));

        let high = MoodReading::new(9, 6);
        assert_eq!((high.mood(), high.stress()), (5, 5));

        let mid = MoodReading::new(3, 4);
        assert_eq!((mid.mood(), mid.stress()), (3, 4));
    }

    #[test]
    fn test_out_of_range_json_is_clamped() {
        let entry: MoodEntry = serde_json::from_str(
            r#"{"timestamp":"2024-03-01T09:00:00Z","mood":9,"stress":0,"category":"anxiety","crisis":false}"#,
        )
        .unwrap();
        assert_eq!((entry.mood(), entry.stress()), (5, 1));

        let reading: MoodReading = serde_json::from_str(r#"{"mood":-4,"stress":12}"#).unwrap();
        assert_eq!((reading.mood(), reading.stress()), (1, 5));
    }

    #[test]
    fn test_entry_round_trips_through_json() {
        let entry = MoodEntry::new(
            "2024-03-01T09:00:00Z".parse().unwrap(),
            MoodReading::new(2, 4),
            Category::Anxiety,
            true,
        );
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(serde_json::from_str::<MoodEntry>(&json).unwrap(), entry);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }
}
