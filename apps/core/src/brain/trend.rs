//! Mood and stress trend analysis.
//!
//! Compares the average of the most recent entries against the average of
//! everything before them. The classification is computed with exact integer
//! arithmetic, so a difference of exactly 0.2 is always `Stable`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::MoodEntry;

/// Maximum number of entries in the recent window.
pub const RECENT_WINDOW: usize = 10;

/// Direction of a mood or stress series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    /// Mood going up, or stress going down
    Improving,
    /// Mood going down
    Declining,
    /// Stress going up
    Worsening,
    #[default]
    Stable,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Trend::Improving => "improving",
            Trend::Declining => "declining",
            Trend::Worsening => "worsening",
            Trend::Stable => "stable",
        };
        write!(f, "{}", label)
    }
}

/// Trend labels plus the deltas they were derived from.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrendSummary {
    pub mood_trend: Trend,
    pub stress_trend: Trend,
    /// Recent minus older mean mood, rounded to 2 decimals
    pub mood_delta: f64,
    /// Recent minus older mean stress, rounded to 2 decimals
    pub stress_delta: f64,
}

/// Running sums for one window.
#[derive(Default)]
struct WindowSums {
    mood: i64,
    stress: i64,
    count: i64,
}

impl WindowSums {
    fn of<'a>(entries: impl Iterator<Item = &'a MoodEntry>) -> Self {
        entries.fold(Self::default(), |mut acc, e| {
            acc.mood += e.mood() as i64;
            acc.stress += e.stress() as i64;
            acc.count += 1;
            acc
        })
    }
}

/// Sign of `(recent_sum / recent_n - older_sum / older_n)` compared to ±0.2.
///
/// Returns 1 above +0.2, -1 below -0.2, 0 inside the inclusive band.
fn threshold_side(recent_sum: i64, recent_n: i64, older_sum: i64, older_n: i64) -> i8 {
    // delta = (rs*on - os*rn) / (rn*on); delta > 1/5  <=>  5*(rs*on - os*rn) > rn*on
    let scaled = 5 * (recent_sum * older_n - older_sum * recent_n);
    let bound = recent_n * older_n;
    if scaled > bound {
        1
    } else if scaled < -bound {
        -1
    } else {
        0
    }
}

fn mean_delta(recent_sum: i64, recent_n: i64, older_sum: i64, older_n: i64) -> f64 {
    let delta = recent_sum as f64 / recent_n as f64 - older_sum as f64 / older_n as f64;
    (delta * 100.0).round() / 100.0
}

/// Compute trends over a chronologically ordered history
pub fn compute_trends<'a>(history: impl IntoIterator<Item = &'a MoodEntry>) -> TrendSummary {
    let entries: Vec<&MoodEntry> = history.into_iter().collect();
    let len = entries.len();
    if len < 2 {
        return TrendSummary::default();
    }

    let recent_len = RECENT_WINDOW.min(len - 1);
    let (older, recent) = entries.split_at(len - recent_len);
    let older = WindowSums::of(older.iter().copied());
    let recent = WindowSums::of(recent.iter().copied());

    let mood_trend = match threshold_side(recent.mood, recent.count, older.mood, older.count) {
        1 => Trend::Improving,
        -1 => Trend::Declining,
        _ => Trend::Stable,
    };
    let stress_trend = match threshold_side(recent.stress, recent.count, older.stress, older.count)
    {
        1 => Trend::Worsening,
        -1 => Trend::Improving,
        _ => Trend::Stable,
    };

    TrendSummary {
        mood_trend,
        stress_trend,
        mood_delta: mean_delta(recent.mood, recent.count, older.mood, older.count),
        stress_delta: mean_delta(recent.stress, recent.count, older.stress, older.count),
    }
}
