//! Dashboard statistics derived from the item set and the study log.
//!
//! Review counts come from the study log, not from per-item counters: the log
//! keeps history for items that were later deleted and records every answer of
//! a drill, while item counters only remember the current streak.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::due::count_due;
use crate::model::{DEFAULT_EASE_FACTOR, ReviewItem, StudySession};
use crate::time::local_date;

/// Thresholds and constants used by [`calculate_statistics`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsConfig {
    /// Successful repetitions required before an item can count as mastered.
    pub mastery_repetitions: u32,
    /// A mastered item's ease factor must be strictly above this.
    pub mastery_ease_threshold: f64,
    /// Expected time spent per due item, used for the time estimate.
    pub seconds_per_item: u32,
    /// Learner's offset from UTC, used to decide calendar days for streaks.
    pub utc_offset_minutes: i32,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            mastery_repetitions: 3,
            mastery_ease_threshold: DEFAULT_EASE_FACTOR,
            seconds_per_item: 20,
            utc_offset_minutes: 0,
        }
    }
}

/// Summary metrics for dashboards. Recomputed on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyStatistics {
    pub total_reviews: u64,
    pub correct_reviews: u64,
    pub average_quality: f64,
    pub study_streak: u32,
    pub mastered_items: usize,
    pub items_to_review: usize,
    /// Estimated time to clear the due items, in seconds.
    pub estimated_time: u64,
    pub total_items: usize,
    pub new_items: usize,
}

impl StudyStatistics {
    /// Share of correct reviews in `[0, 1]`; zero when nothing was reviewed.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        if self.total_reviews == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let ratio = self.correct_reviews as f64 / self.total_reviews as f64;
        ratio
    }

    /// Time estimate rounded up to whole minutes.
    #[must_use]
    pub fn estimated_minutes(&self) -> u64 {
        self.estimated_time.div_ceil(60)
    }
}

/// Enough successful repetitions, and an ease that grew past the threshold.
#[must_use]
pub fn is_mastered(item: &ReviewItem, config: &StatisticsConfig) -> bool {
    item.repetitions() >= config.mastery_repetitions
        && item.ease_factor() > config.mastery_ease_threshold
}

/// Consecutive calendar days, counting back from today, with at least one
/// session. A day without a session (today included) ends the streak.
#[must_use]
pub fn study_streak(sessions: &[StudySession], now: DateTime<Utc>, utc_offset_minutes: i32) -> u32 {
    let days: HashSet<_> = sessions
        .iter()
        .map(|s| local_date(s.date(), utc_offset_minutes))
        .collect();

    let mut streak = 0_u32;
    let mut day = local_date(now, utc_offset_minutes);
    while days.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}

/// Aggregate the item set and the study log into dashboard metrics.
///
/// Linear in the number of items and sessions. Empty inputs give an all-zero
/// result.
#[must_use]
pub fn calculate_statistics(
    items: &[ReviewItem],
    sessions: &[StudySession],
    now: DateTime<Utc>,
    config: &StatisticsConfig,
) -> StudyStatistics {
    let items_to_review = count_due(items, now);
    let mastered_items = items.iter().filter(|item| is_mastered(item, config)).count();
    let new_items = items.iter().filter(|item| item.is_new()).count();

    let mut total_reviews = 0_u64;
    let mut correct_reviews = 0_u64;
    let mut quality_sum = 0.0_f64;
    for session in sessions {
        total_reviews += u64::from(session.items_studied());
        correct_reviews += u64::from(session.correct_answers());
        quality_sum += session.average_quality() * f64::from(session.items_studied());
    }

    let average_quality = if total_reviews == 0 {
        0.0
    } else {
        #[allow(clippy::cast_precision_loss)]
        let avg = quality_sum / total_reviews as f64;
        avg
    };

    let estimated_time = u64::try_from(items_to_review)
        .unwrap_or(u64::MAX)
        .saturating_mul(u64::from(config.seconds_per_item));

    StudyStatistics {
        total_reviews,
        correct_reviews,
        average_quality,
        study_streak: study_streak(sessions, now, config.utc_offset_minutes),
        mastered_items,
        items_to_review,
        estimated_time,
        total_items: items.len(),
        new_items,
    }
}
