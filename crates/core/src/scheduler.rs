use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    DEFAULT_EASE_FACTOR, FlashcardRating, ItemId, MIN_EASE_FACTOR, Quality, ReviewItem,
};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SchedulerError {
    #[error("minimum ease factor must be finite and at least 1.3, got {provided}")]
    InvalidMinimumEase { provided: f64 },
    #[error("initial ease factor {initial} must be finite and at least the minimum {minimum}")]
    InvalidInitialEase { initial: f64, minimum: f64 },
    #[error("maximum interval must be at least 1 day")]
    InvalidMaximumInterval,
}

//
// ─── CONFIG ────────────────────────────────────────────────────────────────────
//

/// Tunable constants of the scheduling algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Ease factor given to newly created items.
    pub initial_ease_factor: f64,
    /// Ease factor floor. Cannot be set below 1.3.
    pub minimum_ease_factor: f64,
    /// Upper bound for any interval, in days.
    pub maximum_interval_days: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_ease_factor: DEFAULT_EASE_FACTOR,
            minimum_ease_factor: MIN_EASE_FACTOR,
            maximum_interval_days: 36_500,
        }
    }
}

impl SchedulerConfig {
    /// Check the configuration without building a scheduler.
    ///
    /// # Errors
    ///
    /// Returns the first `SchedulerError` describing an invalid field.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if !self.minimum_ease_factor.is_finite() || self.minimum_ease_factor < MIN_EASE_FACTOR {
            return Err(SchedulerError::InvalidMinimumEase {
                provided: self.minimum_ease_factor,
            });
        }
        if !self.initial_ease_factor.is_finite()
            || self.initial_ease_factor < self.minimum_ease_factor
        {
            return Err(SchedulerError::InvalidInitialEase {
                initial: self.initial_ease_factor,
                minimum: self.minimum_ease_factor,
            });
        }
        if self.maximum_interval_days == 0 {
            return Err(SchedulerError::InvalidMaximumInterval);
        }
        Ok(())
    }
}

//
// ─── PREVIEW ───────────────────────────────────────────────────────────────────
//

/// Interval (in days) each flashcard button would schedule.
///
/// Used to label answer buttons before the learner picks one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalPreview {
    pub wrong: u32,
    pub hard: u32,
    pub good: u32,
    pub easy: u32,
}

impl IntervalPreview {
    #[must_use]
    pub fn select(&self, rating: FlashcardRating) -> u32 {
        match rating {
            FlashcardRating::Wrong => self.wrong,
            FlashcardRating::Hard => self.hard,
            FlashcardRating::Good => self.good,
            FlashcardRating::Easy => self.easy,
        }
    }
}

//
// ─── SCHEDULER ─────────────────────────────────────────────────────────────────
//

/// SM-2 style scheduler.
///
/// Every call is pure: the input item is left untouched and a new item is
/// returned.
///
/// # Examples
///
/// ```
/// # use vocab_core::scheduler::Scheduler;
/// # use vocab_core::model::{ItemId, Quality};
/// # use vocab_core::time::fixed_now;
/// let scheduler = Scheduler::new();
/// let now = fixed_now();
/// let item = scheduler.create_item(ItemId::new("gato")?, "gato", "cat", now);
///
/// let reviewed = scheduler.schedule(&item, Quality::MAX, now);
/// assert_eq!(reviewed.interval_days(), 1);
/// assert_eq!(reviewed.repetitions(), 1);
/// # Ok::<(), vocab_core::model::ItemIdError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scheduler {
    config: SchedulerConfig,
}

impl Scheduler {
    /// Create scheduler with the classic SM-2 constants.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create scheduler with custom constants.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError` if the configuration is invalid.
    pub fn try_with_config(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Review item factory honouring the configured initial ease factor.
    #[must_use]
    pub fn create_item(
        &self,
        id: ItemId,
        term: impl Into<String>,
        definition: impl Into<String>,
        now: DateTime<Utc>,
    ) -> ReviewItem {
        ReviewItem::with_ease_factor(id, term, definition, self.config.initial_ease_factor, now)
    }

    /// Compute the state after answering `item` with `quality` at `reviewed_at`.
    ///
    /// - quality < 3 is a lapse: repetitions reset, interval becomes 1 day.
    /// - otherwise the interval goes 1 → 6 → previous × ease factor.
    /// - the ease factor moves by the SM-2 delta in both cases and never drops
    ///   below the configured minimum.
    #[must_use]
    pub fn schedule(
        &self,
        item: &ReviewItem,
        quality: Quality,
        reviewed_at: DateTime<Utc>,
    ) -> ReviewItem {
        let max_interval = self.config.maximum_interval_days;

        let (interval_days, repetitions, lapses) = if quality.is_lapse() {
            (1, 0, item.lapses().saturating_add(1))
        } else {
            let interval = match item.repetitions() {
                0 => 1,
                1 => 6,
                _ => grow_interval(item.interval_days(), item.ease_factor()),
            };
            (
                // A malformed record with repetitions >= 2 and interval 0 would
                // otherwise stay due forever.
                interval.max(1),
                item.repetitions().saturating_add(1),
                item.lapses(),
            )
        };

        let ease_factor = self.next_ease_factor(item.ease_factor(), quality);

        item.after_review(
            ease_factor,
            interval_days.min(max_interval),
            repetitions,
            lapses,
            reviewed_at,
        )
    }

    /// Intervals each flashcard rating would produce for `item` right now.
    #[must_use]
    pub fn preview(&self, item: &ReviewItem, now: DateTime<Utc>) -> IntervalPreview {
        let interval = |rating: FlashcardRating| {
            self.schedule(item, rating.quality(), now).interval_days()
        };
        IntervalPreview {
            wrong: interval(FlashcardRating::Wrong),
            hard: interval(FlashcardRating::Hard),
            good: interval(FlashcardRating::Good),
            easy: interval(FlashcardRating::Easy),
        }
    }

    fn next_ease_factor(&self, current: f64, quality: Quality) -> f64 {
        let miss = 5.0 - f64::from(quality.value());
        let delta = 0.1 - miss * (0.08 + miss * 0.02);
        (current + delta).max(self.config.minimum_ease_factor)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn grow_interval(interval_days: u32, ease_factor: f64) -> u32 {
    let grown = (f64::from(interval_days) * ease_factor).round();
    if grown >= f64::from(u32::MAX) {
        u32::MAX
    } else if grown <= 0.0 {
        0
    } else {
        grown as u32
    }
}

/// Schedule a review with the default constants.
///
/// Equivalent to `Scheduler::new().schedule(item, quality, now)`.
#[must_use]
pub fn calculate_next_review(item: &ReviewItem, quality: Quality, now: DateTime<Utc>) -> ReviewItem {
    Scheduler::new().schedule(item, quality, now)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn fresh() -> ReviewItem {
        ReviewItem::new(ItemId::new("casa").unwrap(), "casa", "house", fixed_now())
    }

    fn item_with(ease: f64, interval: u32, reps: u32, lapses: u32) -> ReviewItem {
        ReviewItem::from_persisted(
            ItemId::new("perro").unwrap(),
            "perro".into(),
            "dog".into(),
            ease,
            interval,
            reps,
            lapses,
            fixed_now() - Duration::days(60),
            Some(fixed_now() - Duration::days(i64::from(interval))),
        )
    }

    fn all_qualities() -> impl Iterator<Item = Quality> {
        (0..=5).map(Quality::clamped)
    }

    #[test]
    fn first_success_schedules_one_day() {
        let now = fixed_now();
        let next = calculate_next_review(&fresh(), Quality::MAX, now);

        assert_eq!(next.repetitions(), 1);
        assert_eq!(next.interval_days(), 1);
        assert_eq!(next.last_reviewed(), Some(now));
        assert_eq!(next.next_review(), now + Duration::days(1));
    }

    #[test]
    fn second_success_schedules_six_days() {
        let now = fixed_now();
        let first = calculate_next_review(&fresh(), Quality::MAX, now);
        let second = calculate_next_review(&first, Quality::clamped(4), now + Duration::days(1));

        assert_eq!(second.repetitions(), 2);
        assert_eq!(second.interval_days(), 6);
    }

    #[test]
    fn third_success_multiplies_by_ease() {
        let now = fixed_now();
        let first = calculate_next_review(&fresh(), Quality::MAX, now);
        let second = calculate_next_review(&first, Quality::clamped(4), now + Duration::days(1));
        let third = calculate_next_review(&second, Quality::MAX, now + Duration::days(7));

        assert_eq!(third.repetitions(), 3);
        // 6 × 2.6 = 15.6 (6 × 2.7 = 16.2 rounds the same way)
        assert_eq!(third.interval_days(), 16);
        assert!(third.ease_factor() >= second.ease_factor());
    }

    #[test]
    fn lapse_resets_streak() {
        let item = item_with(2.5, 20, 4, 0);
        let next = calculate_next_review(&item, Quality::clamped(1), fixed_now());

        assert_eq!(next.repetitions(), 0);
        assert_eq!(next.interval_days(), 1);
        assert_eq!(next.lapses(), 1);
        assert!(next.ease_factor() < item.ease_factor());
        assert!(next.ease_factor() >= MIN_EASE_FACTOR);
    }

    #[test]
    fn every_lapse_quality_resets() {
        for q in (0..3).map(Quality::clamped) {
            for item in [fresh(), item_with(1.3, 0, 0, 7), item_with(2.9, 120, 9, 2)] {
                let next = calculate_next_review(&item, q, fixed_now());
                assert_eq!(next.repetitions(), 0);
                assert_eq!(next.interval_days(), 1);
                assert_eq!(next.lapses(), item.lapses() + 1);
            }
        }
    }

    #[test]
    fn ease_never_drops_below_floor() {
        let states = [
            fresh(),
            item_with(1.3, 1, 0, 3),
            item_with(1.31, 6, 1, 0),
            item_with(2.5, 40, 5, 1),
            item_with(3.8, 400, 12, 0),
        ];
        for item in &states {
            for q in all_qualities() {
                let next = calculate_next_review(item, q, fixed_now());
                assert!(next.ease_factor() >= MIN_EASE_FACTOR, "q={q} item={item:?}");
            }
        }
    }

    #[test]
    fn all_wrong_streak_pins_ease_to_floor() {
        let mut item = fresh();
        let mut now = fixed_now();
        for _ in 0..20 {
            item = calculate_next_review(&item, Quality::MIN, now);
            now += Duration::days(1);
        }
        assert!((item.ease_factor() - MIN_EASE_FACTOR).abs() < 1e-9);
        assert_eq!(item.lapses(), 20);
        assert_eq!(item.interval_days(), 1);
    }

    #[test]
    fn perfect_answers_never_shrink_interval() {
        for start in [item_with(1.3, 1, 2, 0), item_with(2.5, 6, 2, 0), item_with(2.0, 33, 7, 4)] {
            let mut item = start;
            let mut now = fixed_now();
            for _ in 0..25 {
                let next = calculate_next_review(&item, Quality::MAX, now);
                assert!(next.interval_days() >= item.interval_days());
                now += Duration::days(i64::from(next.interval_days().min(3650)));
                item = next;
            }
        }
    }

    #[test]
    fn intervals_are_capped() {
        let scheduler = Scheduler::new();
        let item = item_with(2.5, 30_000, 10, 0);
        let next = scheduler.schedule(&item, Quality::MAX, fixed_now());
        assert_eq!(next.interval_days(), scheduler.config().maximum_interval_days);

        let again = scheduler.schedule(&next, Quality::MAX, fixed_now());
        assert_eq!(again.interval_days(), next.interval_days());
    }

    #[test]
    fn success_after_malformed_zero_interval_is_at_least_one_day() {
        let item = item_with(2.5, 0, 3, 0);
        let next = calculate_next_review(&item, Quality::clamped(4), fixed_now());
        assert_eq!(next.interval_days(), 1);
    }

    #[test]
    fn input_item_is_not_modified() {
        let item = fresh();
        let snapshot = item.clone();
        let _ = calculate_next_review(&item, Quality::MIN, fixed_now());
        assert_eq!(item, snapshot);
    }

    #[test]
    fn ease_delta_matches_sm2_table() {
        let expected = [
            (0, -0.8),
            (1, -0.54),
            (2, -0.32),
            (3, -0.14),
            (4, 0.0),
            (5, 0.1),
        ];
        let base = item_with(2.5, 6, 2, 0);
        for (q, delta) in expected {
            let next = calculate_next_review(&base, Quality::clamped(q), fixed_now());
            let want = (2.5_f64 + delta).max(MIN_EASE_FACTOR);
            assert!((next.ease_factor() - want).abs() < 1e-9, "q={q}");
        }
    }

    #[test]
    fn preview_is_monotonic_in_rating() {
        let scheduler = Scheduler::new();
        for item in [fresh(), item_with(2.5, 6, 2, 0), item_with(1.7, 25, 4, 3)] {
            let p = scheduler.preview(&item, fixed_now());
            assert_eq!(p.wrong, 1);
            assert!(p.hard <= p.good);
            assert!(p.good <= p.easy);
            assert_eq!(p.select(FlashcardRating::Good), p.good);
        }
    }

    #[test]
    fn create_item_uses_configured_ease() {
        let scheduler = Scheduler::try_with_config(SchedulerConfig {
            initial_ease_factor: 2.8,
            ..SchedulerConfig::default()
        })
        .unwrap();
        let item = scheduler.create_item(ItemId::new("x").unwrap(), "x", "y", fixed_now());
        assert_eq!(item.ease_factor(), 2.8);
    }

    #[test]
    fn try_with_config_rejects_invalid_values() {
        assert!(matches!(
            Scheduler::try_with_config(SchedulerConfig {
                minimum_ease_factor: 1.0,
                ..SchedulerConfig::default()
            }),
            Err(SchedulerError::InvalidMinimumEase { .. })
        ));
        assert!(matches!(
            Scheduler::try_with_config(SchedulerConfig {
                initial_ease_factor: 1.4,
                minimum_ease_factor: 1.5,
                ..SchedulerConfig::default()
            }),
            Err(SchedulerError::InvalidInitialEase { .. })
        ));
        assert!(matches!(
            Scheduler::try_with_config(SchedulerConfig {
                maximum_interval_days: 0,
                ..SchedulerConfig::default()
            }),
            Err(SchedulerError::InvalidMaximumInterval)
        ));
    }

    #[test]
    fn raised_floor_is_respected() {
        let scheduler = Scheduler::try_with_config(SchedulerConfig {
            minimum_ease_factor: 1.8,
            ..SchedulerConfig::default()
        })
        .unwrap();
        let next = scheduler.schedule(&item_with(1.9, 10, 3, 0), Quality::MIN, fixed_now());
        assert!((next.ease_factor() - 1.8).abs() < 1e-9);
    }
}
