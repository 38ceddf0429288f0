use chrono::{DateTime, Duration, Utc};

use crate::model::ids::ItemId;

/// Ease factor assigned to newly learned items.
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// Floor for the ease factor; intervals never shrink faster than this allows.
pub const MIN_EASE_FACTOR: f64 = 1.3;

//
// ─── REVIEW ITEM ───────────────────────────────────────────────────────────────
//

/// Scheduling state for a single learnable term.
///
/// Values are immutable: the scheduler returns a new item for every recorded
/// answer. The next review date is derived from `last_reviewed` and
/// `interval_days`, so it can never disagree with them.
///
/// # Examples
///
/// ```
/// # use vocab_core::model::{ItemId, ReviewItem};
/// # use vocab_core::time::fixed_now;
/// let item = ReviewItem::new(ItemId::new("apple")?, "apple", "リンゴ", fixed_now());
/// assert!(item.is_new());
/// assert!(item.is_due(fixed_now()));
/// # Ok::<(), vocab_core::model::ItemIdError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewItem {
    id: ItemId,
    term: String,
    definition: String,
    ease_factor: f64,
    interval_days: u32,
    repetitions: u32,
    lapses: u32,
    created_at: DateTime<Utc>,
    last_reviewed: Option<DateTime<Utc>>,
}

impl ReviewItem {
    /// Creates the initial scheduling state for a newly learned term.
    ///
    /// The item is due immediately.
    #[must_use]
    pub fn new(
        id: ItemId,
        term: impl Into<String>,
        definition: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self::with_ease_factor(id, term, definition, DEFAULT_EASE_FACTOR, now)
    }

    /// Like [`ReviewItem::new`] but with a custom starting ease factor.
    ///
    /// Values below [`MIN_EASE_FACTOR`] (or non-finite) fall back to the floor
    /// or the default respectively.
    #[must_use]
    pub fn with_ease_factor(
        id: ItemId,
        term: impl Into<String>,
        definition: impl Into<String>,
        ease_factor: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            term: term.into(),
            definition: definition.into(),
            ease_factor: normalize_ease(ease_factor),
            interval_days: 0,
            repetitions: 0,
            lapses: 0,
            created_at: now,
            last_reviewed: None,
        }
    }

    /// Rehydrate an item from persisted storage.
    ///
    /// Never fails: an out-of-range ease factor is raised to the floor and a
    /// non-finite one is replaced with the default.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn from_persisted(
        id: ItemId,
        term: String,
        definition: String,
        ease_factor: f64,
        interval_days: u32,
        repetitions: u32,
        lapses: u32,
        created_at: DateTime<Utc>,
        last_reviewed: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            term,
            definition,
            ease_factor: normalize_ease(ease_factor),
            interval_days,
            repetitions,
            lapses,
            created_at,
            last_reviewed,
        }
    }

    /// Produce the state after a review. Only the scheduler calls this.
    pub(crate) fn after_review(
        &self,
        ease_factor: f64,
        interval_days: u32,
        repetitions: u32,
        lapses: u32,
        reviewed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: self.id.clone(),
            term: self.term.clone(),
            definition: self.definition.clone(),
            ease_factor: normalize_ease(ease_factor),
            interval_days,
            repetitions,
            lapses,
            created_at: self.created_at,
            last_reviewed: Some(reviewed_at),
        }
    }

    #[must_use]
    pub fn id(&self) -> &ItemId {
        &self.id
    }

    #[must_use]
    pub fn term(&self) -> &str {
        &self.term
    }

    #[must_use]
    pub fn definition(&self) -> &str {
        &self.definition
    }

    #[must_use]
    pub fn ease_factor(&self) -> f64 {
        self.ease_factor
    }

    #[must_use]
    pub fn interval_days(&self) -> u32 {
        self.interval_days
    }

    #[must_use]
    pub fn repetitions(&self) -> u32 {
        self.repetitions
    }

    #[must_use]
    pub fn lapses(&self) -> u32 {
        self.lapses
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn last_reviewed(&self) -> Option<DateTime<Utc>> {
        self.last_reviewed
    }

    /// When the item should be shown next.
    ///
    /// Never-reviewed items report their creation time, which makes them due
    /// from the moment they exist.
    #[must_use]
    pub fn next_review(&self) -> DateTime<Utc> {
        match self.last_reviewed {
            Some(last) => last
                .checked_add_signed(Duration::days(i64::from(self.interval_days)))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            None => self.created_at,
        }
    }

    #[must_use]
    pub fn is_new(&self) -> bool {
        self.last_reviewed.is_none()
    }

    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_new() || self.next_review() <= now
    }

    /// Replace the display strings, keeping the schedule.
    #[must_use]
    pub fn with_content(&self, term: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            definition: definition.into(),
            ..self.clone()
        }
    }
}

/// Creates a fresh review item that is due now.
///
/// Callers own duplicate prevention: calling this twice for the same id and
/// keeping both results produces duplicate entries.
#[must_use]
pub fn create_review_item(
    id: ItemId,
    term: impl Into<String>,
    definition: impl Into<String>,
    now: DateTime<Utc>,
) -> ReviewItem {
    ReviewItem::new(id, term, definition, now)
}

fn normalize_ease(ease_factor: f64) -> f64 {
    if ease_factor.is_finite() {
        ease_factor.max(MIN_EASE_FACTOR)
    } else {
        DEFAULT_EASE_FACTOR
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn id(raw: &str) -> ItemId {
        ItemId::new(raw).unwrap()
    }

    #[test]
    fn factory_sets_initial_state() {
        let now = fixed_now();
        let item = create_review_item(id("a"), "hund", "dog", now);

        assert_eq!(item.ease_factor(), DEFAULT_EASE_FACTOR);
        assert_eq!(item.interval_days(), 0);
        assert_eq!(item.repetitions(), 0);
        assert_eq!(item.lapses(), 0);
        assert_eq!(item.last_reviewed(), None);
        assert_eq!(item.next_review(), now);
        assert!(item.is_due(now));
    }

    #[test]
    fn new_items_stay_due_later() {
        let now = fixed_now();
        let item = create_review_item(id("a"), "hund", "dog", now);
        assert!(item.is_due(now + Duration::days(30)));
    }

    #[test]
    fn next_review_is_derived_from_last_review_and_interval() {
        let now = fixed_now();
        let item = ReviewItem::from_persisted(
            id("a"),
            "katze".into(),
            "cat".into(),
            2.5,
            6,
            2,
            0,
            now - Duration::days(10),
            Some(now),
        );
        assert_eq!(item.next_review(), now + Duration::days(6));
        assert!(!item.is_due(now + Duration::days(5)));
        assert!(item.is_due(now + Duration::days(6)));
    }

    #[test]
    fn persisted_ease_is_normalized() {
        let now = fixed_now();
        let low = ReviewItem::from_persisted(
            id("a"), "x".into(), "y".into(), 0.4, 0, 0, 0, now, None,
        );
        assert_eq!(low.ease_factor(), MIN_EASE_FACTOR);

        let nan = ReviewItem::from_persisted(
            id("b"), "x".into(), "y".into(), f64::NAN, 0, 0, 0, now, None,
        );
        assert_eq!(nan.ease_factor(), DEFAULT_EASE_FACTOR);
    }

    #[test]
    fn huge_interval_saturates_instead_of_panicking() {
        let now = fixed_now();
        let item = ReviewItem::from_persisted(
            id("a"), "x".into(), "y".into(), 2.5, u32::MAX, 9, 0, now, Some(now),
        );
        assert_eq!(item.next_review(), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn with_content_keeps_schedule() {
        let now = fixed_now();
        let item = ReviewItem::from_persisted(
            id("a"), "x".into(), "y".into(), 2.7, 15, 3, 1, now, Some(now),
        );
        let edited = item.with_content("x2", "y2");
        assert_eq!(edited.term(), "x2");
        assert_eq!(edited.interval_days(), 15);
        assert_eq!(edited.next_review(), item.next_review());
    }
}
