use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use storage::repository::ReviewItemRepository;
use vocab_core::{
    model::{Confidence, FlashcardRating, ItemId, Quality, ReviewItem, response_to_quality},
    scheduler::Scheduler,
    time::Clock,
};

use crate::error::ReviewServiceError;

//
// ─── REVIEW RESULT ─────────────────────────────────────────────────────────────
//

/// Item state before and after one recorded answer.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewedItem {
    pub before: ReviewItem,
    pub after: ReviewItem,
    pub quality: Quality,
}

impl ReviewedItem {
    #[must_use]
    pub fn id(&self) -> &ItemId {
        self.after.id()
    }

    #[must_use]
    pub fn next_review(&self) -> DateTime<Utc> {
        self.after.next_review()
    }

    /// True when this answer reset the repetition streak.
    #[must_use]
    pub fn is_lapse(&self) -> bool {
        self.quality.is_lapse()
    }
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Applies answers to stored items through the scheduler.
#[derive(Clone)]
pub struct ReviewService {
    clock: Clock,
    scheduler: Scheduler,
    items: Arc<dyn ReviewItemRepository>,
}

impl ReviewService {
    #[must_use]
    pub fn new(clock: Clock, items: Arc<dyn ReviewItemRepository>) -> Self {
        Self {
            clock,
            scheduler: Scheduler::new(),
            items,
        }
    }

    #[must_use]
    pub fn with_scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Schedule `item` without touching storage.
    #[must_use]
    pub fn review_item(
        &self,
        item: &ReviewItem,
        quality: Quality,
        reviewed_at: DateTime<Utc>,
    ) -> ReviewedItem {
        ReviewedItem {
            before: item.clone(),
            after: self.scheduler.schedule(item, quality, reviewed_at),
            quality,
        }
    }

    /// Load the item, apply `quality` at the service clock's time, and persist
    /// the new state.
    ///
    /// # Errors
    ///
    /// Returns `ReviewServiceError::NotFound` if no item has this id.
    /// Returns `ReviewServiceError::Storage` if loading or saving fails.
    pub async fn record_answer(
        &self,
        id: &ItemId,
        quality: Quality,
    ) -> Result<ReviewedItem, ReviewServiceError> {
        let item = self
            .items
            .get_item(id)
            .await?
            .ok_or_else(|| ReviewServiceError::NotFound(id.clone()))?;

        let reviewed = self.review_item(&item, quality, self.clock.now());
        self.items.upsert_item(&reviewed.after).await?;

        debug!(
            item_id = %id,
            quality = quality.value(),
            interval_days = reviewed.after.interval_days(),
            ease_factor = reviewed.after.ease_factor(),
            "recorded review"
        );
        Ok(reviewed)
    }

    /// Record a flashcard answer button.
    ///
    /// # Errors
    ///
    /// See [`ReviewService::record_answer`].
    pub async fn record_flashcard(
        &self,
        id: &ItemId,
        rating: FlashcardRating,
    ) -> Result<ReviewedItem, ReviewServiceError> {
        self.record_answer(id, rating.quality()).await
    }

    /// Record a quiz answer graded by correctness and self-reported confidence.
    ///
    /// # Errors
    ///
    /// See [`ReviewService::record_answer`].
    pub async fn record_quiz(
        &self,
        id: &ItemId,
        is_correct: bool,
        confidence: Confidence,
    ) -> Result<ReviewedItem, ReviewServiceError> {
        self.record_answer(id, response_to_quality(is_correct, confidence))
            .await
    }
}
