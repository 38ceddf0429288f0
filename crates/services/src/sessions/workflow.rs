use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use storage::repository::{ReviewItemRepository, StudyHistoryRepository};
use vocab_core::model::{
    Confidence, FlashcardRating, ItemId, Quality, StudyMode, StudySession, response_to_quality,
};
use vocab_core::time::Clock;

use super::drill::DrillSession;
use super::plan::SessionPlan;
use crate::error::SessionError;
use crate::review_service::{ReviewService, ReviewedItem};

/// Drill defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Items per drill when the caller gives no limit.
    pub default_limit: usize,
    /// Shuffle never-reviewed items before picking them.
    pub shuffle_new: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            shuffle_new: false,
        }
    }
}

/// Result of answering a single item in a drill.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionAnswerResult {
    pub reviewed: ReviewedItem,
    pub is_complete: bool,
    pub log_id: Option<i64>,
}

/// Orchestrates drill start, persisted answering and the study log.
#[derive(Clone)]
pub struct SessionLoopService {
    clock: Clock,
    items: Arc<dyn ReviewItemRepository>,
    history: Arc<dyn StudyHistoryRepository>,
    review: ReviewService,
    config: SessionConfig,
}

impl SessionLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        items: Arc<dyn ReviewItemRepository>,
        history: Arc<dyn StudyHistoryRepository>,
    ) -> Self {
        let review = ReviewService::new(clock, Arc::clone(&items));
        Self {
            clock,
            items,
            history,
            review,
            config: SessionConfig::default(),
        }
    }

    /// Replace the review service, e.g. to use a custom scheduler.
    #[must_use]
    pub fn with_review_service(mut self, review: ReviewService) -> Self {
        self.review = review;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Start a drill over the currently due items.
    ///
    /// `limit` falls back to the configured default.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` when nothing is due, or storage errors.
    pub async fn start_session(
        &self,
        mode: StudyMode,
        limit: Option<usize>,
    ) -> Result<DrillSession, SessionError> {
        let now = self.clock.now();
        let items = self.items.load_review_items().await?;
        let limit = limit.unwrap_or(self.config.default_limit);
        let plan = SessionPlan::build(&items, limit, now, self.config.shuffle_new);

        info!(
            mode = %mode,
            new = plan.new_selected,
            due = plan.due_selected,
            "starting drill"
        );
        DrillSession::new(mode, plan.items, now)
    }

    /// Answer the current item, persist its new schedule, and append the study
    /// log entry once the drill completes.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the drill is already finished.
    /// Returns `SessionError::Review` if the item vanished or could not be saved.
    /// Returns `SessionError::Storage` if the log entry cannot be appended; the
    /// answer itself is kept and [`SessionLoopService::finalize_log`] can retry.
    pub async fn answer_current(
        &self,
        session: &mut DrillSession,
        quality: Quality,
    ) -> Result<SessionAnswerResult, SessionError> {
        let Some(item) = session.current_item() else {
            return Err(SessionError::Completed);
        };
        let id = item.id().clone();

        let reviewed = self.review.record_answer(&id, quality).await?;
        let reviewed = session.record(reviewed, self.clock.now())?.clone();

        if session.is_complete() && session.log_id().is_none() {
            self.append_log(session).await?;
        }

        Ok(SessionAnswerResult {
            reviewed,
            is_complete: session.is_complete(),
            log_id: session.log_id(),
        })
    }

    /// Retry log persistence after a completed drill.
    ///
    /// Returns the existing id if the entry was already written.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InProgress` if the drill is not complete.
    /// Returns `SessionError::Storage` if persistence fails.
    pub async fn finalize_log(&self, session: &mut DrillSession) -> Result<i64, SessionError> {
        if let Some(id) = session.log_id() {
            return Ok(id);
        }
        if !session.is_complete() {
            return Err(SessionError::InProgress);
        }
        self.append_log(session).await
    }

    /// Stop a drill early. Answers given so far are logged; a drill without
    /// any answer leaves no log entry.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the log entry cannot be appended.
    pub async fn end_session(
        &self,
        session: &mut DrillSession,
    ) -> Result<Option<i64>, SessionError> {
        session.end_early(self.clock.now());
        if session.results().is_empty() {
            return Ok(session.log_id());
        }
        self.finalize_log(session).await.map(Some)
    }

    /// Record one answer outside a drill. The item is rescheduled and the
    /// answer is logged as a single-item session so the dashboard sees it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Review` if the item is unknown or cannot be saved.
    /// Returns `SessionError::Storage` if the log entry cannot be appended; the
    /// new schedule is kept.
    pub async fn record_single(
        &self,
        id: &ItemId,
        mode: StudyMode,
        quality: Quality,
    ) -> Result<SessionAnswerResult, SessionError> {
        let reviewed = self.review.record_answer(id, quality).await?;
        let log = StudySession::from_qualities(self.clock.now(), mode, &[quality])?;
        let log_id = self.history.add_study_session(&log).await?;
        info!(
            log_id,
            item_id = %id,
            mode = %log.mode(),
            quality = quality.value(),
            "logged single answer"
        );
        Ok(SessionAnswerResult {
            reviewed,
            is_complete: true,
            log_id: Some(log_id),
        })
    }

    /// # Errors
    ///
    /// See [`SessionLoopService::record_single`].
    pub async fn record_flashcard(
        &self,
        id: &ItemId,
        rating: FlashcardRating,
    ) -> Result<SessionAnswerResult, SessionError> {
        self.record_single(id, StudyMode::Flashcards, rating.quality())
            .await
    }

    /// # Errors
    ///
    /// See [`SessionLoopService::record_single`].
    pub async fn record_quiz(
        &self,
        id: &ItemId,
        is_correct: bool,
        confidence: Confidence,
    ) -> Result<SessionAnswerResult, SessionError> {
        self.record_single(
            id,
            StudyMode::Quiz,
            response_to_quality(is_correct, confidence),
        )
        .await
    }

    async fn append_log(&self, session: &mut DrillSession) -> Result<i64, SessionError> {
        let log = session.build_log()?;
        let id = self.history.add_study_session(&log).await?;
        session.set_log_id(id);
        info!(
            log_id = id,
            mode = %log.mode(),
            items = log.items_studied(),
            correct = log.correct_answers(),
            "appended study log entry"
        );
        Ok(id)
    }
}
