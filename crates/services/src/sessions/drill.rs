use chrono::{DateTime, Utc};

use vocab_core::model::{Quality, ReviewItem, StudyMode, StudySession};

use crate::error::SessionError;
use crate::review_service::{ReviewService, ReviewedItem};

/// Snapshot of how far a drill has progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub skipped: usize,
    pub remaining: usize,
    pub is_complete: bool,
}

/// One drill over a fixed list of items.
///
/// Items are presented in order. Each answer moves to the next item; the drill
/// completes once every item was answered or skipped. The study log entry is
/// written at most once, its id kept in `log_id`.
#[derive(Debug, Clone)]
pub struct DrillSession {
    mode: StudyMode,
    items: Vec<ReviewItem>,
    current: usize,
    results: Vec<ReviewedItem>,
    skipped: usize,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    log_id: Option<i64>,
}

impl DrillSession {
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if `items` is empty.
    pub fn new(
        mode: StudyMode,
        items: Vec<ReviewItem>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if items.is_empty() {
            return Err(SessionError::Empty);
        }
        Ok(Self {
            mode,
            items,
            current: 0,
            results: Vec::new(),
            skipped: 0,
            started_at,
            completed_at: None,
            log_id: None,
        })
    }

    #[must_use]
    pub fn mode(&self) -> &StudyMode {
        &self.mode
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn log_id(&self) -> Option<i64> {
        self.log_id
    }

    pub(crate) fn set_log_id(&mut self, id: i64) {
        self.log_id = Some(id);
    }

    #[must_use]
    pub fn results(&self) -> &[ReviewedItem] {
        &self.results
    }

    #[must_use]
    pub fn total_items(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn current_item(&self) -> Option<&ReviewItem> {
        self.items.get(self.current)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.items.len(),
            answered: self.results.len(),
            skipped: self.skipped,
            remaining: self.items.len().saturating_sub(self.current),
            is_complete: self.is_complete(),
        }
    }

    /// Qualities recorded so far, in answer order.
    #[must_use]
    pub fn qualities(&self) -> Vec<Quality> {
        self.results.iter().map(|r| r.quality).collect()
    }

    /// Review the current item in memory only, without persisting anything.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the drill is already finished.
    pub fn answer_current(
        &mut self,
        review_service: &ReviewService,
        quality: Quality,
        reviewed_at: DateTime<Utc>,
    ) -> Result<&ReviewedItem, SessionError> {
        let Some(item) = self.current_item() else {
            return Err(SessionError::Completed);
        };
        let reviewed = review_service.review_item(item, quality, reviewed_at);
        self.record(reviewed, reviewed_at)
    }

    /// Move past the current item without recording an answer.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the drill is already finished.
    pub fn skip_current(&mut self, at: DateTime<Utc>) -> Result<(), SessionError> {
        if self.current_item().is_none() {
            return Err(SessionError::Completed);
        }
        self.skipped += 1;
        self.advance(at);
        Ok(())
    }

    /// Stop the drill before every item was seen. Remaining items stay
    /// unanswered; a drill that is already complete is left as is.
    pub fn end_early(&mut self, at: DateTime<Utc>) {
        if self.completed_at.is_none() {
            self.current = self.items.len();
            self.completed_at = Some(at);
        }
    }

    pub(crate) fn record(
        &mut self,
        reviewed: ReviewedItem,
        at: DateTime<Utc>,
    ) -> Result<&ReviewedItem, SessionError> {
        let Some(slot) = self.items.get_mut(self.current) else {
            return Err(SessionError::Completed);
        };
        *slot = reviewed.after.clone();
        self.results.push(reviewed);
        self.advance(at);
        self.results.last().ok_or(SessionError::Completed)
    }

    fn advance(&mut self, at: DateTime<Utc>) {
        self.current += 1;
        if self.current >= self.items.len() && self.completed_at.is_none() {
            self.completed_at = Some(at);
        }
    }

    /// Build the study log entry for a completed drill.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InProgress` if the drill is not complete, or
    /// `SessionError::Log` if the entry fails validation.
    pub fn build_log(&self) -> Result<StudySession, SessionError> {
        let completed_at = self.completed_at.ok_or(SessionError::InProgress)?;
        Ok(StudySession::from_qualities(
            completed_at,
            self.mode.clone(),
            &self.qualities(),
        )?)
    }
}
