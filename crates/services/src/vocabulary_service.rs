use std::sync::Arc;

use tracing::info;

use storage::repository::ReviewItemRepository;
use vocab_core::model::{ItemId, ReviewItem};
use vocab_core::scheduler::Scheduler;
use vocab_core::time::Clock;

use crate::error::VocabularyServiceError;

/// Manages the set of learnable terms.
///
/// New terms get a fresh review item from the scheduler's factory; deleting a
/// term deletes its scheduling state with it.
#[derive(Clone)]
pub struct VocabularyService {
    clock: Clock,
    scheduler: Scheduler,
    items: Arc<dyn ReviewItemRepository>,
}

impl VocabularyService {
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

    /// Add a term under a freshly generated id.
    ///
    /// # Errors
    ///
    /// Returns `VocabularyServiceError::EmptyTerm` for a blank term, or storage errors.
    pub async fn add_term(
        &self,
        term: &str,
        definition: &str,
    ) -> Result<ReviewItem, VocabularyServiceError> {
        self.add_term_with_id(ItemId::generate(), term, definition)
            .await
    }

    /// Add a term under a caller-chosen id.
    ///
    /// # Errors
    ///
    /// Returns `VocabularyServiceError::AlreadyExists` if the id is taken.
    /// Returns `VocabularyServiceError::EmptyTerm` for a blank term, or storage errors.
    pub async fn add_term_with_id(
        &self,
        id: ItemId,
        term: &str,
        definition: &str,
    ) -> Result<ReviewItem, VocabularyServiceError> {
        let term = term.trim();
        if term.is_empty() {
            return Err(VocabularyServiceError::EmptyTerm);
        }
        if self.items.get_item(&id).await?.is_some() {
            return Err(VocabularyServiceError::AlreadyExists(id));
        }

        let item = self
            .scheduler
            .create_item(id, term, definition.trim(), self.clock.now());
        self.items.upsert_item(&item).await?;
        info!(item_id = %item.id(), term, "added term");
        Ok(item)
    }

    /// Change the displayed term and definition, keeping the schedule.
    ///
    /// # Errors
    ///
    /// Returns `VocabularyServiceError::NotFound` if the id is unknown.
    /// Returns `VocabularyServiceError::EmptyTerm` for a blank term, or storage errors.
    pub async fn update_term(
        &self,
        id: &ItemId,
        term: &str,
        definition: &str,
    ) -> Result<ReviewItem, VocabularyServiceError> {
        let term = term.trim();
        if term.is_empty() {
            return Err(VocabularyServiceError::EmptyTerm);
        }
        let current = self.get_item(id).await?;
        let updated = current.with_content(term, definition.trim());
        self.items.upsert_item(&updated).await?;
        Ok(updated)
    }

    /// Delete a term together with its scheduling state.
    ///
    /// # Errors
    ///
    /// Returns `VocabularyServiceError::NotFound` if the id is unknown, or storage errors.
    pub async fn remove_term(&self, id: &ItemId) -> Result<(), VocabularyServiceError> {
        if self.items.delete_item(id).await? {
            info!(item_id = %id, "removed term");
            Ok(())
        } else {
            Err(VocabularyServiceError::NotFound(id.clone()))
        }
    }

    /// # Errors
    ///
    /// Returns `VocabularyServiceError::NotFound` if the id is unknown, or storage errors.
    pub async fn get_item(&self, id: &ItemId) -> Result<ReviewItem, VocabularyServiceError> {
        self.items
            .get_item(id)
            .await?
            .ok_or_else(|| VocabularyServiceError::NotFound(id.clone()))
    }

    /// Every stored item, ordered by term.
    ///
    /// # Errors
    ///
    /// Returns storage errors.
    pub async fn list_items(&self) -> Result<Vec<ReviewItem>, VocabularyServiceError> {
        let mut items = self.items.load_review_items().await?;
        items.sort_by(|a, b| {
            a.term()
                .to_lowercase()
                .cmp(&b.term().to_lowercase())
                .then_with(|| a.id().cmp(b.id()))
        });
        Ok(items)
    }
}
