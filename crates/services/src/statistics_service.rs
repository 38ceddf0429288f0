use std::sync::Arc;

use storage::repository::{ReviewItemRepository, StudyHistoryRepository};
use vocab_core::stats::{StatisticsConfig, StudyStatistics, calculate_statistics};
use vocab_core::time::Clock;

use crate::error::StatisticsServiceError;

/// Builds dashboard statistics from stored items and the study log.
#[derive(Clone)]
pub struct StatisticsService {
    clock: Clock,
    config: StatisticsConfig,
    items: Arc<dyn ReviewItemRepository>,
    history: Arc<dyn StudyHistoryRepository>,
}

impl StatisticsService {
    #[must_use]
    pub fn new(
        clock: Clock,
        items: Arc<dyn ReviewItemRepository>,
        history: Arc<dyn StudyHistoryRepository>,
    ) -> Self {
        Self {
            clock,
            config: StatisticsConfig::default(),
            items,
            history,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: StatisticsConfig) -> Self {
        self.config = config;
        self
    }

    /// # Errors
    ///
    /// Returns `StatisticsServiceError::Storage` if items or history cannot be loaded.
    pub async fn dashboard(&self) -> Result<StudyStatistics, StatisticsServiceError> {
        let items = self.items.load_review_items().await?;
        let history = self.history.get_study_history().await?;
        Ok(calculate_statistics(
            &items,
            &history,
            self.clock.now(),
            &self.config,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use storage::repository::InMemoryRepository;
    use vocab_core::model::{ItemId, ReviewItem, StudyMode, StudySession};
    use vocab_core::time::{fixed_clock, fixed_now};

    #[tokio::test]
    async fn empty_store_gives_zeroes() {
        let repo = InMemoryRepository::new();
        let svc = StatisticsService::new(fixed_clock(), Arc::new(repo.clone()), Arc::new(repo));
        assert_eq!(svc.dashboard().await.unwrap(), StudyStatistics::default());
    }

    #[tokio::test]
    async fn dashboard_combines_items_and_history() {
        let repo = InMemoryRepository::new();
        for id in ["a", "b"] {
            let item = ReviewItem::new(ItemId::new(id).unwrap(), id, "def", fixed_now());
            repo.upsert_item(&item).await.unwrap();
        }
        for days_ago in [0, 1] {
            let session = StudySession::new(
                fixed_now() - Duration::days(days_ago),
                4,
                3,
                3.5,
                StudyMode::Flashcards,
            )
            .unwrap();
            repo.add_study_session(&session).await.unwrap();
        }

        let svc = StatisticsService::new(fixed_clock(), Arc::new(repo.clone()), Arc::new(repo))
            .with_config(StatisticsConfig {
                seconds_per_item: 30,
                ..StatisticsConfig::default()
            });
        let stats = svc.dashboard().await.unwrap();

        assert_eq!(stats.total_items, 2);
        assert_eq!(stats.items_to_review, 2);
        assert_eq!(stats.estimated_time, 60);
        assert_eq!(stats.total_reviews, 8);
        assert_eq!(stats.correct_reviews, 6);
        assert_eq!(stats.study_streak, 2);
    }
}
