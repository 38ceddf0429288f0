use std::sync::Arc;

use serde::{Deserialize, Serialize};

use storage::repository::Storage;
use vocab_core::scheduler::{Scheduler, SchedulerConfig};
use vocab_core::stats::StatisticsConfig;

use crate::Clock;
use crate::error::AppServicesError;
use crate::review_service::ReviewService;
use crate::sessions::{SessionConfig, SessionLoopService};
use crate::statistics_service::StatisticsService;
use crate::vocabulary_service::VocabularyService;

/// Tunables shared by every service.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub scheduler: SchedulerConfig,
    pub statistics: StatisticsConfig,
    pub session: SessionConfig,
}

/// Assembles app-facing services over one `Storage`.
#[derive(Clone)]
pub struct AppServices {
    vocabulary: Arc<VocabularyService>,
    review: Arc<ReviewService>,
    session_loop: Arc<SessionLoopService>,
    statistics: Arc<StatisticsService>,
}

impl AppServices {
    /// Wire services over an already opened storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Scheduler` if the scheduler settings are invalid.
    pub fn new(
        storage: &Storage,
        clock: Clock,
        settings: ServiceSettings,
    ) -> Result<Self, AppServicesError> {
        let scheduler = Scheduler::try_with_config(settings.scheduler)?;

        let review = ReviewService::new(clock, Arc::clone(&storage.items))
            .with_scheduler(scheduler.clone());
        let vocabulary = VocabularyService::new(clock, Arc::clone(&storage.items))
            .with_scheduler(scheduler);
        let session_loop = SessionLoopService::new(
            clock,
            Arc::clone(&storage.items),
            Arc::clone(&storage.history),
        )
        .with_review_service(review.clone())
        .with_config(settings.session);
        let statistics = StatisticsService::new(
            clock,
            Arc::clone(&storage.items),
            Arc::clone(&storage.history),
        )
        .with_config(settings.statistics);

        Ok(Self {
            vocabulary: Arc::new(vocabulary),
            review: Arc::new(review),
            session_loop: Arc::new(session_loop),
            statistics: Arc::new(statistics),
        })
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails or settings are invalid.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        settings: ServiceSettings,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::new(&storage, clock, settings)
    }

    /// Build services over a fresh in-memory store.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Scheduler` if the settings are invalid.
    pub fn in_memory(clock: Clock, settings: ServiceSettings) -> Result<Self, AppServicesError> {
        Self::new(&Storage::in_memory(), clock, settings)
    }

    #[must_use]
    pub fn vocabulary(&self) -> Arc<VocabularyService> {
        Arc::clone(&self.vocabulary)
    }

    #[must_use]
    pub fn review(&self) -> Arc<ReviewService> {
        Arc::clone(&self.review)
    }

    #[must_use]
    pub fn session_loop(&self) -> Arc<SessionLoopService> {
        Arc::clone(&self.session_loop)
    }

    #[must_use]
    pub fn statistics(&self) -> Arc<StatisticsService> {
        Arc::clone(&self.statistics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vocab_core::model::{Confidence, FlashcardRating};
    use vocab_core::time::fixed_clock;

    #[test]
    fn invalid_scheduler_settings_are_rejected() {
        let settings = ServiceSettings {
            scheduler: SchedulerConfig {
                minimum_ease_factor: 0.5,
                ..SchedulerConfig::default()
            },
            ..ServiceSettings::default()
        };
        assert!(matches!(
            AppServices::in_memory(fixed_clock(), settings),
            Err(AppServicesError::Scheduler(_))
        ));
    }

    #[tokio::test]
    async fn services_share_one_store() {
        let app = AppServices::in_memory(fixed_clock(), ServiceSettings::default()).unwrap();
        let item = app.vocabulary().add_term("sol", "sun").await.unwrap();

        app.review()
            .record_flashcard(item.id(), FlashcardRating::Easy)
            .await
            .unwrap();

        let stats = app.statistics().dashboard().await.unwrap();
        assert_eq!(stats.total_items, 1);
        assert_eq!(stats.items_to_review, 0);
        assert_eq!(app.vocabulary().get_item(item.id()).await.unwrap().repetitions(), 1);
    }

    #[tokio::test]
    async fn one_shot_answers_reach_the_dashboard() {
        let app = AppServices::in_memory(fixed_clock(), ServiceSettings::default()).unwrap();
        let sol = app.vocabulary().add_term("sol", "sun").await.unwrap();
        let luna = app.vocabulary().add_term("luna", "moon").await.unwrap();

        app.session_loop()
            .record_flashcard(sol.id(), FlashcardRating::Easy)
            .await
            .unwrap();
        app.session_loop()
            .record_quiz(luna.id(), true, Confidence::High)
            .await
            .unwrap();

        let stats = app.statistics().dashboard().await.unwrap();
        assert_eq!(stats.total_reviews, 2);
        assert_eq!(stats.correct_reviews, 2);
        assert!((stats.average_quality - 5.0).abs() < 1e-9);
        assert_eq!(stats.study_streak, 1);
        assert_eq!(stats.items_to_review, 0);
    }
}
