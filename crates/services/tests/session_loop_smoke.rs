use std::sync::Arc;

use chrono::Duration;
use services::{Clock, SessionLoopService, StatisticsService};
use storage::repository::{InMemoryRepository, ReviewItemRepository, StudyHistoryRepository};
use vocab_core::model::{FlashcardRating, ItemId, ReviewItem, StudyMode};
use vocab_core::time::fixed_now;

#[tokio::test]
async fn drill_persists_schedule_and_log() {
    let repo = InMemoryRepository::new();
    let now = fixed_now();

    for id in 1..=3 {
        let term = format!("term-{id}");
        let item = ReviewItem::new(ItemId::new(&term).unwrap(), term.clone(), "def", now);
        repo.upsert_item(&item).await.unwrap();
    }

    let loop_svc = SessionLoopService::new(
        Clock::fixed(now),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
    );

    let mut session = loop_svc
        .start_session(StudyMode::Flashcards, None)
        .await
        .unwrap();
    while !session.is_complete() {
        let _ = loop_svc
            .answer_current(&mut session, FlashcardRating::Good.quality())
            .await
            .unwrap();
    }

    let log_id = session.log_id().expect("log persisted");
    assert!(log_id > 0);
    let history = repo.get_study_history().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].items_studied(), 3);
    assert_eq!(history[0].correct_answers(), 3);

    for item in repo.load_review_items().await.unwrap() {
        assert_eq!(item.repetitions(), 1);
        assert_eq!(item.next_review(), now + Duration::days(1));
    }

    // Nothing is due until tomorrow.
    let stats = StatisticsService::new(Clock::fixed(now), Arc::new(repo.clone()), Arc::new(repo))
        .dashboard()
        .await
        .unwrap();
    assert_eq!(stats.items_to_review, 0);
    assert_eq!(stats.study_streak, 1);
    assert!((stats.average_quality - 4.0).abs() < 1e-9);
}

#[tokio::test]
async fn next_day_drill_follows_the_schedule() {
    let repo = InMemoryRepository::new();
    let mut clock = Clock::fixed(fixed_now());
    let item = ReviewItem::new(ItemId::new("casa").unwrap(), "casa", "house", clock.now());
    repo.upsert_item(&item).await.unwrap();

    for expected_interval in [1, 6, 15] {
        let svc = SessionLoopService::new(clock, Arc::new(repo.clone()), Arc::new(repo.clone()));
        let mut session = svc.start_session(StudyMode::Quiz, Some(5)).await.unwrap();
        let answer = svc
            .answer_current(&mut session, FlashcardRating::Good.quality())
            .await
            .unwrap();
        assert!(answer.is_complete);
        assert_eq!(answer.reviewed.after.interval_days(), expected_interval);

        clock.advance(Duration::days(i64::from(expected_interval)));
    }

    let history = repo.get_study_history().await.unwrap();
    assert_eq!(history.len(), 3);
}
