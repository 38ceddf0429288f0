use chrono::Duration;
use storage::repository::{ReviewItemRepository, StudyHistoryRepository};
use storage::sqlite::SqliteRepository;
use vocab_core::model::{ItemId, Quality, ReviewItem, StudyMode, StudySession};
use vocab_core::scheduler::calculate_next_review;
use vocab_core::time::fixed_now;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn build_item(id: &str) -> ReviewItem {
    ReviewItem::new(ItemId::new(id).unwrap(), id, format!("{id} def"), fixed_now())
}

#[tokio::test]
async fn sqlite_roundtrip_preserves_every_field() {
    let repo = connect("memdb_roundtrip").await;

    let fresh = build_item("apple");
    let once = calculate_next_review(&build_item("pear"), Quality::from(4), fixed_now());
    let lapsed = calculate_next_review(&once, Quality::from(1), fixed_now() + Duration::days(1));
    repo.save_review_items(&[fresh.clone(), once.clone(), lapsed.clone()])
        .await
        .expect("save");

    // `once` and `lapsed` share an id; the later write wins.
    let loaded = repo.load_review_items().await.expect("load");
    assert_eq!(loaded.len(), 2);
    assert!(loaded.contains(&fresh));
    assert!(loaded.contains(&lapsed));

    let fetched = repo.get_item(lapsed.id()).await.unwrap().unwrap();
    assert_eq!(fetched, lapsed);
    assert_eq!(fetched.lapses(), 1);
    assert_eq!(fetched.next_review(), lapsed.next_review());
}

#[tokio::test]
async fn sqlite_upsert_delete_and_replace() {
    let repo = connect("memdb_upsert_delete").await;

    let apple = build_item("apple");
    repo.upsert_item(&apple).await.unwrap();
    let reviewed = calculate_next_review(&apple, Quality::from(5), fixed_now());
    repo.upsert_item(&reviewed).await.unwrap();
    assert_eq!(repo.load_review_items().await.unwrap(), vec![reviewed.clone()]);

    assert!(repo.delete_item(reviewed.id()).await.unwrap());
    assert!(!repo.delete_item(reviewed.id()).await.unwrap());
    assert!(repo.get_item(reviewed.id()).await.unwrap().is_none());

    repo.upsert_item(&build_item("old")).await.unwrap();
    repo.save_review_items(&[build_item("new")]).await.unwrap();
    let ids: Vec<String> = repo
        .load_review_items()
        .await
        .unwrap()
        .iter()
        .map(|i| i.id().to_string())
        .collect();
    assert_eq!(ids, vec!["new"]);
}

#[tokio::test]
async fn sqlite_defaults_malformed_rows() {
    let repo = connect("memdb_malformed").await;

    sqlx::query(
        r"
            INSERT INTO review_items (id, term, definition, ease_factor, interval_days,
                                      repetitions, lapses, created_at, last_reviewed)
            VALUES ('legacy', 'legacy', 'imported', NULL, -3, NULL, 'many', NULL, NULL)
        ",
    )
    .execute(repo.pool())
    .await
    .unwrap();
    repo.upsert_item(&build_item("healthy")).await.unwrap();

    let loaded = repo.load_review_items().await.unwrap();
    assert_eq!(loaded.len(), 2);

    let legacy = loaded.iter().find(|i| i.id().as_str() == "legacy").unwrap();
    assert_eq!(legacy.ease_factor(), 2.5);
    assert_eq!(legacy.interval_days(), 0);
    assert_eq!(legacy.repetitions(), 0);
    assert_eq!(legacy.lapses(), 0);
    assert!(legacy.is_due(fixed_now()));
}

#[tokio::test]
async fn sqlite_study_history_appends_in_date_order() {
    let repo = connect("memdb_history").await;

    let today = StudySession::new(fixed_now(), 10, 7, 3.6, StudyMode::Flashcards).unwrap();
    let yesterday = StudySession::new(
        fixed_now() - Duration::days(1),
        4,
        4,
        4.5,
        StudyMode::Other("listening".into()),
    )
    .unwrap();

    let first = repo.add_study_session(&today).await.unwrap();
    let second = repo.add_study_session(&yesterday).await.unwrap();
    assert!(second > first);

    let history = repo.get_study_history().await.unwrap();
    assert_eq!(history, vec![yesterday, today]);
}
