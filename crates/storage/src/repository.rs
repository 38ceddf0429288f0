use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::warn;
use vocab_core::model::{
    DEFAULT_EASE_FACTOR, ItemId, MIN_EASE_FACTOR, ReviewItem, StudyMode, StudySession,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(String),
}

//
// ─── PERSISTED SHAPES ──────────────────────────────────────────────────────────
//

/// Accepts any JSON value and keeps it only if it decodes as `T`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// Persisted shape for a review item.
///
/// Every scheduling field is optional so that records written by older or
/// foreign tools still load: missing or invalid values fall back to the
/// defaults of a freshly created item (see [`ReviewItemRecord::into_item`]).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewItemRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(default)]
    pub term: String,
    #[serde(default)]
    pub definition: String,
    #[serde(default, deserialize_with = "lenient")]
    pub ease_factor: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub interval_days: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub repetitions: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub lapses: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient")]
    pub last_reviewed: Option<DateTime<Utc>>,
    /// Derived from `lastReviewed + intervalDays`. Written for external
    /// readers, ignored on load.
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub next_review: Option<DateTime<Utc>>,
}

fn count_or_default(item_id: &str, field: &'static str, value: Option<i64>) -> u32 {
    match value.map(u32::try_from) {
        Some(Ok(v)) => v,
        Some(Err(_)) => {
            warn!(item_id, field, ?value, "invalid persisted count, defaulting to 0");
            0
        }
        None => {
            warn!(item_id, field, "missing persisted count, defaulting to 0");
            0
        }
    }
}

impl ReviewItemRecord {
    #[must_use]
    pub fn from_item(item: &ReviewItem) -> Self {
        Self {
            id: Some(item.id().as_str().to_owned()),
            term: item.term().to_owned(),
            definition: item.definition().to_owned(),
            ease_factor: Some(item.ease_factor()),
            interval_days: Some(i64::from(item.interval_days())),
            repetitions: Some(i64::from(item.repetitions())),
            lapses: Some(i64::from(item.lapses())),
            created_at: Some(item.created_at()),
            last_reviewed: item.last_reviewed(),
            next_review: item.last_reviewed().map(|_| item.next_review()),
        }
    }

    /// Convert the record into a domain item, defaulting malformed fields.
    ///
    /// Missing or non-finite ease becomes 2.5, ease below 1.3 is raised to 1.3,
    /// missing or negative counts become 0, and a missing creation time falls
    /// back to the last review (or the Unix epoch). Each default is logged.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the record has no usable id.
    pub fn into_item(self) -> Result<ReviewItem, StorageError> {
        let id = self
            .id
            .as_deref()
            .map(ItemId::new)
            .transpose()
            .map_err(|e| StorageError::Serialization(e.to_string()))?
            .ok_or_else(|| StorageError::Serialization("review item without id".into()))?;
        let item_id = id.as_str();

        let ease_factor = match self.ease_factor {
            Some(ef) if ef.is_finite() && ef >= MIN_EASE_FACTOR => ef,
            Some(ef) if ef.is_finite() => {
                warn!(item_id, ease_factor = ef, "ease factor below floor, raising");
                MIN_EASE_FACTOR
            }
            other => {
                warn!(item_id, ease_factor = ?other, "missing or invalid ease factor, defaulting");
                DEFAULT_EASE_FACTOR
            }
        };

        let interval_days = count_or_default(item_id, "interval_days", self.interval_days);
        let repetitions = count_or_default(item_id, "repetitions", self.repetitions);
        let lapses = count_or_default(item_id, "lapses", self.lapses);

        let created_at = match (self.created_at, self.last_reviewed) {
            (Some(at), _) => at,
            (None, Some(reviewed)) => reviewed,
            (None, None) => {
                warn!(item_id, "missing creation time, defaulting to epoch");
                DateTime::<Utc>::default()
            }
        };

        Ok(ReviewItem::from_persisted(
            id,
            self.term,
            self.definition,
            ease_factor,
            interval_days,
            repetitions,
            lapses,
            created_at,
            self.last_reviewed,
        ))
    }
}

/// Persisted shape for a study log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySessionRecord {
    pub date: DateTime<Utc>,
    pub items_studied: u32,
    pub correct_answers: u32,
    pub average_quality: f64,
    pub mode: StudyMode,
}

impl StudySessionRecord {
    #[must_use]
    pub fn from_session(session: &StudySession) -> Self {
        Self {
            date: session.date(),
            items_studied: session.items_studied(),
            correct_answers: session.correct_answers(),
            average_quality: session.average_quality(),
            mode: session.mode().clone(),
        }
    }

    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the entry fails validation.
    pub fn into_session(self) -> Result<StudySession, StorageError> {
        StudySession::new(
            self.date,
            self.items_studied,
            self.correct_answers,
            self.average_quality,
            self.mode,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

//
// ─── PORTS ─────────────────────────────────────────────────────────────────────
//

/// Repository contract for the review item set.
#[async_trait]
pub trait ReviewItemRepository: Send + Sync {
    /// Load every item. Records that cannot be identified are skipped.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be read.
    async fn load_review_items(&self) -> Result<Vec<ReviewItem>, StorageError>;

    /// Replace the stored set with `items`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the set cannot be written.
    async fn save_review_items(&self, items: &[ReviewItem]) -> Result<(), StorageError>;

    /// Fetch one item by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures; a missing item is `Ok(None)`.
    async fn get_item(&self, id: &ItemId) -> Result<Option<ReviewItem>, StorageError>;

    /// Insert or replace one item.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the item cannot be stored.
    async fn upsert_item(&self, item: &ReviewItem) -> Result<(), StorageError>;

    /// Delete one item, returning whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn delete_item(&self, id: &ItemId) -> Result<bool, StorageError>;
}

/// Repository contract for the append-only study log.
#[async_trait]
pub trait StudyHistoryRepository: Send + Sync {
    /// Every log entry, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the log cannot be read.
    async fn get_study_history(&self) -> Result<Vec<StudySession>, StorageError>;

    /// Append an entry and return its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the entry cannot be stored.
    async fn add_study_session(&self, session: &StudySession) -> Result<i64, StorageError>;
}

//
// ─── IN-MEMORY ADAPTER ─────────────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    items: Arc<Mutex<BTreeMap<ItemId, ReviewItem>>>,
    history: Arc<Mutex<Vec<StudySession>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReviewItemRepository for InMemoryRepository {
    async fn load_review_items(&self) -> Result<Vec<ReviewItem>, StorageError> {
        let guard = self
            .items
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.values().cloned().collect())
    }

    async fn save_review_items(&self, items: &[ReviewItem]) -> Result<(), StorageError> {
        let mut guard = self
            .items
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = items
            .iter()
            .map(|item| (item.id().clone(), item.clone()))
            .collect();
        Ok(())
    }

    async fn get_item(&self, id: &ItemId) -> Result<Option<ReviewItem>, StorageError> {
        let guard = self
            .items
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(id).cloned())
    }

    async fn upsert_item(&self, item: &ReviewItem) -> Result<(), StorageError> {
        let mut guard = self
            .items
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(item.id().clone(), item.clone());
        Ok(())
    }

    async fn delete_item(&self, id: &ItemId) -> Result<bool, StorageError> {
        let mut guard = self
            .items
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.remove(id).is_some())
    }
}

#[async_trait]
impl StudyHistoryRepository for InMemoryRepository {
    async fn get_study_history(&self) -> Result<Vec<StudySession>, StorageError> {
        let guard = self
            .history
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut sessions = guard.clone();
        sessions.sort_by_key(StudySession::date);
        Ok(sessions)
    }

    async fn add_study_session(&self, session: &StudySession) -> Result<i64, StorageError> {
        let mut guard = self
            .history
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.push(session.clone());
        i64::try_from(guard.len()).map_err(|_| StorageError::Conflict)
    }
}

/// Aggregates the repositories used by the services layer.
#[derive(Clone)]
pub struct Storage {
    pub items: Arc<dyn ReviewItemRepository>,
    pub history: Arc<dyn StudyHistoryRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let items: Arc<dyn ReviewItemRepository> = Arc::new(repo.clone());
        let history: Arc<dyn StudyHistoryRepository> = Arc::new(repo);
        Self { items, history }
    }
}
