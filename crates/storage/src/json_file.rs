//! Single-document JSON store.
//!
//! The file holds `{ "reviewItems": [...], "studyHistory": [...] }`. Every
//! write rewrites the whole document through a temporary file and a rename, so
//! readers never observe a half-written file.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use vocab_core::model::{ItemId, ReviewItem, StudySession};

use crate::repository::{
    ReviewItemRecord, ReviewItemRepository, Storage, StorageError, StudyHistoryRepository,
    StudySessionRecord,
};

fn io(e: &std::io::Error) -> StorageError {
    StorageError::Io(e.to_string())
}

/// On-disk layout, decoded entry by entry so one bad record cannot poison the
/// rest.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument {
    #[serde(default)]
    review_items: Vec<serde_json::Value>,
    #[serde(default)]
    study_history: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentOut {
    review_items: Vec<ReviewItemRecord>,
    study_history: Vec<StudySessionRecord>,
}

#[derive(Debug, Default)]
struct Snapshot {
    items: Vec<ReviewItem>,
    history: Vec<StudySession>,
}

impl Snapshot {
    fn decode(raw: RawDocument) -> Self {
        let mut items: Vec<ReviewItem> = Vec::with_capacity(raw.review_items.len());
        let mut seen: HashSet<ItemId> = HashSet::with_capacity(raw.review_items.len());
        for (index, value) in raw.review_items.into_iter().enumerate() {
            let decoded = serde_json::from_value::<ReviewItemRecord>(value)
                .map_err(|e| StorageError::Serialization(e.to_string()))
                .and_then(ReviewItemRecord::into_item);
            match decoded {
                Ok(item) => {
                    if seen.insert(item.id().clone()) {
                        items.push(item);
                    } else {
                        warn!(index, id = %item.id(), "duplicate review item id, keeping the first");
                    }
                }
                Err(err) => warn!(index, error = %err, "skipping unreadable review item"),
            }
        }

        let mut history = Vec::with_capacity(raw.study_history.len());
        for (index, value) in raw.study_history.into_iter().enumerate() {
            let decoded = serde_json::from_value::<StudySessionRecord>(value)
                .map_err(|e| StorageError::Serialization(e.to_string()))
                .and_then(StudySessionRecord::into_session);
            match decoded {
                Ok(session) => history.push(session),
                Err(err) => warn!(index, error = %err, "skipping unreadable study session"),
            }
        }

        Self { items, history }
    }

    fn encode(&self) -> DocumentOut {
        DocumentOut {
            review_items: self.items.iter().map(ReviewItemRecord::from_item).collect(),
            study_history: self
                .history
                .iter()
                .map(StudySessionRecord::from_session)
                .collect(),
        }
    }
}

/// Repository backed by one JSON file on disk.
#[derive(Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl JsonFileRepository {
    /// A missing file is treated as an empty store and created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Snapshot, StorageError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Snapshot::default()),
            Err(e) => return Err(io(&e)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Snapshot::default());
        }
        let raw: RawDocument = serde_json::from_slice(&bytes)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        Ok(Snapshot::decode(raw))
    }

    async fn write(&self, snapshot: &Snapshot) -> Result<(), StorageError> {
        let body = serde_json::to_vec_pretty(&snapshot.encode())
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| io(&e))?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, body).await.map_err(|e| io(&e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| io(&e))?;
        debug!(
            path = %self.path.display(),
            items = snapshot.items.len(),
            sessions = snapshot.history.len(),
            "wrote json store"
        );
        Ok(())
    }
}

#[async_trait]
impl ReviewItemRepository for JsonFileRepository {
    async fn load_review_items(&self) -> Result<Vec<ReviewItem>, StorageError> {
        let _guard = self.lock.lock().await;
        Ok(self.read().await?.items)
    }

    async fn save_review_items(&self, items: &[ReviewItem]) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut snapshot = self.read().await?;
        snapshot.items = items.to_vec();
        self.write(&snapshot).await
    }

    async fn get_item(&self, id: &ItemId) -> Result<Option<ReviewItem>, StorageError> {
        let _guard = self.lock.lock().await;
        let snapshot = self.read().await?;
        Ok(snapshot.items.into_iter().find(|item| item.id() == id))
    }

    async fn upsert_item(&self, item: &ReviewItem) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut snapshot = self.read().await?;
        match snapshot.items.iter_mut().find(|i| i.id() == item.id()) {
            Some(slot) => *slot = item.clone(),
            None => snapshot.items.push(item.clone()),
        }
        self.write(&snapshot).await
    }

    async fn delete_item(&self, id: &ItemId) -> Result<bool, StorageError> {
        let _guard = self.lock.lock().await;
        let mut snapshot = self.read().await?;
        let before = snapshot.items.len();
        snapshot.items.retain(|item| item.id() != id);
        if snapshot.items.len() == before {
            return Ok(false);
        }
        self.write(&snapshot).await?;
        Ok(true)
    }
}

#[async_trait]
impl StudyHistoryRepository for JsonFileRepository {
    async fn get_study_history(&self) -> Result<Vec<StudySession>, StorageError> {
        let _guard = self.lock.lock().await;
        let mut history = self.read().await?.history;
        history.sort_by_key(StudySession::date);
        Ok(history)
    }

    async fn add_study_session(&self, session: &StudySession) -> Result<i64, StorageError> {
        let _guard = self.lock.lock().await;
        let mut snapshot = self.read().await?;
        snapshot.history.push(session.clone());
        self.write(&snapshot).await?;
        i64::try_from(snapshot.history.len()).map_err(|_| StorageError::Conflict)
    }
}

impl Storage {
    /// Build a `Storage` backed by a JSON file.
    #[must_use]
    pub fn json_file(path: impl Into<PathBuf>) -> Self {
        let repo = JsonFileRepository::new(path);
        info!(path = %repo.path().display(), "using json store");
        let items: Arc<dyn ReviewItemRepository> = Arc::new(repo.clone());
        let history: Arc<dyn StudyHistoryRepository> = Arc::new(repo);
        Self { items, history }
    }
}
