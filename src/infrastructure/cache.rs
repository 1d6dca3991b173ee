// Short-lived result cache in front of a board source
use crate::application::board_source::{BoardSource, FetchError};
use crate::domain::normalizer::BoardColumn;
use crate::domain::order::RawRecord;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Identifies one fetch: the board plus the credentials used to read it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub board_id: String,
    pub token_fingerprint: String,
}

/// Single-slot cache holding (key, value, timestamp)
#[derive(Debug)]
pub struct ResultCache<V> {
    ttl: Duration,
    entry: Mutex<Option<(CacheKey, Arc<V>, Instant)>>,
}

impl<V> ResultCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: Mutex::new(None),
        }
    }

    /// Value for `key` if it was stored less than one TTL before `now`
    pub fn get_fresh(&self, key: &CacheKey, now: Instant) -> Option<Arc<V>> {
        let entry = self.entry.lock().ok()?;
        match entry.as_ref() {
            Some((k, v, stored_at)) if k == key && now.saturating_duration_since(*stored_at) < self.ttl => {
                Some(v.clone())
            }
            _ => None,
        }
    }

    /// Value for `key` regardless of age
    pub fn get_any(&self, key: &CacheKey) -> Option<Arc<V>> {
        let entry = self.entry.lock().ok()?;
        match entry.as_ref() {
            Some((k, v, _)) if k == key => Some(v.clone()),
            _ => None,
        }
    }

    /// Replace the slot with a new value
    pub fn store(&self, key: CacheKey, value: V, now: Instant) -> Arc<V> {
        let value = Arc::new(value);
        if let Ok(mut entry) = self.entry.lock() {
            *entry = Some((key, value.clone(), now));
        }
        value
    }
}

/// Records and column declarations from one fetch
#[derive(Debug, Clone)]
pub struct BoardSnapshot {
    pub records: Vec<RawRecord>,
    pub columns: Vec<BoardColumn>,
    pub fetched_at: DateTime<Utc>,
}

/// What a load produced: a snapshot, plus a warning when it is a stale fallback
#[derive(Debug, Clone)]
pub struct LoadedSnapshot {
    pub snapshot: Arc<BoardSnapshot>,
    pub warning: Option<String>,
}

/// Board source wrapper that owns the result cache
#[derive(Clone)]
pub struct CachedBoardSource {
    source: Arc<dyn BoardSource>,
    cache: Arc<ResultCache<BoardSnapshot>>,
}

impl CachedBoardSource {
    pub fn new(source: Arc<dyn BoardSource>, ttl: Duration) -> Self {
        Self {
            source,
            cache: Arc::new(ResultCache::new(ttl)),
        }
    }

    /// Load the board, serving a cached snapshot within the TTL unless `force_refresh`.
    ///
    /// When the fetch fails and an older snapshot for the same key exists, that snapshot
    /// is returned with a warning instead of the error.
    pub async fn load(&self, board_id: &str, force_refresh: bool) -> Result<LoadedSnapshot, FetchError> {
        let key = CacheKey {
            board_id: board_id.to_string(),
            token_fingerprint: self.source.credential_fingerprint(),
        };

        if !force_refresh {
            if let Some(snapshot) = self.cache.get_fresh(&key, Instant::now()) {
                tracing::debug!("Cache hit for board {}", board_id);
                return Ok(LoadedSnapshot {
                    snapshot,
                    warning: None,
                });
            }
        }

        tracing::debug!("Cache miss for board {} (forced: {})", board_id, force_refresh);
        match self.fetch_snapshot(board_id).await {
            Ok(snapshot) => {
                let snapshot = self.cache.store(key, snapshot, Instant::now());
                Ok(LoadedSnapshot {
                    snapshot,
                    warning: None,
                })
            }
            Err(err) => match self.cache.get_any(&key) {
                Some(snapshot) => {
                    tracing::warn!("Fetch failed, serving previous data for board {}: {}", board_id, err);
                    Ok(LoadedSnapshot {
                        snapshot,
                        warning: Some(format!("Showing previously loaded data: {}", err)),
                    })
                }
                None => {
                    tracing::error!("Fetch failed for board {}: {}", board_id, err);
                    Err(err)
                }
            },
        }
    }

    async fn fetch_snapshot(&self, board_id: &str) -> Result<BoardSnapshot, FetchError> {
        let columns = self.source.fetch_columns(board_id).await?;
        let records = self.source.fetch_records(board_id).await?;
        Ok(BoardSnapshot {
            records,
            columns,
            fetched_at: Utc::now(),
        })
    }
}
