use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use tokio::sync::Mutex;

use crate::store::{KeyValueStore, StoreError};

#[derive(Default)]
struct ViewedState {
    hydrated: bool,
    ids: HashSet<String>,
}

/// Per-device set of already-seen itinerary ids, mirrored in memory over a
/// persistent key-value backing. Hydrated lazily on first use; afterwards
/// the in-memory set is authoritative until [`ViewedCache::invalidate`].
///
/// Mutations persist the full serialized set, so a write that is lost to a
/// storage error is retried implicitly by the next successful mutation.
pub struct ViewedCache {
    kv: Arc<dyn KeyValueStore>,
    storage_key: String,
    state: Mutex<ViewedState>,
}

impl ViewedCache {
    pub fn new(kv: Arc<dyn KeyValueStore>, device_id: &str) -> Self {
        ViewedCache {
            kv,
            storage_key: format!("viewed_itineraries:{}", device_id),
            state: Mutex::new(ViewedState::default()),
        }
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub async fn has(&self, id: &str) -> bool {
        let mut state = self.state.lock().await;
        self.hydrate(&mut state).await;
        state.ids.contains(id)
    }

    /// Record one seen id. No-op (and no storage write) when the id is
    /// already present or empty.
    pub async fn add(&self, id: &str) -> Result<(), StoreError> {
        if id.is_empty() {
            return Ok(());
        }
        let mut state = self.state.lock().await;
        self.hydrate(&mut state).await;
        if !state.ids.insert(id.to_string()) {
            return Ok(());
        }
        self.persist(&state).await
    }

    /// Record a batch of seen ids with a single storage write, skipping
    /// empties and duplicates. No write happens if nothing changed.
    pub async fn add_all(&self, ids: &[String]) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        self.hydrate(&mut state).await;
        let mut changed = false;
        for id in ids {
            if !id.is_empty() && state.ids.insert(id.clone()) {
                changed = true;
            }
        }
        if changed {
            self.persist(&state).await
        } else {
            Ok(())
        }
    }

    /// Forget everything, in memory and in storage. Only ever triggered by
    /// an explicit user action.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.ids.clear();
        state.hydrated = true;
        self.kv.remove(&self.storage_key).await
    }

    pub async fn len(&self) -> usize {
        let mut state = self.state.lock().await;
        self.hydrate(&mut state).await;
        state.ids.len()
    }

    /// Drop the in-memory mirror so the next call re-reads storage.
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        state.hydrated = false;
        state.ids.clear();
    }

    async fn hydrate(&self, state: &mut ViewedState) {
        if state.hydrated {
            return;
        }
        state.ids = match self.kv.get(&self.storage_key).await {
            Ok(Some(raw)) => parse_viewed_payload(&raw),
            Ok(None) => HashSet::new(),
            Err(err) => {
                log::warn!("viewed cache load failed for {}: {}", self.storage_key, err);
                HashSet::new()
            }
        };
        state.hydrated = true;
    }

    async fn persist(&self, state: &ViewedState) -> Result<(), StoreError> {
        let mut ids: Vec<&String> = state.ids.iter().collect();
        ids.sort();
        let payload =
            serde_json::to_string(&ids).map_err(|err| StoreError::Write(err.to_string()))?;
        self.kv.set(&self.storage_key, &payload).await
    }
}

/// Decode a persisted viewed set. Entries written by older app versions may
/// be nulls, empty strings or `{id: string}` wrappers; those are unwrapped
/// or dropped. A payload that is not a JSON array reads as an empty set.
fn parse_viewed_payload(raw: &str) -> HashSet<String> {
    let Ok(values) = serde_json::from_str::<Vec<serde_json::Value>>(raw) else {
        return HashSet::new();
    };
    values
        .into_iter()
        .filter_map(|value| match value {
            serde_json::Value::String(s) if !s.is_empty() => Some(s),
            serde_json::Value::Object(map) => match map.get("id") {
                Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s.clone()),
                _ => None,
            },
            _ => None,
        })
        .collect()
}

/// Hands out one shared [`ViewedCache`] per device key, so each device's
/// set is hydrated once per process.
pub struct ViewedRegistry {
    kv: Arc<dyn KeyValueStore>,
    /// One cache per device key seen, held for the life of the process.
    caches: RwLock<HashMap<String, Arc<ViewedCache>>>,
}

impl ViewedRegistry {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        ViewedRegistry {
            kv,
            caches: RwLock::new(HashMap::new()),
        }
    }

    pub fn for_device(&self, device_id: &str) -> Arc<ViewedCache> {
        if let Some(cache) = self.caches.read().unwrap().get(device_id) {
            return cache.clone();
        }
        let mut caches = self.caches.write().unwrap();
        caches
            .entry(device_id.to_string())
            .or_insert_with(|| Arc::new(ViewedCache::new(self.kv.clone(), device_id)))
            .clone()
    }
}
