use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::models::connection::Connection;
use crate::models::itinerary::TripItinerary;
use crate::models::user::{DailyUsage, UserProfile};

use super::{DiscoveryStore, KeyValueStore, PageCursor, SearchFilters, StoreError};

/// In-process [`DiscoveryStore`] with the same paging and filtering
/// semantics as the Mongo adapter. Backs the test suite and local
/// development without a database; failure toggles let tests exercise
/// the engine's degraded paths.
#[derive(Default)]
pub struct MemoryStore {
    itineraries: Mutex<HashMap<String, TripItinerary>>,
    users: Mutex<HashMap<String, UserProfile>>,
    connections: Mutex<HashMap<String, Connection>>,
    fail_reads: AtomicBool,
    fail_user_writes: AtomicBool,
    fail_itinerary_writes: AtomicBool,
    fail_connection_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_user_writes(&self, fail: bool) {
        self.fail_user_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_itinerary_writes(&self, fail: bool) {
        self.fail_itinerary_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_connection_writes(&self, fail: bool) {
        self.fail_connection_writes.store(fail, Ordering::SeqCst);
    }

    pub fn connection_count(&self) -> usize {
        self.connections.lock().unwrap().len()
    }

    fn read_gate(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Query("injected read failure".to_string()));
        }
        Ok(())
    }

    fn write_gate(&self, flag: &AtomicBool) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Write("injected write failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DiscoveryStore for MemoryStore {
    async fn search_page(
        &self,
        filters: &SearchFilters,
        after: Option<&PageCursor>,
        limit: i64,
    ) -> Result<Vec<TripItinerary>, StoreError> {
        self.read_gate()?;
        let mut rows: Vec<TripItinerary> = {
            let map = self.itineraries.lock().unwrap();
            map.values().filter(|itin| filters.matches(itin)).cloned().collect()
        };
        rows.sort_by(|a, b| (a.end_day, a.id.as_str()).cmp(&(b.end_day, b.id.as_str())));
        if let Some(cursor) = after {
            rows.retain(|itin| (itin.end_day, itin.id.as_str()) > cursor.sort_key());
        }
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn get_itinerary(&self, id: &str) -> Result<Option<TripItinerary>, StoreError> {
        self.read_gate()?;
        Ok(self.itineraries.lock().unwrap().get(id).cloned())
    }

    async fn insert_itinerary(&self, itinerary: &TripItinerary) -> Result<(), StoreError> {
        self.write_gate(&self.fail_itinerary_writes)?;
        self.itineraries
            .lock()
            .unwrap()
            .insert(itinerary.id.clone(), itinerary.clone());
        Ok(())
    }

    async fn itineraries_for_user(&self, uid: &str) -> Result<Vec<TripItinerary>, StoreError> {
        self.read_gate()?;
        let mut rows: Vec<TripItinerary> = {
            let map = self.itineraries.lock().unwrap();
            map.values().filter(|itin| itin.owner_uid() == uid).cloned().collect()
        };
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn add_like(&self, itinerary_id: &str, liker_uid: &str) -> Result<(), StoreError> {
        self.write_gate(&self.fail_itinerary_writes)?;
        let mut map = self.itineraries.lock().unwrap();
        let itin = map.get_mut(itinerary_id).ok_or_else(|| {
            StoreError::Write(format!("itinerary {} not found", itinerary_id))
        })?;
        if !itin.has_liked(liker_uid) {
            itin.likes.push(liker_uid.to_string());
        }
        Ok(())
    }

    async fn get_user(&self, uid: &str) -> Result<Option<UserProfile>, StoreError> {
        self.read_gate()?;
        Ok(self.users.lock().unwrap().get(uid).cloned())
    }

    async fn upsert_user(&self, profile: &UserProfile) -> Result<(), StoreError> {
        self.write_gate(&self.fail_user_writes)?;
        self.users
            .lock()
            .unwrap()
            .insert(profile.uid.clone(), profile.clone());
        Ok(())
    }

    async fn update_daily_usage(&self, uid: &str, usage: &DailyUsage) -> Result<(), StoreError> {
        self.write_gate(&self.fail_user_writes)?;
        let mut map = self.users.lock().unwrap();
        let profile = map.entry(uid.to_string()).or_insert_with(|| UserProfile {
            uid: uid.to_string(),
            username: String::new(),
            email: None,
            gender: None,
            status: None,
            sexual_orientation: None,
            dob: None,
            subscription: None,
            daily_usage: None,
            created_at: None,
            updated_at: None,
        });
        profile.daily_usage = Some(usage.clone());
        Ok(())
    }

    async fn get_connection(&self, id: &str) -> Result<Option<Connection>, StoreError> {
        self.read_gate()?;
        Ok(self.connections.lock().unwrap().get(id).cloned())
    }

    async fn put_connection(&self, connection: &Connection) -> Result<(), StoreError> {
        self.write_gate(&self.fail_connection_writes)?;
        self.connections
            .lock()
            .unwrap()
            .insert(connection.id.clone(), connection.clone());
        Ok(())
    }

    async fn connections_for_user(&self, uid: &str) -> Result<Vec<Connection>, StoreError> {
        self.read_gate()?;
        let mut rows: Vec<Connection> = {
            let map = self.connections.lock().unwrap();
            map.values().filter(|conn| conn.involves(uid)).cloned().collect()
        };
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.read_gate()
    }
}

/// In-process [`KeyValueStore`] counterpart. Counts `set` calls so tests
/// can assert how often the viewed cache actually persists.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Raw stored payload, for test inspection.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    /// Seed a payload directly, bypassing the write counter.
    pub fn preload(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Write("injected write failure".to_string()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Write("injected write failure".to_string()));
        }
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}
