use std::fmt;

use async_trait::async_trait;

use crate::models::connection::Connection;
use crate::models::itinerary::{Preference, TripItinerary};
use crate::models::user::{DailyUsage, UserProfile};

pub mod memory;
pub mod mongo;

#[derive(Debug)]
pub enum StoreError {
    Query(String),
    Write(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Query(msg) => write!(f, "query failed: {}", msg),
            StoreError::Write(msg) => write!(f, "write failed: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// Resume point for paged candidate reads. Pages are ordered by
/// `(end_day asc, id asc)`; the cursor names the last row already seen and
/// the next page starts strictly after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    pub end_day: i64,
    pub id: String,
}

impl PageCursor {
    pub fn from_itinerary(itin: &TripItinerary) -> Self {
        PageCursor {
            end_day: itin.end_day,
            id: itin.id.clone(),
        }
    }

    pub fn sort_key(&self) -> (i64, &str) {
        (self.end_day, self.id.as_str())
    }
}

/// Store-evaluated candidate predicates, derived from the searching user's
/// own itinerary. Equality criteria set to `Any` are dropped from the query
/// rather than matched against the sentinel.
#[derive(Debug, Clone)]
pub struct SearchFilters {
    pub destination: String,
    pub gender: Preference,
    pub status: Preference,
    pub sexual_orientation: Preference,
    /// Candidates must still be in `destination` on this day or later.
    pub min_end_day: i64,
}

impl SearchFilters {
    pub fn for_itinerary(own: &TripItinerary) -> Self {
        SearchFilters {
            destination: own.destination.clone(),
            gender: own.preferences.gender.clone(),
            status: own.preferences.status.clone(),
            sexual_orientation: own.preferences.sexual_orientation.clone(),
            min_end_day: own.start_day,
        }
    }

    /// Equality predicates as `(document field path, required value)` pairs,
    /// with `Any` criteria already filtered out.
    pub fn preference_predicates(&self) -> Vec<(&'static str, &str)> {
        let criteria = [
            ("userInfo.gender", &self.gender),
            ("userInfo.status", &self.status),
            ("userInfo.sexualOrientation", &self.sexual_orientation),
        ];
        criteria
            .iter()
            .filter_map(|(path, pref)| match pref {
                Preference::Exactly(value) => Some((*path, value.as_str())),
                Preference::Any => None,
            })
            .collect()
    }

    /// In-process evaluation of the same predicates the document query
    /// expresses. Adapters that filter in memory must agree with adapters
    /// that filter in the store.
    pub fn matches(&self, itin: &TripItinerary) -> bool {
        itin.destination == self.destination
            && itin.end_day >= self.min_end_day
            && self.gender.matches(itin.user_info.gender.as_deref())
            && self.status.matches(itin.user_info.status.as_deref())
            && self
                .sexual_orientation
                .matches(itin.user_info.sexual_orientation.as_deref())
    }
}

/// Persistence seam for the discovery engine. One backing document store
/// holds itineraries, user profiles and connections; everything the engine
/// reads or writes goes through here.
#[async_trait]
pub trait DiscoveryStore: Send + Sync {
    /// One page of candidates matching `filters`, ordered by
    /// `(end_day asc, id asc)`, starting strictly after `after` when given.
    /// Returns raw store matches; per-user exclusions happen in the engine.
    async fn search_page(
        &self,
        filters: &SearchFilters,
        after: Option<&PageCursor>,
        limit: i64,
    ) -> Result<Vec<TripItinerary>, StoreError>;

    async fn get_itinerary(&self, id: &str) -> Result<Option<TripItinerary>, StoreError>;

    async fn insert_itinerary(&self, itinerary: &TripItinerary) -> Result<(), StoreError>;

    async fn itineraries_for_user(&self, uid: &str) -> Result<Vec<TripItinerary>, StoreError>;

    /// Set-union a liker onto an itinerary's `likes`. Re-liking is a no-op.
    async fn add_like(&self, itinerary_id: &str, liker_uid: &str) -> Result<(), StoreError>;

    async fn get_user(&self, uid: &str) -> Result<Option<UserProfile>, StoreError>;

    async fn upsert_user(&self, profile: &UserProfile) -> Result<(), StoreError>;

    /// Overwrite a user's daily usage counter, creating the holder document
    /// if it does not exist yet.
    async fn update_daily_usage(&self, uid: &str, usage: &DailyUsage) -> Result<(), StoreError>;

    async fn get_connection(&self, id: &str) -> Result<Option<Connection>, StoreError>;

    /// Keyed full-document write, last writer wins.
    async fn put_connection(&self, connection: &Connection) -> Result<(), StoreError>;

    async fn connections_for_user(&self, uid: &str) -> Result<Vec<Connection>, StoreError>;

    /// Liveness probe for the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Small string key-value store backing the per-device viewed cache.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}
