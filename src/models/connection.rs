use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::itinerary::TripItinerary;

/// Deterministic connection id for a pair of users: both uids sorted
/// lexicographically and joined with an underscore, so either side of a
/// mutual match derives the same document id.
pub fn connection_id(user1: &str, user2: &str) -> String {
    let mut pair = [user1, user2];
    pair.sort_unstable();
    pair.join("_")
}

/// A mutual match between two travelers. Itineraries are stored as
/// point-in-time snapshots keyed by uid; later edits to the source
/// itineraries do not flow into an existing connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    #[serde(rename = "_id")]
    pub id: String,
    pub users: Vec<String>,
    pub itinerary_ids: Vec<String>,
    pub itineraries: HashMap<String, TripItinerary>,
    /// Unread chat counters keyed by uid, zeroed at creation.
    pub unread_counts: HashMap<String, i32>,
    pub created_at: DateTime<Utc>,
}

impl Connection {
    pub fn involves(&self, uid: &str) -> bool {
        self.users.iter().any(|user| user == uid)
    }

    /// The other participant's uid, when `uid` is part of this connection.
    pub fn partner_of(&self, uid: &str) -> Option<&str> {
        if !self.involves(uid) {
            return None;
        }
        self.users
            .iter()
            .map(String::as_str)
            .find(|user| *user != uid)
    }
}
