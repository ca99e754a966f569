use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use crate::models::connection::{connection_id, Connection};
use crate::models::itinerary::TripItinerary;
use crate::services::EngineError;
use crate::store::DiscoveryStore;

/// Builds connection records for mutual matches.
///
/// Creation is idempotent: an existing record for the pair is returned
/// untouched. A concurrent create from the other side derives the same id
/// and an equivalent payload, so the keyed last-write-wins store write is
/// safe without coordination.
#[derive(Clone)]
pub struct ConnectionFactory {
    store: Arc<dyn DiscoveryStore>,
}

impl ConnectionFactory {
    pub fn new(store: Arc<dyn DiscoveryStore>) -> Self {
        ConnectionFactory { store }
    }

    /// Create or fetch the connection between two users, given each side's
    /// itinerary snapshot. Write failures propagate; they are never
    /// swallowed here.
    pub async fn create(
        &self,
        user1: &str,
        user2: &str,
        itinerary1: &TripItinerary,
        itinerary2: &TripItinerary,
    ) -> Result<Connection, EngineError> {
        if user1.is_empty() || user2.is_empty() {
            return Err(EngineError::InvalidInput("missing user id".to_string()));
        }
        if user1 == user2 {
            return Err(EngineError::InvalidInput(
                "cannot connect a user to themselves".to_string(),
            ));
        }
        if itinerary1.owner_uid() != user1 || itinerary2.owner_uid() != user2 {
            return Err(EngineError::InvalidInput(
                "itinerary snapshot does not belong to its user".to_string(),
            ));
        }

        let id = connection_id(user1, user2);
        if let Some(existing) = self.store.get_connection(&id).await? {
            return Ok(existing);
        }

        let mut users = vec![user1.to_string(), user2.to_string()];
        users.sort();
        let (first, second) = if users[0] == user1 {
            (itinerary1, itinerary2)
        } else {
            (itinerary2, itinerary1)
        };

        let mut itineraries = HashMap::new();
        itineraries.insert(users[0].clone(), first.clone());
        itineraries.insert(users[1].clone(), second.clone());
        let mut unread_counts = HashMap::new();
        unread_counts.insert(users[0].clone(), 0);
        unread_counts.insert(users[1].clone(), 0);

        let connection = Connection {
            id,
            itinerary_ids: vec![first.id.clone(), second.id.clone()],
            users,
            itineraries,
            unread_counts,
            created_at: Utc::now(),
        };
        self.store.put_connection(&connection).await?;
        Ok(connection)
    }
}
