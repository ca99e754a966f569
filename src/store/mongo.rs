use std::sync::Arc;

use async_trait::async_trait;
use bson::doc;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{Client, Collection};
use serde::{Deserialize, Serialize};

use crate::models::connection::Connection;
use crate::models::itinerary::TripItinerary;
use crate::models::user::{DailyUsage, UserProfile};

use super::{DiscoveryStore, KeyValueStore, PageCursor, SearchFilters, StoreError};

fn query_err(err: mongodb::error::Error) -> StoreError {
    StoreError::Query(err.to_string())
}

fn write_err(err: mongodb::error::Error) -> StoreError {
    StoreError::Write(err.to_string())
}

/// MongoDB-backed [`DiscoveryStore`]. Itineraries, user profiles and
/// connections each live in their own collection of the configured
/// database.
pub struct MongoDiscoveryStore {
    client: Arc<Client>,
    database: String,
}

impl MongoDiscoveryStore {
    pub fn new(client: Arc<Client>, database: &str) -> Self {
        MongoDiscoveryStore {
            client,
            database: database.to_string(),
        }
    }

    fn itineraries(&self) -> Collection<TripItinerary> {
        self.client.database(&self.database).collection("itineraries")
    }

    fn users(&self) -> Collection<UserProfile> {
        self.client.database(&self.database).collection("users")
    }

    fn connections(&self) -> Collection<Connection> {
        self.client.database(&self.database).collection("connections")
    }
}

#[async_trait]
impl DiscoveryStore for MongoDiscoveryStore {
    async fn search_page(
        &self,
        filters: &SearchFilters,
        after: Option<&PageCursor>,
        limit: i64,
    ) -> Result<Vec<TripItinerary>, StoreError> {
        let mut filter = doc! {
            "destination": &filters.destination,
            "endDay": { "$gte": filters.min_end_day },
        };
        for (path, value) in filters.preference_predicates() {
            filter.insert(path, value);
        }
        // Resume strictly after the cursor row under (endDay, _id) ordering.
        if let Some(cursor) = after {
            filter.insert(
                "$or",
                vec![
                    doc! { "endDay": { "$gt": cursor.end_day } },
                    doc! { "endDay": cursor.end_day, "_id": { "$gt": &cursor.id } },
                ],
            );
        }

        let cursor = self
            .itineraries()
            .find(filter)
            .sort(doc! { "endDay": 1, "_id": 1 })
            .limit(limit)
            .await
            .map_err(query_err)?;
        cursor.try_collect().await.map_err(query_err)
    }

    async fn get_itinerary(&self, id: &str) -> Result<Option<TripItinerary>, StoreError> {
        self.itineraries()
            .find_one(doc! { "_id": id })
            .await
            .map_err(query_err)
    }

    async fn insert_itinerary(&self, itinerary: &TripItinerary) -> Result<(), StoreError> {
        self.itineraries()
            .insert_one(itinerary)
            .await
            .map_err(write_err)?;
        Ok(())
    }

    async fn itineraries_for_user(&self, uid: &str) -> Result<Vec<TripItinerary>, StoreError> {
        let cursor = self
            .itineraries()
            .find(doc! { "userInfo.uid": uid })
            .sort(doc! { "createdAt": -1 })
            .await
            .map_err(query_err)?;
        cursor.try_collect().await.map_err(query_err)
    }

    async fn add_like(&self, itinerary_id: &str, liker_uid: &str) -> Result<(), StoreError> {
        let result = self
            .itineraries()
            .update_one(
                doc! { "_id": itinerary_id },
                doc! { "$addToSet": { "likes": liker_uid } },
            )
            .await
            .map_err(write_err)?;
        if result.matched_count == 0 {
            return Err(StoreError::Write(format!(
                "itinerary {} not found",
                itinerary_id
            )));
        }
        Ok(())
    }

    async fn get_user(&self, uid: &str) -> Result<Option<UserProfile>, StoreError> {
        self.users()
            .find_one(doc! { "_id": uid })
            .await
            .map_err(query_err)
    }

    async fn upsert_user(&self, profile: &UserProfile) -> Result<(), StoreError> {
        self.users()
            .replace_one(doc! { "_id": &profile.uid }, profile)
            .upsert(true)
            .await
            .map_err(write_err)?;
        Ok(())
    }

    async fn update_daily_usage(&self, uid: &str, usage: &DailyUsage) -> Result<(), StoreError> {
        let usage_doc = bson::to_bson(usage).map_err(|err| StoreError::Write(err.to_string()))?;
        self.users()
            .update_one(
                doc! { "_id": uid },
                doc! { "$set": { "dailyUsage": usage_doc } },
            )
            .upsert(true)
            .await
            .map_err(write_err)?;
        Ok(())
    }

    async fn get_connection(&self, id: &str) -> Result<Option<Connection>, StoreError> {
        self.connections()
            .find_one(doc! { "_id": id })
            .await
            .map_err(query_err)
    }

    async fn put_connection(&self, connection: &Connection) -> Result<(), StoreError> {
        self.connections()
            .replace_one(doc! { "_id": &connection.id }, connection)
            .upsert(true)
            .await
            .map_err(write_err)?;
        Ok(())
    }

    async fn connections_for_user(&self, uid: &str) -> Result<Vec<Connection>, StoreError> {
        let cursor = self
            .connections()
            .find(doc! { "users": uid })
            .sort(doc! { "createdAt": -1 })
            .await
            .map_err(query_err)?;
        cursor.try_collect().await.map_err(query_err)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.client
            .database(&self.database)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(query_err)?;
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeviceStateEntry {
    #[serde(rename = "_id")]
    key: String,
    value: String,
    updated_at: DateTime<Utc>,
}

/// Server-side stand-in for a device's local key-value storage, one
/// document per storage key in the `device_state` collection.
pub struct MongoKeyValueStore {
    client: Arc<Client>,
    database: String,
}

impl MongoKeyValueStore {
    pub fn new(client: Arc<Client>, database: &str) -> Self {
        MongoKeyValueStore {
            client,
            database: database.to_string(),
        }
    }

    fn entries(&self) -> Collection<DeviceStateEntry> {
        self.client.database(&self.database).collection("device_state")
    }
}

#[async_trait]
impl KeyValueStore for MongoKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entry = self
            .entries()
            .find_one(doc! { "_id": key })
            .await
            .map_err(query_err)?;
        Ok(entry.map(|e| e.value))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let entry = DeviceStateEntry {
            key: key.to_string(),
            value: value.to_string(),
            updated_at: Utc::now(),
        };
        self.entries()
            .replace_one(doc! { "_id": key }, &entry)
            .upsert(true)
            .await
            .map_err(write_err)?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries()
            .delete_one(doc! { "_id": key })
            .await
            .map_err(write_err)?;
        Ok(())
    }
}
