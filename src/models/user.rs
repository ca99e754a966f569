use bson::Bson;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Premium,
    #[default]
    #[serde(other)]
    Free,
}

/// Subscription state written by the billing integration. `end_date` has
/// drifted across writer versions, so it is kept loosely typed and parsed
/// on read by [`Subscription::end_date_utc`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(default)]
    pub tier: SubscriptionTier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<Bson>,
}

impl Subscription {
    pub fn end_date_utc(&self) -> Option<DateTime<Utc>> {
        self.end_date.as_ref().and_then(parse_flexible_timestamp)
    }
}

/// Best-effort timestamp decoding for legacy subscription documents.
/// Accepts native datetimes, RFC 3339 strings, epoch-second numbers and
/// `{seconds}` / `{_seconds}` wrapper objects. Anything else is `None`.
pub fn parse_flexible_timestamp(value: &Bson) -> Option<DateTime<Utc>> {
    match value {
        Bson::DateTime(dt) => Some(dt.to_chrono()),
        Bson::String(raw) => DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Bson::Int32(secs) => DateTime::from_timestamp(*secs as i64, 0),
        Bson::Int64(secs) => DateTime::from_timestamp(*secs, 0),
        Bson::Double(secs) => DateTime::from_timestamp(*secs as i64, 0),
        Bson::Timestamp(ts) => DateTime::from_timestamp(ts.time as i64, 0),
        Bson::Document(doc) => {
            let secs = ["seconds", "_seconds"]
                .iter()
                .find_map(|key| doc.get(key))
                .and_then(bson_to_seconds)?;
            DateTime::from_timestamp(secs, 0)
        }
        _ => None,
    }
}

fn bson_to_seconds(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(n) => Some(*n as i64),
        Bson::Int64(n) => Some(*n),
        Bson::Double(n) => Some(*n as i64),
        _ => None,
    }
}

/// Usage counter for the rolling daily action quota. `date` is a UTC
/// calendar day in `YYYY-MM-DD` form; a stale date means the counter
/// has implicitly reset to zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyUsage {
    pub date: String,
    pub view_count: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub uid: String,
    /// Defaulted on read so a quota-only holder document still decodes.
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sexual_orientation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<Subscription>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_usage: Option<DailyUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Premium means an exact `premium` tier with an end date that parses
    /// and has not passed. Unknown tiers and unparsable dates count as free.
    pub fn is_premium(&self, now: DateTime<Utc>) -> bool {
        match &self.subscription {
            Some(sub) if sub.tier == SubscriptionTier::Premium => sub
                .end_date_utc()
                .map(|end| end >= now)
                .unwrap_or(false),
            _ => false,
        }
    }
}
