use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Stored sentinel meaning "no preference" on a match criterion.
pub const NO_PREFERENCE: &str = "No Preference";

/// A single match criterion. `Any` matches every candidate value,
/// `Exactly` requires an equality match on the stored string.
///
/// Wire and document form is a plain string: the empty string and the
/// `"No Preference"` sentinel both read back as `Any`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Preference {
    Any,
    Exactly(String),
}

impl Default for Preference {
    fn default() -> Self {
        Preference::Any
    }
}

impl From<String> for Preference {
    fn from(value: String) -> Self {
        if value.is_empty() || value == NO_PREFERENCE {
            Preference::Any
        } else {
            Preference::Exactly(value)
        }
    }
}

impl From<Preference> for String {
    fn from(pref: Preference) -> Self {
        match pref {
            Preference::Any => NO_PREFERENCE.to_string(),
            Preference::Exactly(value) => value,
        }
    }
}

impl Preference {
    /// Whether a candidate's stored value satisfies this criterion.
    /// A missing candidate value only passes an `Any` criterion.
    pub fn matches(&self, value: Option<&str>) -> bool {
        match self {
            Preference::Any => true,
            Preference::Exactly(expected) => value == Some(expected.as_str()),
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Preference::Any)
    }
}

/// Traveler details embedded in an itinerary at posting time. This is a
/// snapshot of the owner's profile, not a live reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelerInfo {
    pub uid: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sexual_orientation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob: Option<NaiveDate>,
}

impl TravelerInfo {
    /// Whole years of age as of `today`, when a birth date is on record.
    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        self.dob.and_then(|dob| today.years_since(dob))
    }
}

/// Who the itinerary owner wants to be matched with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchPreferences {
    #[serde(default)]
    pub gender: Preference,
    #[serde(default)]
    pub status: Preference,
    #[serde(default)]
    pub sexual_orientation: Preference,
    pub lower_range: u32,
    pub upper_range: u32,
}

impl Default for MatchPreferences {
    fn default() -> Self {
        MatchPreferences {
            gender: Preference::Any,
            status: Preference::Any,
            sexual_orientation: Preference::Any,
            lower_range: 18,
            upper_range: 99,
        }
    }
}

impl MatchPreferences {
    /// Candidates without a known age never pass an age-bounded filter.
    pub fn age_allows(&self, age: Option<u32>) -> bool {
        match age {
            Some(age) => age >= self.lower_range && age <= self.upper_range,
            None => false,
        }
    }
}

/// A posted trip. `start_day` and `end_day` are inclusive day numbers on a
/// shared application epoch, so date overlap reduces to integer comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripItinerary {
    #[serde(rename = "_id")]
    pub id: String,
    pub destination: String,
    pub start_day: i64,
    pub end_day: i64,
    pub user_info: TravelerInfo,
    pub preferences: MatchPreferences,
    /// Uids of users who liked this itinerary. Grows set-wise, never shrinks.
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl TripItinerary {
    pub fn owner_uid(&self) -> &str {
        &self.user_info.uid
    }

    pub fn day_span(&self) -> i64 {
        self.end_day - self.start_day + 1
    }

    pub fn has_liked(&self, uid: &str) -> bool {
        self.likes.iter().any(|liker| liker == uid)
    }
}
