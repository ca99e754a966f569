use std::sync::Arc;

use actix_web::web;
use chrono::{Datelike, NaiveDate, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};

use tripmate_api::middleware::auth::Claims;
use tripmate_api::models::itinerary::{MatchPreferences, TravelerInfo, TripItinerary};
use tripmate_api::models::user::UserProfile;
use tripmate_api::routes;
use tripmate_api::services::config::EngineConfig;
use tripmate_api::state::AppState;
use tripmate_api::store::memory::{MemoryKeyValueStore, MemoryStore};
use tripmate_api::store::{DiscoveryStore, KeyValueStore};

/// Real application state over the in-memory store, so route tests cover
/// the same code paths the server runs.
pub struct TestApp {
    pub state: web::Data<AppState>,
    pub store: Arc<MemoryStore>,
    pub kv: Arc<MemoryKeyValueStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let kv = Arc::new(MemoryKeyValueStore::new());
        let state = web::Data::new(AppState::new(
            store.clone() as Arc<dyn DiscoveryStore>,
            kv.clone() as Arc<dyn KeyValueStore>,
            config,
        ));

        Self { state, store, kv }
    }

    pub fn create_app(
        &self,
    ) -> actix_web::App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        actix_web::App::new()
            .app_data(self.state.clone())
            .configure(routes::configure)
    }
}

fn jwt_secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| "default_secret".to_string())
}

pub fn bearer_token(uid: &str, email: &str) -> String {
    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: email.to_string(),
        exp: now + 3600,
        iat: now,
        user_id: uid.to_string(),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret().as_bytes()),
    )
    .expect("failed to sign test token");
    format!("Bearer {}", token)
}

pub fn expired_bearer_token(uid: &str) -> String {
    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: format!("{}@example.com", uid),
        exp: now - 7200,
        iat: now - 7300,
        user_id: uid.to_string(),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret().as_bytes()),
    )
    .expect("failed to sign test token");
    format!("Bearer {}", token)
}

/// January 1st keeps the age stable regardless of the test date.
pub fn dob_for_age(age: i32) -> NaiveDate {
    let today = Utc::now().date_naive();
    NaiveDate::from_ymd_opt(today.year() - age, 1, 1).unwrap()
}

pub fn profile(uid: &str, username: &str) -> UserProfile {
    UserProfile {
        uid: uid.to_string(),
        username: username.to_string(),
        email: Some(format!("{}@example.com", uid)),
        gender: None,
        status: None,
        sexual_orientation: None,
        dob: Some(dob_for_age(30)),
        subscription: None,
        daily_usage: None,
        created_at: Some(Utc::now()),
        updated_at: Some(Utc::now()),
    }
}

pub fn itinerary(id: &str, uid: &str, destination: &str, start: i64, end: i64) -> TripItinerary {
    TripItinerary {
        id: id.to_string(),
        destination: destination.to_string(),
        start_day: start,
        end_day: end,
        user_info: TravelerInfo {
            uid: uid.to_string(),
            username: uid.to_string(),
            gender: None,
            status: None,
            sexual_orientation: None,
            dob: Some(dob_for_age(30)),
        },
        preferences: MatchPreferences::default(),
        likes: vec![],
        created_at: Some(Utc::now()),
        updated_at: Some(Utc::now()),
    }
}
