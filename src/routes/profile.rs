use actix_web::{web, HttpResponse, Responder};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::middleware::auth_context::AuthenticatedUser;
use crate::models::user::UserProfile;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub sexual_orientation: Option<String>,
    #[serde(default)]
    pub dob: Option<NaiveDate>,
}

/*
    GET /api/users/me
*/
pub async fn me(state: web::Data<AppState>, user: AuthenticatedUser) -> impl Responder {
    match state.store.get_user(&user.user_id).await {
        Ok(Some(profile)) => HttpResponse::Ok().json(json!({ "success": true, "data": profile })),
        Ok(None) => {
            HttpResponse::NotFound().json(json!({ "success": false, "error": "Profile not found" }))
        }
        Err(err) => {
            log::error!("profile lookup failed for {}: {}", user.user_id, err);
            HttpResponse::InternalServerError()
                .json(json!({ "success": false, "error": "Failed to load profile" }))
        }
    }
}

/*
    PUT /api/users/me
*/
pub async fn update_me(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    input: web::Json<UpdateProfileRequest>,
) -> impl Responder {
    let input = input.into_inner();
    if input.username.trim().is_empty() {
        return HttpResponse::BadRequest()
            .json(json!({ "success": false, "error": "Username is required" }));
    }

    // Subscription and usage are written by billing and the quota tracker,
    // never by this endpoint.
    let existing = match state.store.get_user(&user.user_id).await {
        Ok(existing) => existing,
        Err(err) => {
            log::error!("profile lookup failed for {}: {}", user.user_id, err);
            return HttpResponse::InternalServerError()
                .json(json!({ "success": false, "error": "Failed to load profile" }));
        }
    };

    let now = Utc::now();
    let profile = UserProfile {
        uid: user.user_id.clone(),
        username: input.username.trim().to_string(),
        email: input.email,
        gender: input.gender,
        status: input.status,
        sexual_orientation: input.sexual_orientation,
        dob: input.dob,
        subscription: existing.as_ref().and_then(|p| p.subscription.clone()),
        daily_usage: existing.as_ref().and_then(|p| p.daily_usage.clone()),
        created_at: existing.as_ref().and_then(|p| p.created_at).or(Some(now)),
        updated_at: Some(now),
    };

    match state.store.upsert_user(&profile).await {
        Ok(()) => HttpResponse::Ok().json(json!({ "success": true, "data": profile })),
        Err(err) => {
            log::error!("profile save failed for {}: {}", user.user_id, err);
            HttpResponse::InternalServerError()
                .json(json!({ "success": false, "error": "Failed to save profile" }))
        }
    }
}
