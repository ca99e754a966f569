use actix_web::{web, HttpResponse, Responder};
use bson::oid::ObjectId;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::middleware::auth_context::AuthenticatedUser;
use crate::models::itinerary::{MatchPreferences, TravelerInfo, TripItinerary};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItineraryRequest {
    pub destination: String,
    pub start_day: i64,
    pub end_day: i64,
    #[serde(default)]
    pub preferences: MatchPreferences,
}

/*
    POST /api/itineraries
*/
pub async fn create(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    input: web::Json<CreateItineraryRequest>,
) -> impl Responder {
    let input = input.into_inner();

    let destination = input.destination.trim();
    if destination.is_empty() {
        return HttpResponse::BadRequest()
            .json(json!({ "success": false, "error": "Destination is required" }));
    }
    if input.end_day < input.start_day {
        return HttpResponse::BadRequest().json(json!({
            "success": false,
            "error": "Trip must end on or after the day it starts"
        }));
    }
    if input.preferences.lower_range > input.preferences.upper_range {
        return HttpResponse::BadRequest()
            .json(json!({ "success": false, "error": "Age range is inverted" }));
    }

    // The itinerary embeds a snapshot of the poster's profile, so one has
    // to exist first.
    let profile = match state.store.get_user(&user.user_id).await {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            return HttpResponse::BadRequest().json(json!({
                "success": false,
                "error": "Create a profile before posting an itinerary"
            }))
        }
        Err(err) => {
            log::error!("profile lookup failed for {}: {}", user.user_id, err);
            return HttpResponse::InternalServerError()
                .json(json!({ "success": false, "error": "Failed to load profile" }));
        }
    };

    let now = Utc::now();
    let itinerary = TripItinerary {
        id: ObjectId::new().to_hex(),
        destination: destination.to_string(),
        start_day: input.start_day,
        end_day: input.end_day,
        user_info: TravelerInfo {
            uid: profile.uid.clone(),
            username: profile.username.clone(),
            gender: profile.gender.clone(),
            status: profile.status.clone(),
            sexual_orientation: profile.sexual_orientation.clone(),
            dob: profile.dob,
        },
        preferences: input.preferences,
        likes: vec![],
        created_at: Some(now),
        updated_at: Some(now),
    };

    match state.store.insert_itinerary(&itinerary).await {
        Ok(()) => HttpResponse::Created().json(json!({ "success": true, "data": itinerary })),
        Err(err) => {
            log::error!("itinerary insert failed for {}: {}", user.user_id, err);
            HttpResponse::InternalServerError()
                .json(json!({ "success": false, "error": "Failed to save itinerary" }))
        }
    }
}

/*
    GET /api/itineraries/mine
*/
pub async fn mine(state: web::Data<AppState>, user: AuthenticatedUser) -> impl Responder {
    match state.store.itineraries_for_user(&user.user_id).await {
        Ok(itineraries) => {
            HttpResponse::Ok().json(json!({ "success": true, "data": itineraries }))
        }
        Err(err) => {
            log::error!("itinerary list failed for {}: {}", user.user_id, err);
            HttpResponse::InternalServerError()
                .json(json!({ "success": false, "error": "Failed to load itineraries" }))
        }
    }
}

/*
    GET /api/itineraries/{id}
*/
pub async fn get_by_id(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let id = path.into_inner();
    match state.store.get_itinerary(&id).await {
        Ok(Some(itinerary)) => {
            HttpResponse::Ok().json(json!({ "success": true, "data": itinerary }))
        }
        Ok(None) => HttpResponse::NotFound()
            .json(json!({ "success": false, "error": "Itinerary not found" })),
        Err(err) => {
            log::error!("itinerary lookup failed: {}", err);
            HttpResponse::InternalServerError()
                .json(json!({ "success": false, "error": "Failed to load itinerary" }))
        }
    }
}
