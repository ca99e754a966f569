use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;

use crate::middleware::auth_context::AuthenticatedUser;
use crate::services::match_service::MatchOutcome;
use crate::services::EngineError;
use crate::state::AppState;

/// Shown for both quota exhaustion and swipe-time store trouble; the app
/// presents one retry/upgrade prompt for either.
pub const SWIPE_UNAVAILABLE: &str =
    "You're out of swipes for today. Try again later or upgrade to premium.";

/// Shown when the mutual like landed but the connection write did not.
pub const MATCH_SETUP_ISSUE: &str =
    "It's a match, but we had trouble setting it up. Check your matches list shortly.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub itinerary_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwipeRequest {
    pub candidate_id: String,
}

/*
    POST /api/discovery/search
*/
pub async fn search(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    input: web::Json<SearchRequest>,
) -> impl Responder {
    let own = match state.store.get_itinerary(&input.itinerary_id).await {
        Ok(Some(itinerary)) => itinerary,
        Ok(None) => {
            return HttpResponse::NotFound()
                .json(json!({ "success": false, "error": "Itinerary not found" }))
        }
        Err(err) => {
            log::error!("itinerary lookup failed: {}", err);
            return HttpResponse::InternalServerError()
                .json(json!({ "success": false, "error": "Failed to load itinerary" }));
        }
    };

    if own.owner_uid() != user.user_id {
        return HttpResponse::Forbidden().json(json!({
            "success": false,
            "error": "You can only search from your own itinerary"
        }));
    }

    let viewed = state.viewed.for_device(&user.device_id);
    match state.discovery.search(&user.user_id, own, viewed).await {
        Ok(summary) => HttpResponse::Ok().json(json!({
            "success": true,
            "data": { "count": summary.count, "candidate": summary.candidate }
        })),
        Err(EngineError::InvalidInput(msg)) => {
            HttpResponse::BadRequest().json(json!({ "success": false, "error": msg }))
        }
        Err(err) => {
            log::error!("discovery search failed for {}: {}", user.user_id, err);
            HttpResponse::InternalServerError()
                .json(json!({ "success": false, "error": err.to_string() }))
        }
    }
}

/*
    GET /api/discovery/current
*/
pub async fn current(state: web::Data<AppState>, user: AuthenticatedUser) -> impl Responder {
    let candidate = state.discovery.current(&user.user_id).await;
    HttpResponse::Ok().json(json!({ "success": true, "data": { "candidate": candidate } }))
}

/*
    POST /api/discovery/advance
*/
pub async fn advance(state: web::Data<AppState>, user: AuthenticatedUser) -> impl Responder {
    let candidate = state.discovery.advance(&user.user_id).await;
    HttpResponse::Ok().json(json!({ "success": true, "data": { "candidate": candidate } }))
}

/*
    POST /api/discovery/accept
*/
pub async fn accept(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    input: web::Json<SwipeRequest>,
) -> impl Responder {
    let session = match state.discovery.session_view(&user.user_id).await {
        Some(session) => session,
        None => {
            return HttpResponse::BadRequest()
                .json(json!({ "success": false, "error": "No active discovery session" }))
        }
    };

    let candidate = match state.store.get_itinerary(&input.candidate_id).await {
        Ok(Some(candidate)) => candidate,
        Ok(None) => {
            return HttpResponse::NotFound()
                .json(json!({ "success": false, "error": "Candidate not found" }))
        }
        Err(err) => {
            log::warn!("candidate lookup failed: {}", err);
            return HttpResponse::Ok()
                .json(json!({ "success": false, "error": SWIPE_UNAVAILABLE }));
        }
    };

    let outcome = state
        .matcher
        .accept(
            &candidate,
            &user.user_id,
            &session.my_itinerary_id,
            session.viewed.as_ref(),
        )
        .await;

    match outcome {
        Ok(outcome) => {
            // The swipe is recorded either way, so the cursor moves on.
            let next = state.discovery.advance(&user.user_id).await;
            let body = match outcome {
                MatchOutcome::NoMatch => json!({
                    "success": true,
                    "data": { "outcome": "no_match", "next": next }
                }),
                MatchOutcome::Matched(connection) => json!({
                    "success": true,
                    "data": { "outcome": "matched", "connection": connection, "next": next }
                }),
                MatchOutcome::MatchFailed { partner_uid, .. } => json!({
                    "success": true,
                    "data": {
                        "outcome": "match_failed",
                        "partnerUid": partner_uid,
                        "message": MATCH_SETUP_ISSUE,
                        "next": next
                    }
                }),
            };
            HttpResponse::Ok().json(body)
        }
        Err(EngineError::InvalidInput(msg)) => {
            HttpResponse::BadRequest().json(json!({ "success": false, "error": msg }))
        }
        Err(EngineError::QuotaExceeded) => {
            HttpResponse::Ok().json(json!({ "success": false, "error": SWIPE_UNAVAILABLE }))
        }
        Err(err) => {
            log::warn!("accept failed for {}: {}", user.user_id, err);
            HttpResponse::Ok().json(json!({ "success": false, "error": SWIPE_UNAVAILABLE }))
        }
    }
}

/*
    POST /api/discovery/reject
*/
pub async fn reject(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    input: web::Json<SwipeRequest>,
) -> impl Responder {
    let session = match state.discovery.session_view(&user.user_id).await {
        Some(session) => session,
        None => {
            return HttpResponse::BadRequest()
                .json(json!({ "success": false, "error": "No active discovery session" }))
        }
    };

    let outcome = state
        .matcher
        .reject(&input.candidate_id, &user.user_id, session.viewed.as_ref())
        .await;

    match outcome {
        Ok(()) => {
            let next = state.discovery.advance(&user.user_id).await;
            HttpResponse::Ok().json(json!({
                "success": true,
                "data": { "outcome": "rejected", "next": next }
            }))
        }
        Err(EngineError::InvalidInput(msg)) => {
            HttpResponse::BadRequest().json(json!({ "success": false, "error": msg }))
        }
        Err(EngineError::QuotaExceeded) => {
            HttpResponse::Ok().json(json!({ "success": false, "error": SWIPE_UNAVAILABLE }))
        }
        Err(err) => {
            log::warn!("reject failed for {}: {}", user.user_id, err);
            HttpResponse::Ok().json(json!({ "success": false, "error": SWIPE_UNAVAILABLE }))
        }
    }
}

/*
    GET /api/discovery/quota
*/
pub async fn quota(state: web::Data<AppState>, user: AuthenticatedUser) -> impl Responder {
    let profile = match state.store.get_user(&user.user_id).await {
        Ok(profile) => profile,
        Err(err) => {
            log::error!("profile lookup failed for {}: {}", user.user_id, err);
            return HttpResponse::InternalServerError()
                .json(json!({ "success": false, "error": "Failed to load usage" }));
        }
    };

    // A user without a profile document has not swiped yet today.
    let (remaining, limit_reached, premium) = match &profile {
        Some(profile) => (
            state.quota.remaining_today(profile),
            state.quota.has_reached_limit(profile),
            profile.is_premium(chrono::Utc::now()),
        ),
        None => (Some(state.quota.daily_limit()), false, false),
    };

    HttpResponse::Ok().json(json!({
        "success": true,
        "data": {
            "limit": state.quota.daily_limit(),
            "remaining": remaining,
            "limitReached": limit_reached,
            "premium": premium
        }
    }))
}

/*
    DELETE /api/discovery/viewed
*/
pub async fn clear_viewed(state: web::Data<AppState>, user: AuthenticatedUser) -> impl Responder {
    let viewed = state.viewed.for_device(&user.device_id);
    match viewed.clear().await {
        Ok(()) => HttpResponse::Ok().json(json!({ "success": true })),
        Err(err) => {
            log::warn!("viewed reset failed for device {}: {}", user.device_id, err);
            HttpResponse::InternalServerError()
                .json(json!({ "success": false, "error": "Could not clear viewed history" }))
        }
    }
}
