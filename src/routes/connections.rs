use actix_web::{web, HttpResponse, Responder};
use serde_json::json;

use crate::middleware::auth_context::AuthenticatedUser;
use crate::state::AppState;

/*
    GET /api/connections
*/
pub async fn list(state: web::Data<AppState>, user: AuthenticatedUser) -> impl Responder {
    match state.store.connections_for_user(&user.user_id).await {
        Ok(connections) => {
            HttpResponse::Ok().json(json!({ "success": true, "data": connections }))
        }
        Err(err) => {
            log::error!("connection list failed for {}: {}", user.user_id, err);
            HttpResponse::InternalServerError()
                .json(json!({ "success": false, "error": "Failed to load connections" }))
        }
    }
}
