use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;
use std::collections::HashMap;
use std::env;

use crate::state::AppState;

#[derive(Serialize)]
struct HealthStatus {
    status: String,
    services: HashMap<String, ServiceStatus>,
    environment: String,
    version: String,
}

#[derive(Serialize, Clone)]
struct ServiceStatus {
    status: String,
    details: Option<String>,
}

pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let mut health = HealthStatus {
        status: "ok".to_string(),
        services: HashMap::new(),
        environment: env::var("RUST_ENV").unwrap_or("development".to_string()),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let store_result = check_store(&state).await;
    if store_result.status != "ok" {
        health.status = "degraded".to_string();
    }
    health.services.insert("store".to_string(), store_result);

    HttpResponse::Ok().json(health)
}

async fn check_store(state: &web::Data<AppState>) -> ServiceStatus {
    match state.store.ping().await {
        Ok(()) => ServiceStatus {
            status: "ok".to_string(),
            details: Some("Store reachable".to_string()),
        },
        Err(err) => {
            log::error!("store health check failed: {}", err);
            ServiceStatus {
                status: "error".to_string(),
                details: Some(format!("Failed to reach store: {}", err)),
            }
        }
    }
}
