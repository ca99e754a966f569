use actix_web::web;

use crate::middleware::auth::AuthMiddleware;

pub mod connections;
pub mod discovery;
pub mod health;
pub mod itinerary;
pub mod profile;

/// Full route tree, shared by the server binary and the test harness so the
/// two never drift.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health::health_check)).service(
        web::scope("/api")
            .wrap(AuthMiddleware)
            .service(
                web::scope("/discovery")
                    .route("/search", web::post().to(discovery::search))
                    .route("/current", web::get().to(discovery::current))
                    .route("/advance", web::post().to(discovery::advance))
                    .route("/accept", web::post().to(discovery::accept))
                    .route("/reject", web::post().to(discovery::reject))
                    .route("/quota", web::get().to(discovery::quota))
                    .route("/viewed", web::delete().to(discovery::clear_viewed)),
            )
            .service(
                web::scope("/itineraries")
                    .route("", web::post().to(itinerary::create))
                    .route("/mine", web::get().to(itinerary::mine))
                    .route("/{id}", web::get().to(itinerary::get_by_id)),
            )
            .route("/connections", web::get().to(connections::list))
            .service(
                web::scope("/users")
                    .route("/me", web::get().to(profile::me))
                    .route("/me", web::put().to(profile::update_me)),
            ),
    );
}
