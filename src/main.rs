use std::env;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;

use tripmate_api::db;
use tripmate_api::routes;
use tripmate_api::services::config::EngineConfig;
use tripmate_api::state::AppState;
use tripmate_api::store::mongo::{MongoDiscoveryStore, MongoKeyValueStore};
use tripmate_api::store::{DiscoveryStore, KeyValueStore};

const HOST: &str = "0.0.0.0";
const PORT: u16 = 8080;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    if cfg!(debug_assertions) {
        dotenv::dotenv().ok();
    }

    let host = env::var("HOST").unwrap_or_else(|_| HOST.to_string());
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| PORT.to_string())
        .parse()
        .unwrap_or(PORT);

    let config = EngineConfig::from_env();
    let mongo_uri = env::var("MONGODB_URI").expect("MONGODB_URI must be set");
    let client = db::mongo::create_mongo_client(&mongo_uri, &config.database).await;

    let store: Arc<dyn DiscoveryStore> =
        Arc::new(MongoDiscoveryStore::new(client.clone(), &config.database));
    let kv: Arc<dyn KeyValueStore> =
        Arc::new(MongoKeyValueStore::new(client, &config.database));
    let state = web::Data::new(AppState::new(store, kv, config));

    log::info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .app_data(state.clone())
            .configure(routes::configure)
    })
    .bind((host, port))?
    .run()
    .await
}
