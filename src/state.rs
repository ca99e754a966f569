use std::sync::Arc;

use crate::services::config::EngineConfig;
use crate::services::connection_service::ConnectionFactory;
use crate::services::discovery_service::DiscoveryService;
use crate::services::match_service::MatchCoordinator;
use crate::services::quota_service::QuotaTracker;
use crate::services::viewed_cache::ViewedRegistry;
use crate::store::{DiscoveryStore, KeyValueStore};

/// Everything the route handlers share, wired once at startup and handed to
/// actix as `web::Data<AppState>`.
pub struct AppState {
    pub store: Arc<dyn DiscoveryStore>,
    pub discovery: DiscoveryService,
    pub matcher: MatchCoordinator,
    pub quota: QuotaTracker,
    pub viewed: ViewedRegistry,
    pub config: EngineConfig,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DiscoveryStore>,
        kv: Arc<dyn KeyValueStore>,
        config: EngineConfig,
    ) -> Self {
        let quota = QuotaTracker::new(store.clone(), config.daily_swipe_limit);
        let matcher = MatchCoordinator::new(
            store.clone(),
            quota.clone(),
            ConnectionFactory::new(store.clone()),
        );
        let discovery = DiscoveryService::new(store.clone(), config.page_size);
        let viewed = ViewedRegistry::new(kv);

        Self {
            store,
            discovery,
            matcher,
            quota,
            viewed,
            config,
        }
    }
}
