/// Free-tier daily action allowance.
pub const DEFAULT_DAILY_LIMIT: u32 = 10;
/// Candidates fetched per store page.
pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const DEFAULT_DATABASE: &str = "tripmate";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub daily_swipe_limit: u32,
    pub page_size: i64,
    pub database: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            daily_swipe_limit: DEFAULT_DAILY_LIMIT,
            page_size: DEFAULT_PAGE_SIZE,
            database: DEFAULT_DATABASE.to_string(),
        }
    }
}

impl EngineConfig {
    /// Create the config from environment variables or use defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            daily_swipe_limit: std::env::var("DAILY_SWIPE_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.daily_swipe_limit),
            page_size: std::env::var("DISCOVERY_PAGE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&size: &i64| size > 0)
                .unwrap_or(defaults.page_size),
            database: std::env::var("MONGODB_DATABASE")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.database),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn defaults_apply_when_env_is_unset() {
        std::env::remove_var("DAILY_SWIPE_LIMIT");
        std::env::remove_var("DISCOVERY_PAGE_SIZE");
        std::env::remove_var("MONGODB_DATABASE");

        let config = EngineConfig::from_env();
        assert_eq!(config.daily_swipe_limit, DEFAULT_DAILY_LIMIT);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.database, DEFAULT_DATABASE);
    }

    #[test]
    #[serial]
    fn env_overrides_and_junk_falls_back() {
        std::env::set_var("DAILY_SWIPE_LIMIT", "25");
        std::env::set_var("DISCOVERY_PAGE_SIZE", "-3");
        std::env::set_var("MONGODB_DATABASE", "tripmate_test");

        let config = EngineConfig::from_env();
        assert_eq!(config.daily_swipe_limit, 25);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.database, "tripmate_test");

        std::env::remove_var("DAILY_SWIPE_LIMIT");
        std::env::remove_var("DISCOVERY_PAGE_SIZE");
        std::env::remove_var("MONGODB_DATABASE");
    }
}
