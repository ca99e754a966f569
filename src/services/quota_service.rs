use std::sync::Arc;

use chrono::Utc;

use crate::models::user::{DailyUsage, UserProfile};
use crate::store::DiscoveryStore;

/// Current UTC calendar day in the quota's `YYYY-MM-DD` form.
pub fn today_utc() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

/// Actions already taken today. A counter left over from an earlier date
/// has implicitly reset and reads as zero; negative counts clamp to zero.
pub fn effective_count(usage: Option<&DailyUsage>, today: &str) -> i32 {
    match usage {
        Some(usage) if usage.date == today => usage.view_count.max(0),
        _ => 0,
    }
}

/// Daily action quota over user profiles. Free users get `daily_limit`
/// accept/reject actions per UTC day; an active premium subscription lifts
/// the gate entirely.
#[derive(Clone)]
pub struct QuotaTracker {
    store: Arc<dyn DiscoveryStore>,
    daily_limit: u32,
}

impl QuotaTracker {
    pub fn new(store: Arc<dyn DiscoveryStore>, daily_limit: u32) -> Self {
        QuotaTracker { store, daily_limit }
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    pub fn has_reached_limit(&self, profile: &UserProfile) -> bool {
        if profile.is_premium(Utc::now()) {
            return false;
        }
        effective_count(profile.daily_usage.as_ref(), &today_utc()) >= self.daily_limit as i32
    }

    /// Actions left today, `None` meaning unlimited.
    pub fn remaining_today(&self, profile: &UserProfile) -> Option<u32> {
        if profile.is_premium(Utc::now()) {
            return None;
        }
        let used = effective_count(profile.daily_usage.as_ref(), &today_utc()) as u32;
        Some(self.daily_limit.saturating_sub(used))
    }

    /// Spend one action: fresh profile read, limit gate, counter write.
    /// Returns `false` on exhaustion and on any store failure; callers
    /// cannot tell the two apart, and the single retry/upgrade message
    /// shown to users relies on that.
    pub async fn consume(&self, uid: &str) -> bool {
        let profile = match self.store.get_user(uid).await {
            Ok(profile) => profile,
            Err(err) => {
                log::warn!("quota read failed for {}: {}", uid, err);
                return false;
            }
        };
        if let Some(profile) = &profile {
            if self.has_reached_limit(profile) {
                return false;
            }
        }

        // A missing profile acts as a fresh free user; the counter write
        // creates the holder document.
        let today = today_utc();
        let used = profile
            .as_ref()
            .map(|p| effective_count(p.daily_usage.as_ref(), &today))
            .unwrap_or(0);
        let usage = DailyUsage {
            date: today,
            view_count: used.saturating_add(1),
        };
        match self.store.update_daily_usage(uid, &usage).await {
            Ok(()) => true,
            Err(err) => {
                log::warn!("quota update failed for {}: {}", uid, err);
                false
            }
        }
    }
}
