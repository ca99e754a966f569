use std::sync::Arc;

use crate::models::connection::Connection;
use crate::models::itinerary::TripItinerary;
use crate::services::connection_service::ConnectionFactory;
use crate::services::quota_service::QuotaTracker;
use crate::services::viewed_cache::ViewedCache;
use crate::services::EngineError;
use crate::store::DiscoveryStore;

/// What an accept produced.
#[derive(Debug)]
pub enum MatchOutcome {
    /// Like recorded; the other side has not liked back yet.
    NoMatch,
    /// Mutual like, connection in hand (created now or found existing).
    Matched(Box<Connection>),
    /// Mutual like detected but the connection write failed. The like
    /// itself is durable, so a later accept or refresh can finish the job.
    MatchFailed { partner_uid: String, error: String },
}

/// Orchestrates the swipe actions: quota gate, like persistence, mutual
/// detection, connection creation and viewed bookkeeping.
pub struct MatchCoordinator {
    store: Arc<dyn DiscoveryStore>,
    quota: QuotaTracker,
    connections: ConnectionFactory,
}

impl MatchCoordinator {
    pub fn new(
        store: Arc<dyn DiscoveryStore>,
        quota: QuotaTracker,
        connections: ConnectionFactory,
    ) -> Self {
        MatchCoordinator {
            store,
            quota,
            connections,
        }
    }

    /// Accept (like) `candidate` on behalf of `acting_uid`, whose own
    /// itinerary is `my_itinerary_id`.
    ///
    /// Mutual detection re-reads the acting user's itinerary instead of
    /// trusting session state; the fresh `likes` array is authoritative.
    /// Two users accepting each other at the same instant can both see
    /// `NoMatch`; the next accept from either side resolves it.
    ///
    /// An `Err` means the swipe did not complete and the caller must not
    /// advance the cursor. Any `Ok` outcome is terminal for the candidate:
    /// it is recorded as viewed and the caller advances.
    pub async fn accept(
        &self,
        candidate: &TripItinerary,
        acting_uid: &str,
        my_itinerary_id: &str,
        viewed: &ViewedCache,
    ) -> Result<MatchOutcome, EngineError> {
        if acting_uid.is_empty() || my_itinerary_id.is_empty() || candidate.id.is_empty() {
            return Err(EngineError::InvalidInput(
                "missing user or itinerary id".to_string(),
            ));
        }
        if candidate.owner_uid().is_empty() {
            return Err(EngineError::InvalidInput(
                "candidate has no owner".to_string(),
            ));
        }
        if candidate.owner_uid() == acting_uid {
            return Err(EngineError::InvalidInput(
                "cannot like your own itinerary".to_string(),
            ));
        }

        if !self.quota.consume(acting_uid).await {
            return Err(EngineError::QuotaExceeded);
        }

        self.store.add_like(&candidate.id, acting_uid).await?;

        let mine = self
            .store
            .get_itinerary(my_itinerary_id)
            .await?
            .ok_or_else(|| {
                EngineError::Store(format!("own itinerary {} not found", my_itinerary_id))
            })?;

        // The swipe is terminal from here on; the candidate is spent.
        if let Err(err) = viewed.add(&candidate.id).await {
            log::warn!("viewed record failed for {}: {}", candidate.id, err);
        }

        let partner = candidate.owner_uid();
        if !mine.has_liked(partner) {
            return Ok(MatchOutcome::NoMatch);
        }

        match self
            .connections
            .create(acting_uid, partner, &mine, candidate)
            .await
        {
            Ok(connection) => Ok(MatchOutcome::Matched(Box::new(connection))),
            Err(err) => {
                log::error!(
                    "connection create failed for {} and {}: {}",
                    acting_uid,
                    partner,
                    err
                );
                Ok(MatchOutcome::MatchFailed {
                    partner_uid: partner.to_string(),
                    error: err.to_string(),
                })
            }
        }
    }

    /// Pass on a candidate. Costs one quota action; on success the
    /// candidate is recorded as viewed so it never resurfaces on this
    /// device.
    pub async fn reject(
        &self,
        candidate_id: &str,
        acting_uid: &str,
        viewed: &ViewedCache,
    ) -> Result<(), EngineError> {
        if acting_uid.is_empty() || candidate_id.is_empty() {
            return Err(EngineError::InvalidInput(
                "missing user or itinerary id".to_string(),
            ));
        }
        if !self.quota.consume(acting_uid).await {
            return Err(EngineError::QuotaExceeded);
        }
        if let Err(err) = viewed.add(candidate_id).await {
            log::warn!("viewed record failed for {}: {}", candidate_id, err);
        }
        Ok(())
    }
}
