use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use tokio::sync::Mutex;

use crate::models::itinerary::TripItinerary;
use crate::services::viewed_cache::ViewedCache;
use crate::services::EngineError;
use crate::store::{DiscoveryStore, PageCursor, SearchFilters};

/// Live discovery state for one searching user. Never persisted; a fresh
/// `search` replaces it wholesale.
struct SearchSession {
    own: TripItinerary,
    user_id: String,
    filters: SearchFilters,
    viewed: Arc<ViewedCache>,
    /// Candidates that survived filtering, in `(end_day, id)` order.
    buffer: Vec<TripItinerary>,
    /// Read position. May sit one past the end of the buffer.
    index: usize,
    /// Resume point of the last raw page, filtered or not.
    cursor: Option<PageCursor>,
    has_more: bool,
}

/// Paged walk over match candidates for one user, loading further pages
/// lazily as the reader advances.
pub struct SearchCursor {
    store: Arc<dyn DiscoveryStore>,
    page_size: i64,
    session: Option<SearchSession>,
}

impl SearchCursor {
    pub fn new(store: Arc<dyn DiscoveryStore>, page_size: i64) -> Self {
        SearchCursor {
            store,
            page_size,
            session: None,
        }
    }

    /// Start a fresh session from the user's own itinerary and load the
    /// first page. Returns how many candidates survived filtering.
    ///
    /// On a store failure the old results are gone (buffer resets) but
    /// `has_more` keeps its prior value, so a later `advance` can still
    /// probe the store.
    pub async fn search(
        &mut self,
        own: TripItinerary,
        user_id: &str,
        viewed: Arc<ViewedCache>,
    ) -> Result<usize, EngineError> {
        if user_id.is_empty() {
            return Err(EngineError::InvalidInput("missing user id".to_string()));
        }
        if own.id.is_empty() {
            return Err(EngineError::InvalidInput("missing itinerary".to_string()));
        }

        let prior_has_more = self.session.as_ref().map(|s| s.has_more).unwrap_or(false);
        let mut session = SearchSession {
            user_id: user_id.to_string(),
            filters: SearchFilters::for_itinerary(&own),
            viewed,
            buffer: Vec::new(),
            index: 0,
            cursor: None,
            has_more: false,
            own,
        };

        match self
            .store
            .search_page(&session.filters, None, self.page_size)
            .await
        {
            Ok(page) => {
                session.has_more = page.len() as i64 == self.page_size;
                session.cursor = page.last().map(PageCursor::from_itinerary);
                session.buffer =
                    filter_page(&session.own, &session.user_id, session.viewed.as_ref(), page)
                        .await;
                let found = session.buffer.len();
                self.session = Some(session);
                Ok(found)
            }
            Err(err) => {
                session.has_more = prior_has_more;
                self.session = Some(session);
                Err(EngineError::Store(err.to_string()))
            }
        }
    }

    /// The candidate under the read index, if any.
    pub fn current(&self) -> Option<&TripItinerary> {
        self.session.as_ref().and_then(|s| s.buffer.get(s.index))
    }

    pub fn has_more(&self) -> bool {
        self.session.as_ref().map(|s| s.has_more).unwrap_or(false)
    }

    /// Step to the next candidate. When the buffer is exhausted and the
    /// store may still have rows, fetch one more page and leave the index
    /// on the first newly fetched candidate (or past the end if the whole
    /// page filtered out). Fetch errors here are logged and demote the
    /// session to end-of-results; they never surface to the swiping user.
    pub async fn advance(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let next = session.index + 1;
        if next < session.buffer.len() {
            session.index = next;
            return;
        }
        if !session.has_more {
            session.index = session.buffer.len().min(next);
            return;
        }

        let own = session.own.clone();
        let user_id = session.user_id.clone();
        let filters = session.filters.clone();
        let viewed = session.viewed.clone();
        let resume = session.cursor.clone();

        match self
            .store
            .search_page(&filters, resume.as_ref(), self.page_size)
            .await
        {
            Ok(page) => {
                session.has_more = page.len() as i64 == self.page_size;
                if let Some(last) = page.last() {
                    session.cursor = Some(PageCursor::from_itinerary(last));
                }
                let fresh = filter_page(&own, &user_id, viewed.as_ref(), page).await;
                session.index = session.buffer.len();
                session.buffer.extend(fresh);
            }
            Err(err) => {
                log::warn!("candidate page fetch failed for {}: {}", user_id, err);
                session.has_more = false;
                session.index = session.buffer.len();
            }
        }
    }

    pub fn session_view(&self) -> Option<SessionView> {
        self.session.as_ref().map(|s| SessionView {
            my_itinerary_id: s.own.id.clone(),
            viewed: s.viewed.clone(),
        })
    }
}

/// Engine-side page filter: drop the searcher's own itineraries, candidates
/// outside the declared age range and candidates the device has already
/// seen. The store query cannot express these three, so they are enforced
/// here on every page.
async fn filter_page(
    own: &TripItinerary,
    user_id: &str,
    viewed: &ViewedCache,
    page: Vec<TripItinerary>,
) -> Vec<TripItinerary> {
    let today = Utc::now().date_naive();
    let mut kept = Vec::with_capacity(page.len());
    for candidate in page {
        if candidate.owner_uid() == user_id {
            continue;
        }
        if !own.preferences.age_allows(candidate.user_info.age_on(today)) {
            continue;
        }
        if viewed.has(&candidate.id).await {
            continue;
        }
        kept.push(candidate);
    }
    kept
}

/// What a fresh search returned: the filtered candidate count of the first
/// page and the candidate now under the cursor.
#[derive(Debug)]
pub struct SearchSummary {
    pub count: usize,
    pub candidate: Option<TripItinerary>,
}

/// The slice of session state accept/reject handling needs.
pub struct SessionView {
    pub my_itinerary_id: String,
    pub viewed: Arc<ViewedCache>,
}

/// Owns one [`SearchCursor`] per acting user, each behind its own async
/// mutex, so all actions of a session run one at a time in arrival order.
pub struct DiscoveryService {
    store: Arc<dyn DiscoveryStore>,
    page_size: i64,
    /// One entry per uid seen, held for the life of the process. A repeat
    /// search reuses the entry; nothing evicts it.
    cursors: RwLock<HashMap<String, Arc<Mutex<SearchCursor>>>>,
}

impl DiscoveryService {
    pub fn new(store: Arc<dyn DiscoveryStore>, page_size: i64) -> Self {
        DiscoveryService {
            store,
            page_size,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    fn cursor_for(&self, user_id: &str) -> Arc<Mutex<SearchCursor>> {
        if let Some(cursor) = self.cursors.read().unwrap().get(user_id) {
            return cursor.clone();
        }
        let mut cursors = self.cursors.write().unwrap();
        cursors
            .entry(user_id.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(SearchCursor::new(
                    self.store.clone(),
                    self.page_size,
                )))
            })
            .clone()
    }

    fn existing_cursor(&self, user_id: &str) -> Option<Arc<Mutex<SearchCursor>>> {
        self.cursors.read().unwrap().get(user_id).cloned()
    }

    pub async fn search(
        &self,
        user_id: &str,
        own: TripItinerary,
        viewed: Arc<ViewedCache>,
    ) -> Result<SearchSummary, EngineError> {
        let cursor = self.cursor_for(user_id);
        let mut cursor = cursor.lock().await;
        let count = cursor.search(own, user_id, viewed).await?;
        Ok(SearchSummary {
            count,
            candidate: cursor.current().cloned(),
        })
    }

    pub async fn current(&self, user_id: &str) -> Option<TripItinerary> {
        let cursor = self.existing_cursor(user_id)?;
        let cursor = cursor.lock().await;
        cursor.current().cloned()
    }

    /// Advance and return the new current candidate.
    pub async fn advance(&self, user_id: &str) -> Option<TripItinerary> {
        let cursor = self.existing_cursor(user_id)?;
        let mut cursor = cursor.lock().await;
        cursor.advance().await;
        cursor.current().cloned()
    }

    pub async fn session_view(&self, user_id: &str) -> Option<SessionView> {
        let cursor = self.existing_cursor(user_id)?;
        let cursor = cursor.lock().await;
        cursor.session_view()
    }
}
