use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

use st_core::pages::static_paths;
use st_core::{ContentRepository, ListingController, Result, RichTextRenderer};

use tracing::debug;

use crate::discussion::UtterancesWidget;

pub const MAX_LISTINGS: usize = 1024;
pub const LISTING_TTL: Duration = Duration::from_secs(30 * 60);

/// A "load more" session and the last time a request touched it.
pub struct ListingSession {
    pub controller: Arc<ListingController>,
    last_used: Instant,
}

pub struct AppState {
    pub repository: Arc<dyn ContentRepository>,
    pub renderer: Arc<dyn RichTextRenderer>,
    pub discussion: Arc<UtterancesWidget>,
    pub page_size: usize,
    /// "Load more" sessions; idle ones expire and the map is capped.
    pub listings: RwLock<HashMap<Uuid, ListingSession>>,
    max_listings: usize,
    listing_ttl: Duration,
    /// Article uids known up front; anything else goes through fallback resolution.
    pub paths: RwLock<HashSet<String>>,
    /// Uids whose fallback resolution is in flight.
    pub resolving: Mutex<HashSet<String>>,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn ContentRepository>,
        renderer: Arc<dyn RichTextRenderer>,
        discussion: Arc<UtterancesWidget>,
        page_size: usize,
    ) -> Self {
        Self {
            repository,
            renderer,
            discussion,
            page_size: page_size.max(1),
            listings: RwLock::new(HashMap::new()),
            max_listings: MAX_LISTINGS,
            listing_ttl: LISTING_TTL,
            paths: RwLock::new(HashSet::new()),
            resolving: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_listing_limits(mut self, max_listings: usize, listing_ttl: Duration) -> Self {
        self.max_listings = max_listings.max(1);
        self.listing_ttl = listing_ttl;
        self
    }

    /// Stores a new session, first dropping expired ones and then the least
    /// recently used until there is room.
    pub async fn insert_listing(&self, controller: ListingController) -> Uuid {
        let mut listings = self.listings.write().await;
        let now = Instant::now();
        listings.retain(|_, session| now.duration_since(session.last_used) < self.listing_ttl);
        while listings.len() >= self.max_listings {
            let oldest = listings
                .iter()
                .min_by_key(|(_, session)| session.last_used)
                .map(|(id, _)| *id);
            match oldest {
                Some(id) => {
                    debug!("Evicting listing session {}", id);
                    listings.remove(&id);
                }
                None => break,
            }
        }

        let id = Uuid::new_v4();
        listings.insert(
            id,
            ListingSession {
                controller: Arc::new(controller),
                last_used: now,
            },
        );
        id
    }

    /// The session's controller, refreshing its idle timer; `None` once expired.
    pub async fn listing(&self, id: &Uuid) -> Option<Arc<ListingController>> {
        let mut listings = self.listings.write().await;
        let now = Instant::now();
        let session = listings.get_mut(id)?;
        if now.duration_since(session.last_used) >= self.listing_ttl {
            listings.remove(id);
            return None;
        }
        session.last_used = now;
        Some(session.controller.clone())
    }

    pub async fn remove_listing(&self, id: &Uuid) -> bool {
        self.listings.write().await.remove(id).is_some()
    }

    pub async fn precompute_paths(&self) -> Result<usize> {
        let uids = static_paths(self.repository.as_ref()).await?;
        let mut paths = self.paths.write().await;
        paths.extend(uids);
        Ok(paths.len())
    }

    pub async fn is_known(&self, uid: &str) -> bool {
        self.paths.read().await.contains(uid)
    }

    /// Marks `uid` as being resolved; `None` if another request already is.
    pub fn begin_resolution(self: &Arc<Self>, uid: &str) -> Option<Resolution> {
        let mut resolving = self.resolving.lock().unwrap_or_else(|e| e.into_inner());
        resolving.insert(uid.to_string()).then(|| Resolution {
            state: self.clone(),
            uid: uid.to_string(),
        })
    }
}

/// Held while a fallback resolution runs; clears the in-flight mark on drop.
pub struct Resolution {
    state: Arc<AppState>,
    uid: String,
}

impl Drop for Resolution {
    fn drop(&mut self) {
        let mut resolving = self.state.resolving.lock().unwrap_or_else(|e| e.into_inner());
        resolving.remove(&self.uid);
    }
}
