use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::state::ArticleListingState;
use crate::repository::ContentRepository;
use crate::types::{ArticleSummary, Cursor, ListingPage, RevisionRef};
use crate::{Error, Result};

/// What a call to [`ListingController::load_next`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was fetched and merged; carries the number of new items.
    Appended(usize),
    /// No cursor left, nothing was fetched.
    Exhausted,
    /// Another load was already in flight, this call was dropped.
    Ignored,
}

fn listing_fetch(err: Error) -> Error {
    match err {
        Error::ListingFetch(_) => err,
        other => Error::ListingFetch(other.to_string()),
    }
}

fn map_page(page: ListingPage) -> Result<(Vec<ArticleSummary>, Option<Cursor>)> {
    let summaries = page
        .results
        .into_iter()
        .map(ArticleSummary::try_from)
        .collect::<Result<Vec<_>>>()?;
    Ok((summaries, page.next_cursor))
}

/// Runs the first listing query; this is the page a listing is seeded with.
pub async fn fetch_first_page(
    repository: &dyn ContentRepository,
    revision: &RevisionRef,
    page_size: usize,
) -> Result<ArticleListingState> {
    let page = repository
        .query_listing(None, page_size, revision)
        .await
        .map_err(listing_fetch)?;
    let (items, cursor) = map_page(page).map_err(listing_fetch)?;
    debug!("First page has {} articles, more pages: {}", items.len(), cursor.is_some());
    Ok(ArticleListingState::first_page(items, cursor))
}

/// Clears the in-flight flag when a load finishes, fails or is dropped.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns one listing session and routes every mutation through `load_next`.
pub struct ListingController {
    repository: Arc<dyn ContentRepository>,
    revision: RevisionRef,
    page_size: usize,
    state: RwLock<ArticleListingState>,
    in_flight: AtomicBool,
}

impl ListingController {
    pub fn initialize(
        repository: Arc<dyn ContentRepository>,
        revision: RevisionRef,
        page_size: usize,
        first_page: ArticleListingState,
    ) -> Result<Self> {
        if first_page.page_index != 1 {
            return Err(Error::InvalidListingSeed(first_page.page_index));
        }
        Ok(Self {
            repository,
            revision,
            page_size,
            state: RwLock::new(first_page),
            in_flight: AtomicBool::new(false),
        })
    }

    pub fn revision(&self) -> &RevisionRef {
        &self.revision
    }

    pub async fn has_more(&self) -> bool {
        self.state.read().await.has_more()
    }

    pub async fn snapshot(&self) -> ArticleListingState {
        self.state.read().await.clone()
    }

    /// Fetches the page after the stored cursor and appends it.
    ///
    /// The state is only touched once the whole page has been fetched and
    /// mapped, so a failed call can simply be retried.
    pub async fn load_next(&self) -> Result<LoadOutcome> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Load already in flight, ignoring");
            return Ok(LoadOutcome::Ignored);
        }
        let _guard = InFlight(&self.in_flight);

        let (cursor, page_index) = {
            let state = self.state.read().await;
            (state.cursor.clone(), state.page_index)
        };
        let Some(cursor) = cursor else {
            return Ok(LoadOutcome::Exhausted);
        };

        info!("📄 Loading page {} of the listing", page_index + 1);
        let fetched = self
            .repository
            .query_listing(Some(&cursor), self.page_size, &self.revision)
            .await
            .and_then(map_page);

        let (summaries, next) = match fetched {
            Ok(page) => page,
            Err(e) => {
                warn!("⚠️ Failed to load page {}: {}", page_index + 1, e);
                return Err(listing_fetch(e));
            }
        };

        let added = self.state.write().await.merge_page(summaries, next);
        info!("✨ Appended {} articles", added);
        Ok(LoadOutcome::Appended(added))
    }
}
