use async_trait::async_trait;
use crate::types::{Cursor, ListingPage, RawArticle, RevisionRef};
use crate::Result;

#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Fetch one page of articles, starting at `cursor` (or the first page when `None`)
    async fn query_listing(
        &self,
        cursor: Option<&Cursor>,
        page_size: usize,
        revision: &RevisionRef,
    ) -> Result<ListingPage>;

    /// Look up a single article by uid, `None` when no record matches
    async fn get_by_uid(&self, uid: &str, revision: &RevisionRef) -> Result<Option<RawArticle>>;

    /// Every published article uid
    async fn query_all_uids(&self) -> Result<Vec<String>>;
}
