use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

use st_core::{ContentRepository, Cursor, Error, ListingPage, RawArticle, Result, RevisionRef};

use crate::config::RepositoryConfig;
use crate::RepositoryBackend;

const CURSOR_PREFIX: &str = "offset:";

/// On-disk fixture layout: published documents plus drafts keyed by ref.
#[derive(Debug, Default, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub published: Vec<RawArticle>,
    #[serde(default)]
    pub drafts: HashMap<String, Vec<RawArticle>>,
}

#[derive(Default)]
pub struct MemoryStore {
    published: Vec<RawArticle>,
    drafts: HashMap<String, Vec<RawArticle>>,
}

impl MemoryStore {
    fn upsert(documents: &mut Vec<RawArticle>, article: RawArticle) {
        if let Some(existing) = documents.iter_mut().find(|a| a.uid == article.uid) {
            *existing = article;
        } else {
            documents.push(article);
        }
    }

    /// Published documents with the draft overlay of `revision` applied.
    fn documents(&self, revision: &RevisionRef) -> Result<Vec<RawArticle>> {
        match revision {
            RevisionRef::Published => Ok(self.published.clone()),
            RevisionRef::Draft(reference) => {
                let overlay = self
                    .drafts
                    .get(reference)
                    .ok_or_else(|| Error::Repository(format!("unknown ref: {}", reference)))?;
                let mut documents = self.published.clone();
                for draft in overlay {
                    Self::upsert(&mut documents, draft.clone());
                }
                Ok(documents)
            }
        }
    }
}

fn parse_cursor(cursor: &Cursor) -> Result<usize> {
    cursor
        .as_str()
        .strip_prefix(CURSOR_PREFIX)
        .and_then(|offset| offset.parse().ok())
        .ok_or_else(|| Error::Repository(format!("invalid cursor: {}", cursor)))
}

/// Repository held entirely in memory, for fixtures and tests.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    store: Arc<RwLock<MemoryStore>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: Fixture) -> Self {
        let mut store = MemoryStore::default();
        for article in fixture.published {
            MemoryStore::upsert(&mut store.published, article);
        }
        store.drafts = fixture.drafts;
        Self {
            store: Arc::new(RwLock::new(store)),
        }
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading fixture {}", path.display()))?;
        let fixture: Fixture = serde_json::from_str(&raw)
            .with_context(|| format!("parsing fixture {}", path.display()))?;
        Ok(Self::from_fixture(fixture))
    }

    pub async fn insert(&self, article: RawArticle) {
        let mut store = self.store.write().await;
        MemoryStore::upsert(&mut store.published, article);
    }

    pub async fn insert_draft(&self, reference: &str, article: RawArticle) {
        let mut store = self.store.write().await;
        let drafts = store.drafts.entry(reference.to_string()).or_default();
        MemoryStore::upsert(drafts, article);
    }
}

#[async_trait]
impl RepositoryBackend for InMemoryRepository {
    fn name() -> &'static str {
        "memory"
    }

    async fn connect(config: RepositoryConfig) -> Result<Self> {
        match &config.fixture {
            Some(path) => Self::load(path).await,
            None => Ok(Self::new()),
        }
    }
}

#[async_trait]
impl ContentRepository for InMemoryRepository {
    async fn query_listing(
        &self,
        cursor: Option<&Cursor>,
        page_size: usize,
        revision: &RevisionRef,
    ) -> Result<ListingPage> {
        let offset = cursor.map(parse_cursor).transpose()?.unwrap_or(0);
        let documents = self.store.read().await.documents(revision)?;
        let page_size = page_size.max(1);

        let end = (offset + page_size).min(documents.len());
        let results = documents.get(offset..end).map(<[_]>::to_vec).unwrap_or_default();
        let next_cursor = (end < documents.len()).then(|| Cursor::new(format!("{}{}", CURSOR_PREFIX, end)));

        Ok(ListingPage { results, next_cursor })
    }

    async fn get_by_uid(&self, uid: &str, revision: &RevisionRef) -> Result<Option<RawArticle>> {
        let documents = self.store.read().await.documents(revision)?;
        Ok(documents.into_iter().find(|a| a.uid.as_deref() == Some(uid)))
    }

    async fn query_all_uids(&self) -> Result<Vec<String>> {
        let store = self.store.read().await;
        Ok(store.published.iter().filter_map(|a| a.uid.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_fixture_names_the_path() {
        let path = std::env::temp_dir().join("st-missing-fixture.json");
        let err = InMemoryRepository::load(&path).await.err().unwrap();
        assert!(matches!(err, Error::External(_)));
        assert!(err.to_string().contains("st-missing-fixture.json"));
    }

    fn raw(uid: &str, title: &str) -> RawArticle {
        serde_json::from_value(json!({
            "uid": uid,
            "first_publication_date": "2021-03-15T19:25:28+0000",
            "data": { "title": title }
        }))
        .unwrap()
    }

    async fn repository() -> InMemoryRepository {
        let repo = InMemoryRepository::new();
        for uid in ["a", "b", "c"] {
            repo.insert(raw(uid, uid)).await;
        }
        repo
    }

    #[tokio::test]
    async fn test_pages_follow_cursor() {
        let repo = repository().await;

        let first = repo.query_listing(None, 2, &RevisionRef::Published).await.unwrap();
        assert_eq!(first.results.len(), 2);
        let cursor = first.next_cursor.unwrap();
        assert_eq!(cursor.as_str(), "offset:2");

        let second = repo.query_listing(Some(&cursor), 2, &RevisionRef::Published).await.unwrap();
        assert_eq!(second.results.len(), 1);
        assert_eq!(second.results[0].uid.as_deref(), Some("c"));
        assert!(second.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_exact_fit_has_no_next_cursor() {
        let repo = repository().await;
        let page = repo.query_listing(None, 3, &RevisionRef::Published).await.unwrap();
        assert_eq!(page.results.len(), 3);
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_invalid_cursor() {
        let repo = repository().await;
        let result = repo.query_listing(Some(&Cursor::from("tokenA")), 1, &RevisionRef::Published).await;
        assert!(matches!(result, Err(Error::Repository(_))));
    }

    #[tokio::test]
    async fn test_draft_overlay() {
        let repo = repository().await;
        repo.insert_draft("draft-1", raw("b", "b (rascunho)")).await;
        repo.insert_draft("draft-1", raw("d", "d")).await;

        let draft = RevisionRef::Draft("draft-1".to_string());
        let article = repo.get_by_uid("b", &draft).await.unwrap().unwrap();
        assert_eq!(article.data["title"], "b (rascunho)");
        assert!(repo.get_by_uid("d", &draft).await.unwrap().is_some());

        let published = repo.get_by_uid("b", &RevisionRef::Published).await.unwrap().unwrap();
        assert_eq!(published.data["title"], "b");
        assert!(repo.get_by_uid("d", &RevisionRef::Published).await.unwrap().is_none());

        assert_eq!(repo.query_all_uids().await.unwrap(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_unknown_draft_ref() {
        let repo = repository().await;
        let result = repo.get_by_uid("a", &RevisionRef::Draft("nope".to_string())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_fixture_parsing() {
        let fixture: Fixture = serde_json::from_value(json!({
            "published": [
                { "uid": "a", "first_publication_date": "2021-03-15T19:25:28+0000", "data": {} }
            ],
            "drafts": {
                "preview-ref": [
                    { "uid": "a", "first_publication_date": "2021-03-15T19:25:28+0000", "data": { "title": "novo" } }
                ]
            }
        }))
        .unwrap();
        let repo = InMemoryRepository::from_fixture(fixture);
        let draft = repo
            .get_by_uid("a", &RevisionRef::Draft("preview-ref".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(draft.data["title"], "novo");
    }
}
