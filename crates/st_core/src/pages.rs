//! Page entry points: everything a listing or article page needs, computed
//! fresh for each request.

use serde::Serialize;
use tracing::{debug, info};

use crate::aggregate::{build_article_view, ArticleView, SummaryView};
use crate::listing::{fetch_first_page, ArticleListingState};
use crate::preview::{resolve_revision, PreviewSession};
use crate::render::{ExternalEffect, RichTextRenderer};
use crate::repository::ContentRepository;
use crate::types::{ArticleDetail, Cursor};
use crate::{Error, Result};

#[derive(Debug, Clone, Serialize)]
pub struct ListingPageView {
    pub items: Vec<SummaryView>,
    pub cursor: Option<Cursor>,
    pub preview: bool,
}

impl ListingPageView {
    pub fn from_state(state: &ArticleListingState, preview: bool) -> Self {
        Self {
            items: state.items.iter().map(SummaryView::from).collect(),
            cursor: state.cursor.clone(),
            preview,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleDetailView {
    pub article: ArticleView,
    pub preview: bool,
}

/// Where an article page is in its resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "page", rename_all = "snake_case")]
pub enum RenderState<T> {
    /// Resolution still pending, show a loading indicator.
    Loading,
    Ready(T),
    NotFound(String),
}

impl<T> RenderState<T> {
    /// Folds a lookup result into a render state; only a missing article
    /// becomes `NotFound`, every other error is passed through.
    pub fn from_result(result: Result<T>) -> Result<Self> {
        match result {
            Ok(page) => Ok(RenderState::Ready(page)),
            Err(Error::ArticleNotFound(uid)) => Ok(RenderState::NotFound(uid)),
            Err(e) => Err(e),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, RenderState::Ready(_))
    }
}

pub fn thread_key(uid: &str) -> String {
    format!("/post/{}", uid)
}

pub async fn listing_page(
    repository: &dyn ContentRepository,
    session: &PreviewSession,
    page_size: usize,
) -> Result<ListingPageView> {
    let revision = resolve_revision(session)?;
    let state = fetch_first_page(repository, &revision, page_size).await?;
    Ok(ListingPageView::from_state(&state, revision.is_draft()))
}

pub async fn article_page(
    repository: &dyn ContentRepository,
    renderer: &dyn RichTextRenderer,
    effect: &dyn ExternalEffect,
    uid: &str,
    session: &PreviewSession,
) -> Result<ArticleDetailView> {
    let revision = resolve_revision(session)?;
    let raw = repository
        .get_by_uid(uid, &revision)
        .await?
        .ok_or_else(|| Error::ArticleNotFound(uid.to_string()))?;
    let detail = ArticleDetail::try_from(raw)?;
    let article = build_article_view(&detail, renderer);

    effect.inject(&thread_key(&detail.uid));
    info!("📰 Rendered article {} ({})", detail.uid, article.read_time);

    Ok(ArticleDetailView {
        article,
        preview: revision.is_draft(),
    })
}

/// Uids of every article page that exists up front.
pub async fn static_paths(repository: &dyn ContentRepository) -> Result<Vec<String>> {
    let uids = repository.query_all_uids().await?;
    debug!("Precomputed {} article paths", uids.len());
    Ok(uids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ListingPage, Paragraph, RawArticle, RevisionRef};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct MockRepository;

    fn raw(uid: &str, title: &str) -> RawArticle {
        serde_json::from_value(json!({
            "uid": uid,
            "first_publication_date": "2021-03-15T19:25:28+0000",
            "last_publication_date": "2021-03-25T19:27:35+0000",
            "data": {
                "title": title,
                "subtitle": "sub",
                "author": "Autor",
                "banner": { "url": "https://images.example.com/b.png" },
                "content": [{ "heading": "Intro", "body": [{ "type": "paragraph", "text": "um dois três", "spans": [] }] }]
            }
        }))
        .unwrap()
    }

    #[async_trait]
    impl ContentRepository for MockRepository {
        async fn query_listing(
            &self,
            _cursor: Option<&Cursor>,
            _page_size: usize,
            revision: &RevisionRef,
        ) -> Result<ListingPage> {
            let title = match revision {
                RevisionRef::Published => "Publicado",
                RevisionRef::Draft(_) => "Rascunho",
            };
            Ok(ListingPage {
                results: vec![raw("hooks", title)],
                next_cursor: Some(Cursor::from("page-2")),
            })
        }

        async fn get_by_uid(&self, uid: &str, revision: &RevisionRef) -> Result<Option<RawArticle>> {
            if uid != "hooks" {
                return Ok(None);
            }
            let title = if revision.is_draft() { "Rascunho" } else { "Publicado" };
            Ok(Some(raw(uid, title)))
        }

        async fn query_all_uids(&self) -> Result<Vec<String>> {
            Ok(vec!["hooks".to_string()])
        }
    }

    struct PlainRenderer;

    impl RichTextRenderer for PlainRenderer {
        fn to_html(&self, paragraphs: &[Paragraph]) -> String {
            paragraphs.iter().map(|p| p.text.clone()).collect()
        }
    }

    #[derive(Default)]
    struct RecordingEffect {
        keys: Mutex<Vec<String>>,
    }

    impl ExternalEffect for RecordingEffect {
        fn inject(&self, thread_key: &str) {
            self.keys.lock().unwrap().push(thread_key.to_string());
        }
    }

    #[tokio::test]
    async fn test_listing_page_published() {
        let view = listing_page(&MockRepository, &PreviewSession::published(), 1).await.unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].title, "Publicado");
        assert_eq!(view.items[0].publication_date, "15 mar 2021");
        assert_eq!(view.cursor, Some(Cursor::from("page-2")));
        assert!(!view.preview);
    }

    #[tokio::test]
    async fn test_listing_page_preview() {
        let view = listing_page(&MockRepository, &PreviewSession::draft("ref"), 1).await.unwrap();
        assert_eq!(view.items[0].title, "Rascunho");
        assert!(view.preview);
    }

    #[tokio::test]
    async fn test_listing_page_rejects_tokenless_preview() {
        let session = PreviewSession { active: true, revision_ref: None };
        let result = listing_page(&MockRepository, &session, 1).await;
        assert!(matches!(result, Err(Error::PreviewResolution(_))));
    }

    #[tokio::test]
    async fn test_article_page_injects_discussion_once() {
        let effect = RecordingEffect::default();
        let view = article_page(&MockRepository, &PlainRenderer, &effect, "hooks", &PreviewSession::published())
            .await
            .unwrap();
        assert_eq!(view.article.title, "Publicado");
        assert_eq!(view.article.read_time, "1 min");
        assert_eq!(view.article.sections[0].html, "um dois três");
        assert!(!view.preview);
        assert_eq!(*effect.keys.lock().unwrap(), vec!["/post/hooks".to_string()]);
    }

    #[tokio::test]
    async fn test_article_page_not_found() {
        let effect = RecordingEffect::default();
        let result =
            article_page(&MockRepository, &PlainRenderer, &effect, "missing", &PreviewSession::published()).await;
        let state = RenderState::from_result(result).unwrap();
        assert_eq!(state, RenderState::NotFound("missing".to_string()));
        assert!(effect.keys.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_render_state_passes_other_errors() {
        let result: Result<()> = Err(Error::PreviewResolution("no token".to_string()));
        assert!(RenderState::from_result(result).is_err());
    }

    #[tokio::test]
    async fn test_static_paths() {
        assert_eq!(static_paths(&MockRepository).await.unwrap(), vec!["hooks".to_string()]);
    }
}
