use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use st_core::{ContentRepository, Cursor, Error, ListingPage, RawArticle, Result, RevisionRef};

use crate::config::RepositoryConfig;
use crate::RepositoryBackend;

const UID_PAGE_SIZE: usize = 100;

lazy_static::lazy_static! {
    /// Uids the repository can hold; anything else cannot match a document.
    static ref UID_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
}

fn is_valid_uid(uid: &str) -> bool {
    UID_REGEX.is_match(uid)
}

#[derive(Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master_ref: bool,
}

#[derive(Deserialize)]
struct ApiRoot {
    refs: Vec<ApiRef>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    next_page: Option<String>,
    #[serde(default)]
    results: Vec<RawArticle>,
}

/// Client for a Prismic v2 REST repository.
pub struct PrismicRepository {
    client: Arc<Client>,
    config: RepositoryConfig,
}

impl PrismicRepository {
    pub fn new(config: RepositoryConfig) -> Result<Self> {
        config.endpoint_url()?;
        Ok(Self {
            client: Arc::new(Client::new()),
            config,
        })
    }

    fn with_access_token(&self, mut url: Url) -> Url {
        if let Some(token) = &self.config.access_token {
            if !url.query_pairs().any(|(k, _)| k == "access_token") {
                url.query_pairs_mut().append_pair("access_token", token);
            }
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!("GET {}", url.path());
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.json::<T>().await?)
    }

    async fn master_ref(&self) -> Result<String> {
        let url = self.with_access_token(self.config.endpoint_url()?);
        let root: ApiRoot = self.get_json(url).await?;
        root.refs
            .into_iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference)
            .ok_or_else(|| Error::Repository("repository has no master ref".to_string()))
    }

    async fn resolve_ref(&self, revision: &RevisionRef) -> Result<String> {
        match revision {
            RevisionRef::Published => self.master_ref().await,
            RevisionRef::Draft(reference) => Ok(reference.clone()),
        }
    }

    fn type_predicate(&self) -> String {
        format!("[[at(document.type,\"{}\")]]", self.config.document_type)
    }

    fn uid_predicate(&self, uid: &str) -> String {
        format!("[[at(my.{}.uid,\"{}\")]]", self.config.document_type, uid)
    }

    pub(crate) fn search_url(&self, reference: &str, predicate: &str, page_size: usize, page: u32) -> Result<Url> {
        let mut url = self.config.endpoint_url()?;
        url.path_segments_mut()
            .map_err(|_| Error::InvalidUrl(format!("{} cannot be a base", self.config.endpoint)))?
            .pop_if_empty()
            .extend(["documents", "search"]);
        url.query_pairs_mut()
            .append_pair("ref", reference)
            .append_pair("q", predicate)
            .append_pair("pageSize", &page_size.to_string())
            .append_pair("page", &page.to_string());
        Ok(self.with_access_token(url))
    }

    /// Turns a `next_page` cursor back into a request URL pinned to `reference`.
    pub(crate) fn cursor_url(&self, cursor: &Cursor, reference: &str) -> Result<Url> {
        let mut url = Url::parse(cursor.as_str())
            .map_err(|e| Error::InvalidUrl(format!("cursor {}: {}", cursor, e)))?;
        let endpoint = self.config.endpoint_url()?;
        if url.host_str() != endpoint.host_str() {
            return Err(Error::InvalidUrl(format!(
                "cursor host {:?} does not belong to {}",
                url.host_str(),
                self.config.endpoint
            )));
        }

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != "ref")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(pairs)
            .append_pair("ref", reference);
        Ok(self.with_access_token(url))
    }

    async fn search(&self, url: Url) -> Result<ListingPage> {
        let response: SearchResponse = self.get_json(url).await?;
        Ok(ListingPage {
            results: response.results,
            next_cursor: response.next_page.map(Cursor::new),
        })
    }
}

impl fmt::Debug for PrismicRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrismicRepository")
            .field("client", &"<reqwest::Client>")
            .field("endpoint", &self.config.endpoint)
            .field("access_token", &self.config.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[async_trait]
impl RepositoryBackend for PrismicRepository {
    fn name() -> &'static str {
        "prismic"
    }

    async fn connect(config: RepositoryConfig) -> Result<Self> {
        Self::new(config)
    }
}

#[async_trait]
impl ContentRepository for PrismicRepository {
    async fn query_listing(
        &self,
        cursor: Option<&Cursor>,
        page_size: usize,
        revision: &RevisionRef,
    ) -> Result<ListingPage> {
        let reference = self.resolve_ref(revision).await?;
        let url = match cursor {
            Some(cursor) => self.cursor_url(cursor, &reference)?,
            None => self.search_url(&reference, &self.type_predicate(), page_size, 1)?,
        };
        self.search(url).await
    }

    async fn get_by_uid(&self, uid: &str, revision: &RevisionRef) -> Result<Option<RawArticle>> {
        if !is_valid_uid(uid) {
            debug!("Rejecting malformed uid {:?}", uid);
            return Ok(None);
        }
        let reference = self.resolve_ref(revision).await?;
        let url = self.search_url(&reference, &self.uid_predicate(uid), 1, 1)?;
        let page = self.search(url).await?;
        Ok(page.results.into_iter().next())
    }

    async fn query_all_uids(&self) -> Result<Vec<String>> {
        let reference = self.master_ref().await?;
        let predicate = self.type_predicate();
        let mut uids = Vec::new();
        let mut page = 1;

        loop {
            let url = self.search_url(&reference, &predicate, UID_PAGE_SIZE, page)?;
            let response = self.search(url).await?;
            uids.extend(response.results.into_iter().filter_map(|doc| doc.uid));
            if response.next_cursor.is_none() {
                break;
            }
            page += 1;
        }

        Ok(uids)
    }
}
