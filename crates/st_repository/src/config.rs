use std::path::PathBuf;
use url::Url;

use st_core::{Error, Result};

pub const DEFAULT_ENDPOINT: &str = "https://spacetraveling.cdn.prismic.io/api/v2";
pub const DEFAULT_DOCUMENT_TYPE: &str = "post";
pub const DEFAULT_PAGE_SIZE: usize = 1;

#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    pub endpoint: String,
    pub access_token: Option<String>,
    pub document_type: String,
    pub page_size: usize,
    /// JSON fixture loaded by the memory backend.
    pub fixture: Option<PathBuf>,
}

impl RepositoryConfig {
    pub fn new() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            access_token: None,
            document_type: DEFAULT_DOCUMENT_TYPE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            fixture: None,
        }
    }

    pub fn with_url(mut self, url: &str) -> Result<Self> {
        Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))?;
        self.endpoint = url.trim_end_matches('/').to_string();
        Ok(self)
    }

    pub fn endpoint_url(&self) -> Result<Url> {
        Url::parse(&self.endpoint).map_err(|e| Error::InvalidUrl(format!("{}: {}", self.endpoint, e)))
    }

    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_fixture(mut self, fixture: Option<PathBuf>) -> Self {
        self.fixture = fixture;
        self
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self::new()
    }
}
