use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Listing fetch error: {0}")]
    ListingFetch(String),

    #[error("Article not found: {0}")]
    ArticleNotFound(String),

    #[error("Preview resolution error: {0}")]
    PreviewResolution(String),

    #[error("Invalid listing seed: expected page 1, got page {0}")]
    InvalidListingSeed(u32),

    #[error("Malformed repository record: {0}")]
    Mapping(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl Error {
    /// Short machine-readable name, used by the web layer in error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::Serialization(_) => "serialization",
            Error::InvalidUrl(_) => "invalid_url",
            Error::ListingFetch(_) => "listing_fetch",
            Error::ArticleNotFound(_) => "article_not_found",
            Error::PreviewResolution(_) => "preview_resolution",
            Error::InvalidListingSeed(_) => "invalid_listing_seed",
            Error::Mapping(_) => "mapping",
            Error::Repository(_) => "repository",
            Error::Http(_) => "http",
            Error::External(_) => "external",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
