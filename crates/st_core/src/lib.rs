pub mod aggregate;
pub mod error;
pub mod listing;
pub mod mapping;
pub mod pages;
pub mod preview;
pub mod render;
pub mod repository;
pub mod types;

pub use error::{Error, Result};
pub use listing::{ArticleListingState, ListingController, LoadOutcome};
pub use preview::{resolve_revision, PreviewSession};
pub use render::{ExternalEffect, RichTextRenderer};
pub use repository::ContentRepository;
pub use types::{
    ArticleBody, ArticleDetail, ArticleSummary, ContentBlock, Cursor, ListingPage, Paragraph, RawArticle,
    RevisionRef,
};
