use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use st_core::{ContentRepository, Error, Result};

pub mod backends;
pub mod config;
pub mod richtext;

pub use backends::*;
pub use config::RepositoryConfig;
pub use richtext::PrismicHtmlRenderer;

/// A repository implementation that can be selected by name at startup.
#[async_trait]
pub trait RepositoryBackend: ContentRepository + Sized {
    fn name() -> &'static str;
    async fn connect(config: RepositoryConfig) -> Result<Self>;
}

async fn connect<T: RepositoryBackend + 'static>(config: RepositoryConfig) -> Result<Arc<dyn ContentRepository>> {
    let repository = T::connect(config).await?;
    info!("📚 Content repository ready (using {})", T::name());
    Ok(Arc::new(repository) as Arc<dyn ContentRepository>)
}

pub async fn create_repository(kind: &str, config: RepositoryConfig) -> Result<Arc<dyn ContentRepository>> {
    match kind {
        "prismic" => connect::<PrismicRepository>(config).await,
        "memory" => connect::<InMemoryRepository>(config).await,
        other => Err(Error::Repository(format!(
            "Unknown repository backend: {} (expected prismic or memory)",
            other
        ))),
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_repository, RepositoryBackend, RepositoryConfig};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_repository() {
        assert!(create_repository("memory", RepositoryConfig::new()).await.is_ok());
        assert!(create_repository("prismic", RepositoryConfig::new()).await.is_ok());
        assert!(create_repository("sqlite", RepositoryConfig::new()).await.is_err());
    }
}
