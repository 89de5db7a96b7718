use clap::Parser;
use futures_util::future::join_all;
use st_core::aggregate::SummaryView;
use st_core::pages::{article_page, static_paths, ArticleDetailView};
use st_core::{
    resolve_revision, ContentRepository, Error, ListingController, LoadOutcome, PreviewSession, Result,
};
use st_repository::{create_repository, PrismicHtmlRenderer, RepositoryConfig};
use st_web::logging::{init_logging, parse_level};
use st_web::{AppState, UtterancesWidget};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Blog reader backed by a headless CMS", long_about = None)]
pub struct Cli {
    /// Content repository backend: prismic or memory
    #[arg(long, env = "ST_REPOSITORY", default_value = "memory")]
    repository: String,
    #[arg(long, env = "PRISMIC_ENDPOINT")]
    endpoint: Option<String>,
    #[arg(long, env = "PRISMIC_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,
    #[arg(long, env = "ST_PAGE_SIZE", default_value_t = 1)]
    page_size: usize,
    /// JSON fixture for the memory backend
    #[arg(long, env = "ST_FIXTURE")]
    fixture: Option<PathBuf>,
    #[arg(long, env = "ST_LOG_LEVEL", default_value = "info")]
    log_level: String,
    /// GitHub repository that hosts the comment threads
    #[arg(long, env = "ST_COMMENTS_REPO", default_value = st_web::discussion::DEFAULT_REPO)]
    comments_repo: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// List article summaries in repository order
    List {
        /// Read drafts from this preview ref
        #[arg(long)]
        preview_token: Option<String>,
        /// Keep loading pages until the cursor runs out
        #[arg(long)]
        all: bool,
        #[arg(long)]
        json: bool,
    },
    /// Render one or more articles
    Show {
        #[arg(required = true)]
        uids: Vec<String>,
        #[arg(long)]
        preview_token: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Print every article path known up front
    Paths,
    /// Run the HTTP server
    Serve {
        #[arg(long, env = "ST_BIND", default_value = "127.0.0.1:3000")]
        bind: SocketAddr,
    },
}

impl Cli {
    fn repository_config(&self) -> Result<RepositoryConfig> {
        let mut config = RepositoryConfig::new()
            .with_access_token(self.access_token.clone())
            .with_page_size(self.page_size)
            .with_fixture(self.fixture.clone());
        if let Some(endpoint) = &self.endpoint {
            config = config.with_url(endpoint)?;
        }
        Ok(config)
    }
}

fn session(preview_token: Option<String>) -> PreviewSession {
    preview_token.map(PreviewSession::draft).unwrap_or_default()
}

fn print_summary(summary: &SummaryView) {
    println!("{}  {}", summary.publication_date, summary.title);
    println!("    {} · {}", summary.subtitle, summary.author);
    println!("    /post/{}", summary.uid);
}

fn print_article(view: &ArticleDetailView) {
    let article = &view.article;
    println!("{}", article.title);
    println!("{}", article.subtitle);
    println!("{} · {} · {}", article.publication_date, article.author, article.read_time);
    if let Some(edited) = &article.edited_date {
        println!("* editado em {}", edited);
    }
    if view.preview {
        println!("[preview]");
    }
    for section in &article.sections {
        println!();
        println!("## {}", section.heading);
        println!("{}", section.html);
    }
}

async fn list(
    repository: Arc<dyn ContentRepository>,
    page_size: usize,
    preview_token: Option<String>,
    all: bool,
    json: bool,
) -> Result<()> {
    let revision = resolve_revision(&session(preview_token))?;
    let first_page = st_core::listing::fetch_first_page(repository.as_ref(), &revision, page_size).await?;
    let controller = ListingController::initialize(repository, revision, page_size, first_page)?;

    if all {
        while let LoadOutcome::Appended(n) = controller.load_next().await? {
            info!("📄 Loaded {} more article(s)", n);
        }
    }

    let listing = controller.snapshot().await;
    let summaries: Vec<SummaryView> = listing.items.iter().map(SummaryView::from).collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        for summary in &summaries {
            print_summary(summary);
        }
        if listing.has_more() {
            println!("... more articles available (use --all)");
        }
    }
    Ok(())
}

async fn show(
    repository: Arc<dyn ContentRepository>,
    comments_repo: &str,
    uids: Vec<String>,
    preview_token: Option<String>,
    json: bool,
) -> Result<()> {
    let session = session(preview_token);
    let renderer = PrismicHtmlRenderer::new();
    let discussion = UtterancesWidget::new(comments_repo);

    let pages = join_all(
        uids.iter()
            .map(|uid| article_page(repository.as_ref(), &renderer, &discussion, uid, &session)),
    )
    .await;

    for (uid, page) in uids.iter().zip(pages) {
        match page {
            Ok(view) if json => println!("{}", serde_json::to_string_pretty(&view.article)?),
            Ok(view) => print_article(&view),
            Err(Error::ArticleNotFound(_)) => eprintln!("❌ Article not found: {}", uid),
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(parse_level(&cli.log_level));

    let config = cli.repository_config()?;
    let repository = create_repository(&cli.repository, config).await?;
    info!("✨ Repository initialized successfully (using {})", cli.repository);

    match cli.command {
        Commands::List { preview_token, all, json } => {
            list(repository, cli.page_size, preview_token, all, json).await?;
        }
        Commands::Show { uids, preview_token, json } => {
            show(repository, &cli.comments_repo, uids, preview_token, json).await?;
        }
        Commands::Paths => {
            for uid in static_paths(repository.as_ref()).await? {
                println!("/post/{}", uid);
            }
        }
        Commands::Serve { bind } => {
            let state = Arc::new(AppState::new(
                repository,
                Arc::new(PrismicHtmlRenderer::new()),
                Arc::new(UtterancesWidget::new(cli.comments_repo)),
                cli.page_size,
            ));
            st_web::serve(bind, state).await?;
        }
    }

    Ok(())
}
