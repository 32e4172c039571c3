use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wiki_search::{
    config::{Config, ObservabilityConfig},
    events::PageEventBridge,
    models::PagePath,
    rpc::RpcRegistry,
    search::SearchManager,
    state::{InMemoryPageStore, PageStore},
};

#[derive(Parser)]
#[command(name = "wiki-search")]
#[command(about = "Search a directory of wiki pages", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, env = "WIKI_SEARCH_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full-text query
    Search {
        #[arg(value_name = "QUERY")]
        query: String,

        /// Directory of `.txt` pages
        #[arg(short, long)]
        pages: PathBuf,

        /// Search provider to use instead of the configured one
        #[arg(short = 'P', long)]
        provider: Option<String>,

        #[arg(short, long, default_value = "20")]
        max: usize,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Suggest page names for a fragment
    Suggest {
        #[arg(value_name = "FRAGMENT")]
        fragment: String,

        /// Directory of `.txt` pages
        #[arg(short, long)]
        pages: PathBuf,

        #[arg(short, long, default_value = "10")]
        max: usize,
    },

    /// Print the effective configuration
    ShowConfig,
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("wiki_search={},tantivy=warn", config.log_level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn open_search(
    config: &Config,
    pages: &Path,
    provider: Option<String>,
) -> anyhow::Result<Arc<SearchManager>> {
    let mut search_config = config.search.clone();
    if let Some(provider) = provider {
        search_config.provider = provider;
        search_config.legacy_full_text_engine = None;
    }

    let events = Arc::new(PageEventBridge::default());
    let store = Arc::new(InMemoryPageStore::with_events(events.clone()));
    store
        .load_dir(pages)
        .await
        .with_context(|| format!("Failed to load pages from {}", pages.display()))?;

    let manager =
        SearchManager::initialize(search_config, store.clone(), events, Arc::new(RpcRegistry::new()))
            .await;

    // Pages loaded from disk never went through the event bridge
    for name in store.find_all_page_names().await? {
        if let Some(page) = store.get_page(&PagePath::new(name)).await? {
            manager.reindex_page(&page).await?;
        }
    }

    Ok(manager)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    init_tracing(&config.observability);
    config.search.validate()?;

    match cli.command {
        Commands::Search {
            query,
            pages,
            provider,
            max,
            json,
        } => {
            let manager = open_search(&config, &pages, provider).await?;
            tracing::info!(provider = ?manager.provider_name(), query = %query, "Searching");

            if json {
                let hits = manager.find_pages_for_transport(&query, max).await;
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else {
                let results = manager.find_pages(Some(&query)).await?;
                if results.is_empty() {
                    println!("No pages found");
                }
                for result in results.iter().take(max) {
                    println!("{:>8.3}  {}", result.score(), result.page().name());
                }
            }

            manager.shutdown().await?;
        }

        Commands::Suggest {
            fragment,
            pages,
            max,
        } => {
            let manager = open_search(&config, &pages, None).await?;
            for name in manager.get_suggestions(&fragment, max).await {
                println!("{}", name);
            }
            manager.shutdown().await?;
        }

        Commands::ShowConfig => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
