use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use dotenvy::dotenv;
use futures::stream::{self, StreamExt};
use tokio::net::TcpListener;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

use datamart_cli::output::{render_listing, render_rows, render_summary, select_components};
use datamart_cli::{Command, Config, ExportFormat};
use datamart_client::{LogMailer, MockPaymentGateway, PageFetcher};
use datamart_core::{
    AdminAuth, AuthConfig, ImportMode, MailerConfig, NewDataset, StorefrontConfig, TableEditor,
    TableState,
};
use datamart_db::{BlogRepository, BlogStore, DatasetRepository, DatasetStore, MemoryStore};
use datamart_server::AppState;

/// Pages fetched at once by `scrape`.
const SCRAPE_CONCURRENCY: usize = 4;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Setup logging (stderr to keep stdout clean for exports)
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;

    let config = Config::parse();

    match &config.command {
        Command::Serve {
            listen,
            in_memory,
            admin_passcode,
            session_secret,
        } => {
            serve(
                &config,
                *listen,
                *in_memory,
                admin_passcode,
                session_secret.as_deref(),
            )
            .await?;
        }
        Command::Scrape { urls, json } => {
            scrape(&config, urls, *json).await?;
        }
        Command::Import {
            url,
            name,
            components,
            into,
        } => {
            let repo = open_repository(&config).await?;
            import(&config, &repo, url, name.as_deref(), components, *into).await?;
        }
        Command::List => {
            let repo = open_repository(&config).await?;
            list(&repo).await?;
        }
        Command::Export { id, format } => {
            let repo = open_repository(&config).await?;
            export(&repo, *id, *format).await?;
        }
    }

    Ok(())
}

async fn open_repository(config: &Config) -> anyhow::Result<DatasetRepository> {
    let pool = connect(config).await?;
    Ok(DatasetRepository::new(pool))
}

async fn connect(config: &Config) -> anyhow::Result<datamart_db::PgPool> {
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL is required (set it or pass --database-url)")?;
    datamart_db::connect(database_url, &config.db_config())
        .await
        .context("Failed to connect to database")
}

/// Run the HTTP API until interrupted
async fn serve(
    config: &Config,
    listen: SocketAddr,
    in_memory: bool,
    admin_passcode: &str,
    session_secret: Option<&str>,
) -> anyhow::Result<()> {
    if admin_passcode.trim().is_empty() {
        bail!("ADMIN_PASSCODE must not be empty");
    }

    let datasets: Arc<dyn DatasetStore>;
    let posts: Arc<dyn BlogStore>;
    if in_memory {
        info!("Using in-memory store; nothing will be persisted");
        let store = MemoryStore::new();
        datasets = Arc::new(store.clone());
        posts = Arc::new(store);
    } else {
        let pool = connect(config).await?;
        datasets = Arc::new(DatasetRepository::new(pool.clone()));
        posts = Arc::new(BlogRepository::new(pool));
    }

    let state = AppState {
        datasets,
        posts,
        fetcher: PageFetcher::new(&config.http_config())?,
        payments: Arc::new(MockPaymentGateway),
        mailer: Arc::new(LogMailer::new(MailerConfig::default())),
        auth: AdminAuth::new(admin_passcode, session_secret, AuthConfig::default()),
        storefront: StorefrontConfig::default(),
    };

    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("Failed to bind {}", listen))?;
    datamart_server::serve(listener, Arc::new(state))
        .await
        .context("Server error")?;

    Ok(())
}

/// Scrape pages concurrently and print what was found, in argument order
async fn scrape(config: &Config, urls: &[String], json: bool) -> anyhow::Result<()> {
    let fetcher = PageFetcher::new(&config.http_config())?;
    let total = urls.len();

    let results: Vec<_> = stream::iter(urls.iter().cloned())
        .map(|url| {
            let fetcher = fetcher.clone();
            async move {
                let result = fetcher.scrape(&url).await;
                (url, result)
            }
        })
        .buffered(SCRAPE_CONCURRENCY)
        .collect()
        .await;

    let mut failed = 0;
    for (url, result) in results {
        match result {
            Ok(result) if json => {
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
            Ok(result) => {
                print!("{}", render_summary(&url, &result));
            }
            Err(e) => {
                failed += 1;
                error!("{}", e.user_message());
            }
        }
    }

    if total > 1 {
        info!(
            "Scraping complete: {} successful, {} failed out of {} total",
            total - failed,
            failed,
            total
        );
    }
    if failed == total {
        bail!("No page could be scraped");
    }
    Ok(())
}

/// Scrape a page and merge the chosen components into a new or existing dataset
async fn import(
    config: &Config,
    repo: &DatasetRepository,
    url: &str,
    name: Option<&str>,
    components: &[usize],
    into: Option<Uuid>,
) -> anyhow::Result<()> {
    let fetcher = PageFetcher::new(&config.http_config())?;
    let result = fetcher.scrape(url).await?;
    let selected = select_components(&result, components)?;
    if selected.is_empty() {
        bail!("Nothing to import from {}", url);
    }

    let (initial, existing_name) = match into {
        Some(id) => {
            let dataset = repo
                .get_dataset(id)
                .await?
                .with_context(|| format!("Dataset {} not found", id))?;
            let rows = repo.dataset_rows(id).await?;
            (
                TableState::from_saved(&dataset.columns.0, rows),
                Some(dataset.name),
            )
        }
        None => (TableState::default(), None),
    };

    let mut editor = TableEditor::new(initial);
    for component in &selected {
        editor.import_component(component, ImportMode::Append);
    }
    let table = editor.into_state();

    match into {
        Some(id) => {
            let name = name.map(str::to_string).or(existing_name).unwrap_or_default();
            repo.replace_dataset(id, &name, &table.headers, &table.rows)
                .await?;
            info!(
                "Appended {} components to {} ({} rows total)",
                selected.len(),
                id,
                table.rows.len()
            );
            println!("{}", id);
        }
        None => {
            let name = name.context("--name is required when creating a dataset")?;
            let new_data = NewDataset::new(name, Some(url.to_string()), table.rows)?
                .with_description(Some(result.meta_description.clone()))
                .with_columns(table.headers);
            let id = repo.create_dataset(&new_data).await?;
            info!(
                "Imported {} rows from {} into '{}' ({})",
                new_data.rows.len(),
                url,
                new_data.name,
                id
            );
            println!("{}", id);
        }
    }

    Ok(())
}

/// Show stored datasets, newest first
async fn list(repo: &DatasetRepository) -> anyhow::Result<()> {
    let summaries = repo.list_datasets().await?;
    if summaries.is_empty() {
        eprintln!("No datasets stored yet. Try: datamart import <url> --name <name>");
        return Ok(());
    }
    print!("{}", render_listing(&summaries));
    Ok(())
}

/// Export a dataset's rows to stdout
async fn export(repo: &DatasetRepository, id: Uuid, format: ExportFormat) -> anyhow::Result<()> {
    info!("Exporting dataset {}...", id);

    let dataset = repo
        .get_dataset(id)
        .await?
        .with_context(|| format!("Dataset {} not found", id))?;
    let rows = repo.dataset_rows(id).await?;

    print!("{}", render_rows(format, &dataset.columns.0, &rows)?);

    info!("Export complete: {} rows", rows.len());
    Ok(())
}
