use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use datamart_core::{DbConfig, HttpConfig};
use uuid::Uuid;

/// CLI configuration parsed from command line arguments and environment variables
#[derive(Parser, Debug)]
#[command(name = "datamart")]
#[command(
    author,
    version,
    about = "Scrape tables from web pages and sell them as datasets"
)]
#[command(after_help = "Examples:
  datamart serve --in-memory
  datamart scrape https://en.wikipedia.org/wiki/List_of_countries_by_GDP_(nominal)
  datamart import https://example.com/stats --name \"Quarterly stats\" --component 1
  datamart export 5b0c...e1 --format csv > stats.csv")]
pub struct Config {
    /// PostgreSQL database connection URL
    #[arg(long, env = "DATABASE_URL", global = true)]
    pub database_url: Option<String>,

    /// Maximum PostgreSQL pool size
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value = "5", global = true)]
    pub db_max_connections: u32,

    /// Page fetch timeout in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value = "15", global = true)]
    pub http_timeout_secs: u64,

    #[command(subcommand)]
    pub command: Command,
}

impl Config {
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            timeout: Duration::from_secs(self.http_timeout_secs),
            ..HttpConfig::default()
        }
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig {
            max_connections: self.db_max_connections,
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API
    #[command(after_help = "Examples:
  datamart serve                          # PostgreSQL from DATABASE_URL
  datamart serve --in-memory              # Nothing persisted
  datamart serve --listen 0.0.0.0:8080")]
    Serve {
        /// Address to listen on
        #[arg(long, env = "DATAMART_LISTEN", default_value = "127.0.0.1:3000")]
        listen: SocketAddr,

        /// Keep everything in memory instead of PostgreSQL
        #[arg(long)]
        in_memory: bool,

        /// Passcode exchanged for admin session tokens
        #[arg(long, env = "ADMIN_PASSCODE", hide_env_values = true)]
        admin_passcode: String,

        /// Key for signing session tokens (defaults to the passcode)
        #[arg(long, env = "SESSION_SECRET", hide_env_values = true)]
        session_secret: Option<String>,
    },
    /// Scrape pages and show the tables, lists and links found
    Scrape {
        /// Pages to scrape, fetched concurrently
        #[arg(value_name = "URL", required = true)]
        urls: Vec<String>,

        /// Print the raw scrape result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Scrape a page and store selected components as a dataset
    #[command(after_help = "Components are numbered as printed by `datamart scrape`.
Without --component every component is imported.")]
    Import {
        #[arg(value_name = "URL")]
        url: String,

        /// Dataset name (defaults to the existing name with --into)
        #[arg(short, long, required_unless_present = "into")]
        name: Option<String>,

        /// Component number to import, repeatable
        #[arg(short, long = "component", value_name = "N")]
        components: Vec<usize>,

        /// Append to an existing dataset instead of creating one
        #[arg(long, value_name = "ID")]
        into: Option<Uuid>,
    },
    /// List stored datasets
    List,
    /// Print a dataset's rows
    #[command(after_help = "Examples:
  datamart export <ID> --format csv > data.csv
  datamart export <ID> --format jsonl")]
    Export {
        #[arg(value_name = "ID")]
        id: Uuid,

        /// Output format for exported rows
        #[arg(short, long, default_value = "jsonl")]
        format: ExportFormat,
    },
}

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// JSON Lines format (one row object per line)
    Jsonl,
    /// Standard JSON array format
    Json,
    /// CSV format with a header line
    Csv,
}
