//! Configuration types for Datamart components.
//!
//! Every struct carries the production defaults; the CLI overrides a few of
//! them from flags and environment variables (`HTTP_TIMEOUT_SECS`,
//! `DB_MAX_CONNECTIONS`).

use std::time::Duration;

/// User agent presented to scraped sites. Some sites refuse obvious bots.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Database connection pool configuration.
pub struct DbConfig {
    pub max_connections: u32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self { max_connections: 5 }
    }
}

/// HTTP client configuration for page fetching.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub max_redirects: usize,
    /// Tolerate self-signed or misconfigured certificates on target sites.
    pub accept_invalid_certs: bool,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_redirects: 5,
            accept_invalid_certs: true,
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

/// Public storefront configuration.
#[derive(Debug, Clone, Copy)]
pub struct StorefrontConfig {
    /// Rows shown to visitors who have not paid.
    pub preview_rows: usize,
    /// Price assigned to new datasets, in whole currency units.
    pub default_price: i64,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            preview_rows: 3,
            default_price: 50,
        }
    }
}

/// Admin session configuration.
#[derive(Debug, Clone, Copy)]
pub struct AuthConfig {
    pub session_ttl: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(12 * 60 * 60),
        }
    }
}

/// Mock mailer configuration.
#[derive(Debug, Clone, Copy)]
pub struct MailerConfig {
    pub simulated_delay: Duration,
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            simulated_delay: Duration::from_millis(1500),
        }
    }
}
