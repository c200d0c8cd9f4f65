//! Datamart Core - Domain types, table editing, error handling, and configuration.

pub mod auth;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod storefront;
pub mod table;

pub use auth::{AdminAuth, SessionToken};
pub use config::{AuthConfig, DbConfig, HttpConfig, MailerConfig, StorefrontConfig};
pub use error::AppError;
pub use models::{
    BlogPost, ComponentKind, Dataset, DatasetListing, DatasetSummary, NewBlogPost, NewDataset,
    Row, ScrapeResult, ScrapedComponent,
};
pub use storefront::{preview, CatalogFilter, DatasetPreview, PriceFilter};
pub use table::{ImportMode, TableEditor, TableState};
