//! Datamart Client - outbound collaborators
//!
//! - [`fetcher`] - downloads third-party pages
//! - [`extract`] - turns HTML into table and link components
//! - [`delivery`] - payment and email stubs behind traits

pub mod delivery;
pub mod extract;
pub mod fetcher;

pub use delivery::{LogMailer, Mailer, MockPaymentGateway, PaymentGateway};
pub use extract::extract;
pub use fetcher::PageFetcher;
