use thiserror::Error;

/// Application-wide error types.
///
/// Every layer of Datamart reports failures through this enum so the HTTP
/// server and the CLI can classify them without string matching.
///
/// # Error Conversion
///
/// Library errors convert automatically via `#[from]`:
/// - `sqlx::Error` → `AppError::DatabaseError`
/// - `serde_json::Error` → `AppError::SerializationError`
///
/// Unique-constraint violations are mapped to
/// [`AppError::UniquenessViolation`] by the repositories before they reach
/// callers.
///
/// # Examples
///
/// ```
/// use datamart_core::error::AppError;
///
/// fn save(name: &str) -> Result<(), AppError> {
///     if name.trim().is_empty() {
///         return Err(AppError::ValidationError("name is required".to_string()));
///     }
///     Ok(())
/// }
///
/// assert!(save("").is_err());
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Fetching a remote page failed.
    ///
    /// Covers network errors, timeouts, too many redirects and non-2xx
    /// responses. No partial scrape result is produced.
    #[error("Failed to fetch {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    /// A required field is missing or has the wrong shape.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The requested dataset or post does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint was violated (e.g. a duplicate blog slug).
    #[error("Already exists: {0}")]
    UniquenessViolation(String),

    /// Missing, forged or expired admin credentials.
    #[error("Unauthorized")]
    Unauthorized,

    /// Full dataset access was requested without a completed checkout.
    #[error("Payment required: {0}")]
    PaymentRequired(String),

    /// A table operation addressed a row that does not exist.
    #[error("Row {index} out of range (table has {len} rows)")]
    RowOutOfRange { index: usize, len: usize },

    /// Database operation failed.
    ///
    /// Wraps connection failures, query errors and constraint violations that
    /// have no more specific variant.
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// JSON serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Generic application error for cases not covered by specific variants.
    ///
    /// Use this sparingly - prefer creating specific error variants.
    #[error("Error: {0}")]
    Generic(String),
}

impl AppError {
    /// Returns a user-friendly error message suitable for CLI output.
    pub fn user_message(&self) -> String {
        match self {
            AppError::DatabaseError(e) => {
                if e.to_string().contains("connection") {
                    "Cannot connect to database. Is PostgreSQL running?\n   Check DATABASE_URL or use --in-memory.".to_string()
                } else {
                    format!("Database error: {}", e)
                }
            }
            AppError::FetchFailed { url, reason } => {
                if reason.contains("timed out") {
                    format!(
                        "Fetching {} timed out.\n   The site may be slow or unreachable. Try again later.",
                        url
                    )
                } else {
                    format!(
                        "Could not fetch {}: {}\n   Check the URL and your internet connection.",
                        url, reason
                    )
                }
            }
            AppError::UniquenessViolation(what) => {
                format!("{} is already taken.\n   Pick a different value.", what)
            }
            AppError::Unauthorized => {
                "Admin passcode rejected or session expired.\n   Sign in again.".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Returns true if this error is retryable.
    ///
    /// Only fetch failures qualify; the core never retries on its own, the
    /// caller decides.
    ///
    /// # Examples
    ///
    /// ```
    /// use datamart_core::error::AppError;
    ///
    /// let err = AppError::FetchFailed {
    ///     url: "https://example.com".to_string(),
    ///     reason: "connection reset".to_string(),
    /// };
    /// assert!(err.is_retryable());
    ///
    /// let err = AppError::NotFound("dataset 42".to_string());
    /// assert!(!err.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::FetchFailed { .. })
    }
}
