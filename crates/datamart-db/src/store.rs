//! Storage seams for the persistence gateway.
//!
//! The HTTP server and the CLI talk to these traits, never to a concrete
//! backend. [`crate::DatasetRepository`] and [`crate::BlogRepository`] store
//! to PostgreSQL; [`crate::MemoryStore`] keeps everything in process.

use async_trait::async_trait;
use datamart_core::error::AppError;
use datamart_core::models::{
    derive_columns, validate_name, BlogPost, Dataset, DatasetListing, DatasetSummary, NewBlogPost,
    NewDataset, Row,
};
use uuid::Uuid;

/// Datasets and their rows.
#[async_trait]
pub trait DatasetStore: Send + Sync {
    /// Creates the dataset and one row record per row. Returns the new id.
    async fn create_dataset(&self, new_data: &NewDataset) -> Result<Uuid, AppError>;

    /// Renames the dataset and replaces all of its rows atomically.
    ///
    /// An empty `columns` slice means "derive from rows". Fails with
    /// `NotFound` if the dataset does not exist, in which case nothing is
    /// written.
    async fn replace_dataset(
        &self,
        id: Uuid,
        name: &str,
        columns: &[String],
        rows: &[Row],
    ) -> Result<(), AppError>;

    /// Applies storefront metadata edits and returns the updated dataset.
    async fn update_listing(
        &self,
        id: Uuid,
        listing: &DatasetListing,
    ) -> Result<Dataset, AppError>;

    /// Deletes rows then the dataset. Unknown ids are not an error.
    async fn delete_dataset(&self, id: Uuid) -> Result<(), AppError>;

    async fn get_dataset(&self, id: Uuid) -> Result<Option<Dataset>, AppError>;

    /// Rows in their stored order.
    async fn dataset_rows(&self, id: Uuid) -> Result<Vec<Row>, AppError>;

    /// All datasets, newest first.
    async fn list_datasets(&self) -> Result<Vec<DatasetSummary>, AppError>;
}

/// Blog posts.
#[async_trait]
pub trait BlogStore: Send + Sync {
    /// Fails with `UniquenessViolation` if the slug is taken.
    async fn create_post(&self, post: &NewBlogPost) -> Result<BlogPost, AppError>;

    /// Fails with `NotFound` for unknown ids and `UniquenessViolation` if
    /// the new slug belongs to another post.
    async fn update_post(&self, id: Uuid, post: &NewBlogPost) -> Result<BlogPost, AppError>;

    /// Unknown ids are not an error.
    async fn delete_post(&self, id: Uuid) -> Result<(), AppError>;

    async fn get_post(&self, id: Uuid) -> Result<Option<BlogPost>, AppError>;

    async fn get_post_by_slug(&self, slug: &str) -> Result<Option<BlogPost>, AppError>;

    /// All posts, newest first.
    async fn list_posts(&self) -> Result<Vec<BlogPost>, AppError>;
}

/// Validated name and resolved column order for a replace.
pub(crate) fn prepare_replace(
    name: &str,
    columns: &[String],
    rows: &[Row],
) -> Result<(String, Vec<String>), AppError> {
    let name = validate_name(name.to_string())?;
    let columns = if columns.is_empty() {
        derive_columns(rows)
    } else {
        columns.to_vec()
    };
    Ok((name, columns))
}

pub(crate) fn slug_taken(slug: &str) -> AppError {
    AppError::UniquenessViolation(format!("slug '{}'", slug))
}

pub(crate) fn dataset_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("dataset {}", id))
}

pub(crate) fn post_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("blog post {}", id))
}
