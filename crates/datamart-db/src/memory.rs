//! In-process store used by `serve --in-memory` and by tests.
//!
//! Each operation takes the lock once, so replacing a dataset's rows is
//! atomic with respect to readers just like the PostgreSQL transaction.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use datamart_core::error::AppError;
use datamart_core::models::{
    resolve_published_at, BlogPost, Dataset, DatasetListing, DatasetSummary, NewBlogPost,
    NewDataset, Row,
};
use sqlx::types::Json;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::store::{
    dataset_not_found, post_not_found, prepare_replace, slug_taken, BlogStore, DatasetStore,
};

#[derive(Default)]
struct Inner {
    /// Insertion order; listings walk it backwards.
    datasets: Vec<StoredDataset>,
    posts: Vec<BlogPost>,
}

struct StoredDataset {
    dataset: Dataset,
    rows: Vec<Row>,
}

impl Inner {
    fn dataset_mut(&mut self, id: Uuid) -> Option<&mut StoredDataset> {
        self.datasets.iter_mut().find(|d| d.dataset.id == id)
    }

    fn slug_in_use(&self, slug: &str, except: Option<Uuid>) -> bool {
        self.posts
            .iter()
            .any(|p| p.slug == slug && Some(p.id) != except)
    }
}

/// Both stores behind one lock. Cloning shares the data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DatasetStore for MemoryStore {
    async fn create_dataset(&self, new_data: &NewDataset) -> Result<Uuid, AppError> {
        let now = Utc::now();
        let dataset = Dataset {
            id: Uuid::new_v4(),
            name: new_data.name.clone(),
            description: new_data.description.clone(),
            source_url: new_data.source_url.clone(),
            price: new_data.price,
            is_published: new_data.is_published,
            columns: Json(new_data.columns.clone()),
            created_at: now,
            updated_at: now,
        };
        let id = dataset.id;

        self.inner.write().await.datasets.push(StoredDataset {
            dataset,
            rows: new_data.rows.clone(),
        });
        Ok(id)
    }

    async fn replace_dataset(
        &self,
        id: Uuid,
        name: &str,
        columns: &[String],
        rows: &[Row],
    ) -> Result<(), AppError> {
        let (name, columns) = prepare_replace(name, columns, rows)?;
        let mut inner = self.inner.write().await;
        let stored = inner.dataset_mut(id).ok_or_else(|| dataset_not_found(id))?;

        stored.dataset.name = name;
        stored.dataset.columns = Json(columns);
        stored.dataset.updated_at = Utc::now();
        stored.rows = rows.to_vec();
        Ok(())
    }

    async fn update_listing(
        &self,
        id: Uuid,
        listing: &DatasetListing,
    ) -> Result<Dataset, AppError> {
        let listing = listing.clone().validate()?;
        let mut inner = self.inner.write().await;
        let stored = inner.dataset_mut(id).ok_or_else(|| dataset_not_found(id))?;
        let dataset = &mut stored.dataset;

        if let Some(description) = &listing.description {
            dataset.description = Some(description.clone());
        }
        if let Some(price) = listing.price {
            dataset.price = price;
        }
        if let Some(is_published) = listing.is_published {
            dataset.is_published = is_published;
        }
        dataset.updated_at = Utc::now();
        Ok(dataset.clone())
    }

    async fn delete_dataset(&self, id: Uuid) -> Result<(), AppError> {
        self.inner
            .write()
            .await
            .datasets
            .retain(|d| d.dataset.id != id);
        Ok(())
    }

    async fn get_dataset(&self, id: Uuid) -> Result<Option<Dataset>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .datasets
            .iter()
            .find(|d| d.dataset.id == id)
            .map(|d| d.dataset.clone()))
    }

    async fn dataset_rows(&self, id: Uuid) -> Result<Vec<Row>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .datasets
            .iter()
            .find(|d| d.dataset.id == id)
            .map(|d| d.rows.clone())
            .unwrap_or_default())
    }

    async fn list_datasets(&self) -> Result<Vec<DatasetSummary>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .datasets
            .iter()
            .rev()
            .map(|d| DatasetSummary {
                dataset: d.dataset.clone(),
                row_count: d.rows.len() as i64,
            })
            .collect())
    }
}

#[async_trait]
impl BlogStore for MemoryStore {
    async fn create_post(&self, post: &NewBlogPost) -> Result<BlogPost, AppError> {
        let post = post.clone().validate()?;
        let mut inner = self.inner.write().await;
        if inner.slug_in_use(&post.slug, None) {
            return Err(slug_taken(&post.slug));
        }

        let now = Utc::now();
        let created = BlogPost {
            id: Uuid::new_v4(),
            published_at: resolve_published_at(None, post.is_published, now),
            title: post.title,
            slug: post.slug,
            description: post.description,
            content: post.content,
            categories: post.categories,
            tags: post.tags,
            is_published: post.is_published,
            created_at: now,
            updated_at: now,
        };
        inner.posts.push(created.clone());
        Ok(created)
    }

    async fn update_post(&self, id: Uuid, post: &NewBlogPost) -> Result<BlogPost, AppError> {
        let post = post.clone().validate()?;
        let mut inner = self.inner.write().await;
        let index = inner
            .posts
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| post_not_found(id))?;
        if inner.slug_in_use(&post.slug, Some(id)) {
            return Err(slug_taken(&post.slug));
        }

        let existing = &mut inner.posts[index];

        let now = Utc::now();
        existing.published_at = resolve_published_at(Some(&*existing), post.is_published, now);
        existing.title = post.title;
        existing.slug = post.slug;
        existing.description = post.description;
        existing.content = post.content;
        existing.categories = post.categories;
        existing.tags = post.tags;
        existing.is_published = post.is_published;
        existing.updated_at = now;
        Ok(existing.clone())
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), AppError> {
        self.inner.write().await.posts.retain(|p| p.id != id);
        Ok(())
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<BlogPost>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn get_post_by_slug(&self, slug: &str) -> Result<Option<BlogPost>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.posts.iter().find(|p| p.slug == slug).cloned())
    }

    async fn list_posts(&self) -> Result<Vec<BlogPost>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.posts.iter().rev().cloned().collect())
    }
}
