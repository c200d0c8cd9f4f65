//! Domain models shared by the scraper, the stores and the HTTP API.
//!
//! Wire names are camelCase so the JSON contracts stay stable for the admin
//! and storefront front ends.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

use crate::error::AppError;

/// One table row: column label → cell text, in insertion order. Absent
/// cells read as empty.
pub type Row = IndexMap<String, String>;

/// Kind of structured unit pulled out of a scraped page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Table,
    Links,
    /// Reserved for list extraction; the extractor does not emit it yet.
    List,
}

/// A table or link collection extracted from a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedComponent {
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
    pub count: usize,
}

impl ScrapedComponent {
    /// Builds a component, deriving `count` from the rows.
    pub fn new(
        kind: ComponentKind,
        title: Option<String>,
        headers: Vec<String>,
        rows: Vec<Row>,
    ) -> Self {
        let count = rows.len();
        Self {
            kind,
            title,
            headers,
            rows,
            count,
        }
    }
}

/// Everything extracted from a single fetched page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResult {
    pub page_title: String,
    pub meta_description: String,
    pub components: Vec<ScrapedComponent>,
}

impl ScrapeResult {
    /// True when the page had nothing worth importing.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

/// A row of the `datasets` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub source_url: Option<String>,
    /// Whole currency units.
    pub price: i64,
    pub is_published: bool,
    /// Ordered column labels.
    pub columns: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A dataset plus its row count, for listings.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub dataset: Dataset,
    pub row_count: i64,
}

/// Input for creating a dataset (DTO).
#[derive(Debug, Clone)]
pub struct NewDataset {
    pub name: String,
    pub description: Option<String>,
    pub source_url: Option<String>,
    pub price: i64,
    /// Drafts stay out of the storefront until published.
    pub is_published: bool,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl NewDataset {
    /// Validates and builds a new dataset.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ValidationError` if `name` is blank.
    ///
    /// # Examples
    ///
    /// ```
    /// use datamart_core::models::{NewDataset, Row};
    ///
    /// let row: Row = [("A".to_string(), "1".to_string())].into();
    /// let dataset = NewDataset::new("Q1", None, vec![row]).unwrap();
    /// assert_eq!(dataset.columns, vec!["A".to_string()]);
    /// assert!(NewDataset::new("  ", None, vec![]).is_err());
    /// ```
    pub fn new(
        name: impl Into<String>,
        source_url: Option<String>,
        rows: Vec<Row>,
    ) -> Result<Self, AppError> {
        let name = validate_name(name.into())?;
        Ok(Self {
            name,
            description: None,
            source_url: source_url.filter(|u| !u.trim().is_empty()),
            price: crate::config::StorefrontConfig::default().default_price,
            is_published: false,
            columns: derive_columns(&rows),
            rows,
        })
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|d| !d.trim().is_empty());
        self
    }

    /// Uses an explicit column order instead of the one derived from rows.
    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        if !columns.is_empty() {
            self.columns = columns;
        }
        self
    }
}

/// Trims a dataset name and rejects blanks.
pub fn validate_name(name: String) -> Result<String, AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::ValidationError(
            "dataset name is required".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

/// Column labels in first-seen order across rows.
pub fn derive_columns(rows: &[Row]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();
    for key in rows.iter().flat_map(|row| row.keys()) {
        if seen.insert(key.as_str()) {
            columns.push(key.clone());
        }
    }
    columns
}

/// Storefront metadata edits. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetListing {
    pub description: Option<String>,
    pub price: Option<i64>,
    pub is_published: Option<bool>,
}

impl DatasetListing {
    pub fn validate(self) -> Result<Self, AppError> {
        if matches!(self.price, Some(price) if price < 0) {
            return Err(AppError::ValidationError(
                "price cannot be negative".to_string(),
            ));
        }
        Ok(self)
    }
}

/// A row of the `blog_posts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    /// Markdown or HTML.
    pub content: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating or updating a blog post (DTO).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBlogPost {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_published: bool,
}

impl NewBlogPost {
    /// Trims fields, de-duplicates categories and tags, and checks that the
    /// required fields are present.
    pub fn validate(self) -> Result<Self, AppError> {
        let post = Self {
            title: self.title.trim().to_string(),
            slug: self.slug.trim().to_string(),
            description: self.description.trim().to_string(),
            content: self.content,
            categories: normalize_labels(self.categories),
            tags: normalize_labels(self.tags),
            is_published: self.is_published,
        };

        for (field, value) in [
            ("title", &post.title),
            ("slug", &post.slug),
            ("description", &post.description),
            ("content", &post.content),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::ValidationError(format!("{} is required", field)));
            }
        }
        Ok(post)
    }
}

/// Trims labels, drops empties and duplicates, keeps first occurrence order.
pub fn normalize_labels(labels: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    labels
        .into_iter()
        .map(|label| label.trim().to_string())
        .filter(|label| !label.is_empty() && seen.insert(label.clone()))
        .collect()
}

/// Computes `published_at` for a post being saved.
///
/// The timestamp is set on the transition to published, kept while the post
/// stays published and cleared when it is unpublished.
pub fn resolve_published_at(
    previous: Option<&BlogPost>,
    is_published: bool,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if !is_published {
        return None;
    }
    match previous {
        Some(post) if post.is_published => post.published_at.or(Some(now)),
        _ => Some(now),
    }
}
