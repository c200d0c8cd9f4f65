//! Storefront rules: freemium previews and catalogue filtering.
//!
//! Pure business logic, decoupled from storage and HTTP.

use serde::{Deserialize, Serialize};

use crate::models::{Dataset, DatasetSummary, Row};

/// What a visitor gets to see of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetPreview {
    pub rows: Vec<Row>,
    pub total_rows: usize,
    /// Rows hidden behind the paywall.
    pub locked_count: usize,
    pub is_paid: bool,
}

/// Cuts a dataset's rows down to the freemium preview.
///
/// Paid visitors see everything. Everyone else sees the first `limit` rows.
///
/// # Examples
///
/// ```
/// use datamart_core::storefront::preview;
/// use datamart_core::models::Row;
///
/// let rows = vec![Row::new(); 5];
/// let view = preview(rows, false, 3);
/// assert_eq!(view.rows.len(), 3);
/// assert_eq!(view.locked_count, 2);
/// ```
pub fn preview(mut rows: Vec<Row>, is_paid: bool, limit: usize) -> DatasetPreview {
    let total_rows = rows.len();
    if is_paid {
        return DatasetPreview {
            rows,
            total_rows,
            locked_count: 0,
            is_paid,
        };
    }
    rows.truncate(limit);
    DatasetPreview {
        rows,
        total_rows,
        locked_count: total_rows.saturating_sub(limit),
        is_paid,
    }
}

/// Price bucket selected in the catalogue sidebar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceFilter {
    #[default]
    All,
    Free,
    Paid,
}

impl PriceFilter {
    pub fn matches(self, price: i64) -> bool {
        match self {
            PriceFilter::All => true,
            PriceFilter::Free => price == 0,
            PriceFilter::Paid => price > 0,
        }
    }
}

/// Catalogue query: free-text search plus a price bucket.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub price: PriceFilter,
}

impl CatalogFilter {
    /// Case-insensitive substring match over name and description.
    pub fn matches(&self, dataset: &Dataset) -> bool {
        if !self.price.matches(dataset.price) {
            return false;
        }
        let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
            return true;
        };
        let term = term.to_lowercase();
        dataset.name.to_lowercase().contains(&term)
            || dataset
                .description
                .as_deref()
                .unwrap_or_default()
                .to_lowercase()
                .contains(&term)
    }

    /// Published datasets matching the filter, order preserved.
    pub fn apply(&self, datasets: Vec<DatasetSummary>) -> Vec<DatasetSummary> {
        datasets
            .into_iter()
            .filter(|s| s.dataset.is_published && self.matches(&s.dataset))
            .collect()
    }
}
