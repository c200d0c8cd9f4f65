//! Admin console: login, scraping and dataset management.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use datamart_core::{
    AppError, Dataset, DatasetListing, DatasetSummary, NewDataset, Row, ScrapeResult,
    SessionToken,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::{AppJson, AppPath, Success};
use crate::error::RequestResult;
use crate::{SharedState, LOG_TARGET};

#[derive(Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    code: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyResponse {
    success: bool,
    #[serde(flatten)]
    session: Option<SessionToken>,
}

/// Exchanges the passcode for a bearer token. Failures answer
/// `401 { success: false }` rather than an error body.
pub async fn verify(
    State(state): State<SharedState>,
    AppJson(request): AppJson<VerifyRequest>,
) -> Response {
    match state.auth.login(&request.code, Utc::now()) {
        Ok(session) => {
            info!(target: LOG_TARGET, expires_at = %session.expires_at, "Admin session issued");
            AppJson(VerifyResponse {
                success: true,
                session: Some(session),
            })
            .into_response()
        }
        Err(_) => {
            warn!(target: LOG_TARGET, "Rejected admin passcode");
            (
                StatusCode::UNAUTHORIZED,
                AppJson(VerifyResponse {
                    success: false,
                    session: None,
                }),
            )
                .into_response()
        }
    }
}

#[derive(Deserialize)]
pub struct ScrapeRequest {
    #[serde(default)]
    url: String,
}

#[derive(Serialize)]
pub struct ScrapeResponse {
    success: bool,
    data: ScrapeResult,
}

pub async fn scrape(
    State(state): State<SharedState>,
    AppJson(request): AppJson<ScrapeRequest>,
) -> RequestResult<AppJson<ScrapeResponse>> {
    let url = request.url.trim();
    if url.is_empty() {
        return Err(AppError::ValidationError("url is required".to_string()).into());
    }

    let data = state.fetcher.scrape(url).await?;
    Ok(AppJson(ScrapeResponse {
        success: true,
        data,
    }))
}

pub async fn list_datasets(
    State(state): State<SharedState>,
) -> RequestResult<AppJson<Vec<DatasetSummary>>> {
    Ok(AppJson(state.datasets.list_datasets().await?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    #[serde(default)]
    name: String,
    description: Option<String>,
    source_url: Option<String>,
    #[serde(default)]
    columns: Vec<String>,
    data_rows: Vec<Row>,
    #[serde(default)]
    is_published: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    success: bool,
    dataset_id: Uuid,
}

/// Stores a new dataset at the default price.
///
/// Datasets are saved as drafts unless `isPublished` is set; drafts are
/// published later through `PATCH /api/admin/dataset/{id}`.
pub async fn save_dataset(
    State(state): State<SharedState>,
    AppJson(request): AppJson<SaveRequest>,
) -> RequestResult<AppJson<SaveResponse>> {
    let mut new_data = NewDataset::new(request.name, request.source_url, request.data_rows)?
        .with_description(request.description)
        .with_columns(request.columns);
    new_data.price = state.storefront.default_price;
    new_data.is_published = request.is_published;

    let dataset_id = state.datasets.create_dataset(&new_data).await?;
    info!(
        target: LOG_TARGET,
        dataset = %dataset_id,
        rows = new_data.rows.len(),
        "Saved dataset '{}'",
        new_data.name
    );
    Ok(AppJson(SaveResponse {
        success: true,
        dataset_id,
    }))
}

#[derive(Serialize)]
pub struct DatasetDetail {
    dataset: Dataset,
    rows: Vec<Row>,
}

pub async fn get_dataset(
    State(state): State<SharedState>,
    AppPath(id): AppPath<Uuid>,
) -> RequestResult<AppJson<DatasetDetail>> {
    let dataset = state
        .datasets
        .get_dataset(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("dataset {}", id)))?;
    let rows = state.datasets.dataset_rows(id).await?;
    Ok(AppJson(DatasetDetail { dataset, rows }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    columns: Vec<String>,
    data_rows: Vec<Row>,
}

/// Replace-overwrite: the stored rows become exactly `dataRows`.
pub async fn replace_dataset(
    State(state): State<SharedState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<ReplaceRequest>,
) -> RequestResult<AppJson<Success>> {
    state
        .datasets
        .replace_dataset(id, &request.name, &request.columns, &request.data_rows)
        .await?;
    info!(
        target: LOG_TARGET,
        dataset = %id,
        rows = request.data_rows.len(),
        "Replaced dataset"
    );
    Ok(Success::ok())
}

pub async fn update_listing(
    State(state): State<SharedState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(listing): AppJson<DatasetListing>,
) -> RequestResult<AppJson<Dataset>> {
    let listing = listing.validate()?;
    let dataset = state.datasets.update_listing(id, &listing).await?;
    info!(
        target: LOG_TARGET,
        dataset = %id,
        published = dataset.is_published,
        price = dataset.price,
        "Updated listing"
    );
    Ok(AppJson(dataset))
}

pub async fn delete_dataset(
    State(state): State<SharedState>,
    AppPath(id): AppPath<Uuid>,
) -> RequestResult<AppJson<Success>> {
    state.datasets.delete_dataset(id).await?;
    info!(target: LOG_TARGET, dataset = %id, "Deleted dataset");
    Ok(Success::ok())
}
