//! Public storefront: catalogue, freemium views, checkout and delivery.

use axum::extract::State;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Redirect};
use datamart_client::delivery::validate_email;
use datamart_core::export::to_csv;
use datamart_core::storefront::{preview, CatalogFilter, DatasetPreview};
use datamart_core::{AppError, Dataset, DatasetSummary};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{parse_id, AppJson, AppPath, AppQuery};
use crate::error::RequestResult;
use crate::{SharedState, LOG_TARGET};

/// Published datasets only; drafts look like missing ones.
async fn load_published(state: &SharedState, id: Uuid) -> Result<Dataset, AppError> {
    state
        .datasets
        .get_dataset(id)
        .await?
        .filter(|d| d.is_published)
        .ok_or_else(|| AppError::NotFound(format!("dataset {}", id)))
}

pub async fn list_datasets(
    State(state): State<SharedState>,
    AppQuery(filter): AppQuery<CatalogFilter>,
) -> RequestResult<AppJson<Vec<DatasetSummary>>> {
    let all = state.datasets.list_datasets().await?;
    Ok(AppJson(filter.apply(all)))
}

#[derive(Deserialize)]
pub struct PaidQuery {
    #[serde(default)]
    paid: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetView {
    dataset: Dataset,
    columns: Vec<String>,
    #[serde(flatten)]
    preview: DatasetPreview,
}

pub async fn get_dataset(
    State(state): State<SharedState>,
    AppPath(id): AppPath<Uuid>,
    AppQuery(query): AppQuery<PaidQuery>,
) -> RequestResult<AppJson<DatasetView>> {
    let dataset = load_published(&state, id).await?;
    let rows = state.datasets.dataset_rows(id).await?;

    Ok(AppJson(DatasetView {
        columns: dataset.columns.0.clone(),
        preview: preview(rows, query.paid, state.storefront.preview_rows),
        dataset,
    }))
}

pub async fn download_csv(
    State(state): State<SharedState>,
    AppPath(id): AppPath<Uuid>,
    AppQuery(query): AppQuery<PaidQuery>,
) -> RequestResult<impl IntoResponse> {
    let dataset = load_published(&state, id).await?;
    if !query.paid {
        return Err(AppError::PaymentRequired(format!("dataset {}", id)).into());
    }
    let rows = state.datasets.dataset_rows(id).await?;
    let body = to_csv(&dataset.columns.0, &rows);

    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}.csv\"", file_stem(&dataset.name)),
            ),
        ],
        body,
    ))
}

/// Dataset name reduced to characters safe in a header filename.
fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "dataset".to_string()
    } else {
        stem
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutQuery {
    #[serde(default)]
    dataset_id: String,
}

pub async fn checkout(
    State(state): State<SharedState>,
    AppQuery(query): AppQuery<CheckoutQuery>,
) -> RequestResult<Redirect> {
    let id = parse_id(&query.dataset_id, "datasetId")?;
    load_published(&state, id).await?;

    let target = state.payments.checkout(id).await?;
    info!(target: LOG_TARGET, dataset = %id, "Checkout complete, redirecting to {}", target);
    Ok(Redirect::to(&target))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMailRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    dataset_id: String,
}

#[derive(Serialize)]
pub struct SendMailResponse {
    success: bool,
    message: String,
}

pub async fn send_mail(
    State(state): State<SharedState>,
    AppJson(request): AppJson<SendMailRequest>,
) -> RequestResult<AppJson<SendMailResponse>> {
    let email = validate_email(&request.email)?;
    let id = parse_id(&request.dataset_id, "datasetId")?;
    load_published(&state, id).await?;

    state.mailer.send_dataset(email, id).await?;
    Ok(AppJson(SendMailResponse {
        success: true,
        message: format!("Dataset sent to {}", email),
    }))
}
