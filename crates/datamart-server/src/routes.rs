mod admin;
mod blog;
mod storefront;

use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use datamart_core::AppError;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ErrorResponse, RequestError};
use crate::session::require_admin;
use crate::SharedState;

/// `axum::Json` with rejections reported as `{ error }` bodies.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(RequestError))]
pub struct AppJson<T>(pub T);

impl<T> IntoResponse for AppJson<T>
where
    axum::Json<T>: IntoResponse,
{
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(RequestError))]
pub struct AppPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(RequestError))]
pub struct AppQuery<T>(pub T);

#[derive(Serialize)]
pub struct Success {
    pub success: bool,
}

impl Success {
    pub fn ok() -> AppJson<Self> {
        AppJson(Self { success: true })
    }
}

/// Parses an id taken from a query string or JSON body.
pub fn parse_id(raw: &str, field: &str) -> Result<Uuid, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::ValidationError(format!("{} is required", field)));
    }
    Uuid::parse_str(raw).map_err(|_| AppError::ValidationError(format!("invalid {}", field)))
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

async fn health() -> AppJson<Health> {
    AppJson(Health { status: "ok" })
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        AppJson(ErrorResponse {
            error: "Not found".to_string(),
        }),
    )
}

pub fn route_handler(state: SharedState) -> Router<SharedState> {
    let admin = Router::new()
        .route("/scrape", post(admin::scrape))
        .route("/datasets", get(admin::list_datasets))
        .route("/save", post(admin::save_dataset))
        .route(
            "/dataset/{id}",
            get(admin::get_dataset)
                .put(admin::replace_dataset)
                .patch(admin::update_listing)
                .delete(admin::delete_dataset),
        )
        .route("/blog", get(blog::list_all).post(blog::create_post))
        .route(
            "/blog/{id}",
            get(blog::get_post)
                .put(blog::update_post)
                .delete(blog::delete_post),
        )
        .route_layer(middleware::from_fn_with_state(state, require_admin))
        .route("/verify", post(admin::verify));

    Router::new()
        .route("/api/health", get(health))
        .route("/api/datasets", get(storefront::list_datasets))
        .route("/api/datasets/{id}", get(storefront::get_dataset))
        .route("/api/datasets/{id}/csv", get(storefront::download_csv))
        .route("/api/checkout", get(storefront::checkout))
        .route("/api/send-mail", post(storefront::send_mail))
        .route("/api/blog", get(blog::list_published))
        .route("/api/blog/{slug}", get(blog::get_published))
        .nest("/api/admin", admin)
        .fallback(not_found)
}
