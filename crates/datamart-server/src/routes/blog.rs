//! Blog: public reading, admin authoring.

use axum::extract::State;
use axum::http::StatusCode;
use datamart_core::{AppError, BlogPost, NewBlogPost};
use tracing::info;
use uuid::Uuid;

use super::{AppJson, AppPath, Success};
use crate::error::RequestResult;
use crate::{SharedState, LOG_TARGET};

pub async fn list_published(
    State(state): State<SharedState>,
) -> RequestResult<AppJson<Vec<BlogPost>>> {
    let posts = state.posts.list_posts().await?;
    Ok(AppJson(posts.into_iter().filter(|p| p.is_published).collect()))
}

pub async fn get_published(
    State(state): State<SharedState>,
    AppPath(slug): AppPath<String>,
) -> RequestResult<AppJson<BlogPost>> {
    state
        .posts
        .get_post_by_slug(&slug)
        .await?
        .filter(|p| p.is_published)
        .map(AppJson)
        .ok_or_else(|| AppError::NotFound(format!("blog post '{}'", slug)).into())
}

pub async fn list_all(State(state): State<SharedState>) -> RequestResult<AppJson<Vec<BlogPost>>> {
    Ok(AppJson(state.posts.list_posts().await?))
}

pub async fn get_post(
    State(state): State<SharedState>,
    AppPath(id): AppPath<Uuid>,
) -> RequestResult<AppJson<BlogPost>> {
    state
        .posts
        .get_post(id)
        .await?
        .map(AppJson)
        .ok_or_else(|| AppError::NotFound(format!("blog post {}", id)).into())
}

pub async fn create_post(
    State(state): State<SharedState>,
    AppJson(post): AppJson<NewBlogPost>,
) -> RequestResult<(StatusCode, AppJson<BlogPost>)> {
    let created = state.posts.create_post(&post).await?;
    info!(target: LOG_TARGET, post = %created.id, slug = %created.slug, "Created blog post");
    Ok((StatusCode::CREATED, AppJson(created)))
}

pub async fn update_post(
    State(state): State<SharedState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(post): AppJson<NewBlogPost>,
) -> RequestResult<AppJson<BlogPost>> {
    let updated = state.posts.update_post(id, &post).await?;
    info!(target: LOG_TARGET, post = %id, published = updated.is_published, "Updated blog post");
    Ok(AppJson(updated))
}

pub async fn delete_post(
    State(state): State<SharedState>,
    AppPath(id): AppPath<Uuid>,
) -> RequestResult<AppJson<Success>> {
    state.posts.delete_post(id).await?;
    info!(target: LOG_TARGET, post = %id, "Deleted blog post");
    Ok(Success::ok())
}
