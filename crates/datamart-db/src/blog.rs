//! Blog post repository for PostgreSQL.

use async_trait::async_trait;
use chrono::Utc;
use datamart_core::error::AppError;
use datamart_core::models::{resolve_published_at, BlogPost, NewBlogPost};
use sqlx::{PgPool, Pool, Postgres};
use uuid::Uuid;

use crate::store::{post_not_found, slug_taken, BlogStore};

const POST_COLUMNS: &str = "id, title, slug, description, content, categories, tags, is_published, published_at, created_at, updated_at";

#[derive(Clone)]
pub struct BlogRepository {
    pool: Pool<Postgres>,
}

impl BlogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps the `blog_posts_slug_key` violation to a conflict, everything else
/// to a database error.
fn map_write_error(err: sqlx::Error, slug: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => slug_taken(slug),
        _ => AppError::DatabaseError(err),
    }
}

#[async_trait]
impl BlogStore for BlogRepository {
    async fn create_post(&self, post: &NewBlogPost) -> Result<BlogPost, AppError> {
        let post = post.clone().validate()?;
        let published_at = resolve_published_at(None, post.is_published, Utc::now());

        let query = format!(
            r#"
            INSERT INTO blog_posts (
                id, title, slug, description, content, categories, tags,
                is_published, published_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            POST_COLUMNS
        );
        sqlx::query_as::<_, BlogPost>(&query)
            .bind(Uuid::new_v4())
            .bind(&post.title)
            .bind(&post.slug)
            .bind(&post.description)
            .bind(&post.content)
            .bind(&post.categories)
            .bind(&post.tags)
            .bind(post.is_published)
            .bind(published_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(e, &post.slug))
    }

    async fn update_post(&self, id: Uuid, post: &NewBlogPost) -> Result<BlogPost, AppError> {
        let post = post.clone().validate()?;
        let mut tx = self.pool.begin().await.map_err(AppError::DatabaseError)?;

        let select = format!(
            "SELECT {} FROM blog_posts WHERE id = $1 FOR UPDATE",
            POST_COLUMNS
        );
        let previous = sqlx::query_as::<_, BlogPost>(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::DatabaseError)?
            .ok_or_else(|| post_not_found(id))?;

        let published_at = resolve_published_at(Some(&previous), post.is_published, Utc::now());

        let update = format!(
            r#"
            UPDATE blog_posts
            SET title = $2, slug = $3, description = $4, content = $5,
                categories = $6, tags = $7, is_published = $8, published_at = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            POST_COLUMNS
        );
        let updated = sqlx::query_as::<_, BlogPost>(&update)
            .bind(id)
            .bind(&post.title)
            .bind(&post.slug)
            .bind(&post.description)
            .bind(&post.content)
            .bind(&post.categories)
            .bind(&post.tags)
            .bind(post.is_published)
            .bind(published_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_write_error(e, &post.slug))?;

        tx.commit().await.map_err(AppError::DatabaseError)?;
        Ok(updated)
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM blog_posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;
        Ok(())
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<BlogPost>, AppError> {
        let query = format!("SELECT {} FROM blog_posts WHERE id = $1", POST_COLUMNS);
        sqlx::query_as::<_, BlogPost>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::DatabaseError)
    }

    async fn get_post_by_slug(&self, slug: &str) -> Result<Option<BlogPost>, AppError> {
        let query = format!("SELECT {} FROM blog_posts WHERE slug = $1", POST_COLUMNS);
        sqlx::query_as::<_, BlogPost>(&query)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::DatabaseError)
    }

    async fn list_posts(&self) -> Result<Vec<BlogPost>, AppError> {
        let query = format!(
            "SELECT {} FROM blog_posts ORDER BY created_at DESC",
            POST_COLUMNS
        );
        sqlx::query_as::<_, BlogPost>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::DatabaseError)
    }
}
