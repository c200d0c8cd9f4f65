//! Dataset repository for PostgreSQL.
//!
//! Rows live in `data_rows`, one JSON object per row, ordered by
//! `position`. Every write that touches rows runs in a single transaction so
//! readers never see a dataset with half of its rows.

use async_trait::async_trait;
use datamart_core::error::AppError;
use datamart_core::models::{Dataset, DatasetListing, DatasetSummary, NewDataset, Row};
use sqlx::types::Json;
use sqlx::{PgPool, Pool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::store::{dataset_not_found, prepare_replace, DatasetStore};

/// Column list for SELECT queries. Must remain a const literal to ensure SQL safety
/// since format!() bypasses sqlx compile-time validation.
const DATASET_COLUMNS: &str =
    "id, name, description, source_url, price, is_published, columns, created_at, updated_at";

/// Repository for dataset persistence in PostgreSQL.
///
/// # Examples
///
/// ```no_run
/// use sqlx::postgres::PgPoolOptions;
/// use datamart_db::DatasetRepository;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = PgPoolOptions::new()
///     .max_connections(5)
///     .connect("postgresql://localhost/datamart")
///     .await?;
///
/// let repo = DatasetRepository::new(pool);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DatasetRepository {
    pool: Pool<Postgres>,
}

impl DatasetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DatasetStore for DatasetRepository {
    async fn create_dataset(&self, new_data: &NewDataset) -> Result<Uuid, AppError> {
        let id = Uuid::new_v4();
        let mut tx = self.pool.begin().await.map_err(AppError::DatabaseError)?;

        sqlx::query(
            r#"
            INSERT INTO datasets (id, name, description, source_url, price, is_published, columns)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(id)
        .bind(&new_data.name)
        .bind(&new_data.description)
        .bind(&new_data.source_url)
        .bind(new_data.price)
        .bind(new_data.is_published)
        .bind(serde_json::to_value(&new_data.columns)?)
        .execute(&mut *tx)
        .await
        .map_err(AppError::DatabaseError)?;

        insert_rows(&mut tx, id, &new_data.rows).await?;
        tx.commit().await.map_err(AppError::DatabaseError)?;

        debug!(dataset = %id, rows = new_data.rows.len(), "Created dataset");
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
        let mut tx = self.pool.begin().await.map_err(AppError::DatabaseError)?;

        let updated = sqlx::query(
            r#"
            UPDATE datasets
            SET name = $2, columns = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&name)
        .bind(serde_json::to_value(&columns)?)
        .execute(&mut *tx)
        .await
        .map_err(AppError::DatabaseError)?;

        // Dropping the transaction rolls it back.
        if updated.rows_affected() == 0 {
            return Err(dataset_not_found(id));
        }

        sqlx::query("DELETE FROM data_rows WHERE dataset_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::DatabaseError)?;

        insert_rows(&mut tx, id, rows).await?;
        tx.commit().await.map_err(AppError::DatabaseError)?;

        debug!(dataset = %id, rows = rows.len(), "Replaced dataset rows");
        Ok(())
    }

    async fn update_listing(
        &self,
        id: Uuid,
        listing: &DatasetListing,
    ) -> Result<Dataset, AppError> {
        let listing = listing.clone().validate()?;
        let query = format!(
            r#"
            UPDATE datasets
            SET description = COALESCE($2, description),
                price = COALESCE($3, price),
                is_published = COALESCE($4, is_published),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            DATASET_COLUMNS
        );
        sqlx::query_as::<_, Dataset>(&query)
            .bind(id)
            .bind(&listing.description)
            .bind(listing.price)
            .bind(listing.is_published)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?
            .ok_or_else(|| dataset_not_found(id))
    }

    async fn delete_dataset(&self, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::DatabaseError)?;

        sqlx::query("DELETE FROM data_rows WHERE dataset_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::DatabaseError)?;
        sqlx::query("DELETE FROM datasets WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::DatabaseError)?;

        tx.commit().await.map_err(AppError::DatabaseError)?;
        Ok(())
    }

    async fn get_dataset(&self, id: Uuid) -> Result<Option<Dataset>, AppError> {
        let query = format!("SELECT {} FROM datasets WHERE id = $1", DATASET_COLUMNS);
        let result = sqlx::query_as::<_, Dataset>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        Ok(result)
    }

    async fn dataset_rows(&self, id: Uuid) -> Result<Vec<Row>, AppError> {
        let rows: Vec<RowContent> = sqlx::query_as(
            r#"
            SELECT content
            FROM data_rows
            WHERE dataset_id = $1
            ORDER BY position, id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;

        Ok(rows.into_iter().map(|row| row.content.0).collect())
    }

    async fn list_datasets(&self) -> Result<Vec<DatasetSummary>, AppError> {
        let summaries = sqlx::query_as::<_, DatasetSummary>(
            r#"
            SELECT d.id, d.name, d.description, d.source_url, d.price, d.is_published,
                   d.columns, d.created_at, d.updated_at,
                   COALESCE(r.row_count, 0) AS row_count
            FROM datasets d
            LEFT JOIN (
                SELECT dataset_id, COUNT(*) AS row_count
                FROM data_rows
                GROUP BY dataset_id
            ) r ON r.dataset_id = d.id
            ORDER BY d.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;

        Ok(summaries)
    }
}

/// Inserts rows in order with one statement.
async fn insert_rows(
    tx: &mut Transaction<'_, Postgres>,
    dataset_id: Uuid,
    rows: &[Row],
) -> Result<(), AppError> {
    if rows.is_empty() {
        return Ok(());
    }

    // Sent as text so the JSON column keeps each row's key order.
    let contents = rows
        .iter()
        .map(serde_json::to_string)
        .collect::<Result<Vec<_>, _>>()?;

    sqlx::query(
        r#"
        INSERT INTO data_rows (dataset_id, position, content)
        SELECT $1, (t.ord - 1)::INTEGER, t.content::JSON
        FROM UNNEST($2::TEXT[]) WITH ORDINALITY AS t(content, ord)
        "#,
    )
    .bind(dataset_id)
    .bind(&contents)
    .execute(&mut **tx)
    .await
    .map_err(AppError::DatabaseError)?;

    Ok(())
}

/// Helper struct for deserializing row content
#[derive(sqlx::FromRow)]
struct RowContent {
    content: Json<Row>,
}
