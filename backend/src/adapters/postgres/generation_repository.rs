//! PostgreSQL implementation of GenerationRepository over the `images` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, GenerationId, Timestamp, UserId};
use crate::domain::generation::GenerationRecord;
use crate::ports::GenerationRepository;

const IMAGE_COLUMNS: &str =
    "id, user_id, original_path, result_path, prompt, parent_id, deleted, created_at";

pub struct PostgresGenerationRepository {
    pool: PgPool,
}

impl PostgresGenerationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ImageRow {
    id: Uuid,
    user_id: String,
    original_path: String,
    result_path: String,
    prompt: String,
    parent_id: Option<Uuid>,
    deleted: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<ImageRow> for GenerationRecord {
    type Error = DomainError;

    fn try_from(row: ImageRow) -> Result<Self, Self::Error> {
        Ok(GenerationRecord {
            id: GenerationId::from_uuid(row.id),
            user_id: UserId::new(row.user_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
            })?,
            original_path: row.original_path,
            result_path: row.result_path,
            prompt: row.prompt,
            parent_id: row.parent_id.map(GenerationId::from_uuid),
            deleted: row.deleted,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

fn db_error(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::database(format!("Failed to {}: {}", action, e))
}

#[async_trait]
impl GenerationRepository for PostgresGenerationRepository {
    async fn insert(&self, record: &GenerationRecord) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO images (
                id, user_id, original_path, result_path, prompt, parent_id, deleted, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.user_id.as_str())
        .bind(&record.original_path)
        .bind(&record.result_path)
        .bind(&record.prompt)
        .bind(record.parent_id.map(|p| *p.as_uuid()))
        .bind(record.deleted)
        .bind(record.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("insert generation", e))?;

        Ok(())
    }

    async fn find_by_id(&self, id: &GenerationId) -> Result<Option<GenerationRecord>, DomainError> {
        let row: Option<ImageRow> =
            sqlx::query_as(&format!("SELECT {} FROM images WHERE id = $1", IMAGE_COLUMNS))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("fetch generation", e))?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<GenerationRecord>, DomainError> {
        let rows: Vec<ImageRow> = sqlx::query_as(&format!(
            "SELECT {} FROM images WHERE user_id = $1 AND deleted = FALSE ORDER BY created_at DESC",
            IMAGE_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list generations", e))?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn mark_deleted(&self, id: &GenerationId) -> Result<(), DomainError> {
        let result = sqlx::query("UPDATE images SET deleted = TRUE WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete generation", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::GenerationNotFound,
                format!("Generation {} not found", id),
            ));
        }
        Ok(())
    }
}
