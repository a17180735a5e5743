//! PostgreSQL implementation of LedgerStore.
//!
//! Every billing mutation is a single `UPDATE ... RETURNING` statement, so the
//! balance change and the status change commit together and concurrent
//! callers never lose an update. Generation debits also claim a row in
//! `generation_debits` inside the same transaction, which makes them
//! idempotent per job.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::billing::{BillingState, NewAccount, ProfileDetails, SubscriptionStatus, UserAccount};
use crate::domain::foundation::{DomainError, ErrorCode, JobId, Timestamp, UserId};
use crate::ports::{CreditDelta, LedgerStore};

const PROFILE_COLUMNS: &str = "id, email, first_name, last_name, display_name, avatar_url, \
     subscription_status, credits_remaining, max_generations, last_login_at, created_at, updated_at";

pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_or_missing(
        &self,
        user_id: &UserId,
        query: sqlx::query::QueryAs<'_, sqlx::Postgres, ProfileRow, sqlx::postgres::PgArguments>,
        action: &str,
    ) -> Result<UserAccount, DomainError> {
        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error(action, e))?;
        match row {
            Some(row) => row.try_into(),
            None => Err(not_found(user_id)),
        }
    }
}

/// Database row representation of a profile.
#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    id: String,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    display_name: Option<String>,
    avatar_url: Option<String>,
    subscription_status: String,
    credits_remaining: i32,
    max_generations: i32,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for UserAccount {
    type Error = DomainError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let corrupt = |field: &str, detail: String| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid {}: {}", field, detail))
        };

        Ok(UserAccount {
            id: UserId::new(row.id).map_err(|e| corrupt("id", e.to_string()))?,
            profile: ProfileDetails {
                email: row.email,
                first_name: row.first_name,
                last_name: row.last_name,
                display_name: row.display_name,
                avatar_url: row.avatar_url,
            },
            subscription_status: row
                .subscription_status
                .parse::<SubscriptionStatus>()
                .map_err(|e| corrupt("subscription_status", e.to_string()))?,
            credits_remaining: u32::try_from(row.credits_remaining)
                .map_err(|e| corrupt("credits_remaining", e.to_string()))?,
            max_generations: u32::try_from(row.max_generations)
                .map_err(|e| corrupt("max_generations", e.to_string()))?,
            last_login_at: row.last_login_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn db_error(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::database(format!("Failed to {}: {}", action, e))
}

fn not_found(user_id: &UserId) -> DomainError {
    DomainError::new(ErrorCode::AccountNotFound, format!("No account for {}", user_id))
}

/// Clamps a balance into the INTEGER column range.
fn to_db_int(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    async fn get_account(&self, user_id: &UserId) -> Result<Option<UserAccount>, DomainError> {
        let row: Option<ProfileRow> =
            sqlx::query_as(&format!("SELECT {} FROM profiles WHERE id = $1", PROFILE_COLUMNS))
                .bind(user_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("fetch account", e))?;

        row.map(TryInto::try_into).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, DomainError> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {} FROM profiles WHERE LOWER(email) = LOWER($1) ORDER BY created_at LIMIT 1",
            PROFILE_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find account by email", e))?;

        row.map(TryInto::try_into).transpose()
    }

    async fn create_account(&self, account: NewAccount) -> Result<UserAccount, DomainError> {
        let row: ProfileRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO profiles (
                id, email, first_name, last_name, display_name, avatar_url,
                subscription_status, credits_remaining, max_generations
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        ))
        .bind(account.id.as_str())
        .bind(&account.profile.email)
        .bind(&account.profile.first_name)
        .bind(&account.profile.last_name)
        .bind(&account.profile.display_name)
        .bind(&account.profile.avatar_url)
        .bind(account.billing.subscription_status.as_str())
        .bind(to_db_int(account.billing.credits_remaining))
        .bind(to_db_int(account.billing.max_generations))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("profiles_pkey") {
                    return DomainError::new(
                        ErrorCode::AccountExists,
                        format!("Account {} already exists", account.id),
                    );
                }
            }
            db_error("create account", e)
        })?;

        row.try_into()
    }

    async fn update_profile(
        &self,
        user_id: &UserId,
        details: &ProfileDetails,
    ) -> Result<UserAccount, DomainError> {
        let sql = format!(
            r#"
            UPDATE profiles SET
                email = COALESCE($2, email),
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                display_name = COALESCE($5, display_name),
                avatar_url = COALESCE($6, avatar_url),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        );
        let query = sqlx::query_as(&sql)
            .bind(user_id.as_str())
            .bind(&details.email)
            .bind(&details.first_name)
            .bind(&details.last_name)
            .bind(&details.display_name)
            .bind(&details.avatar_url);

        self.fetch_one_or_missing(user_id, query, "update profile").await
    }

    async fn touch_login(&self, user_id: &UserId, at: Timestamp) -> Result<UserAccount, DomainError> {
        let sql = format!(
            "UPDATE profiles SET last_login_at = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            PROFILE_COLUMNS
        );
        let query = sqlx::query_as(&sql)
            .bind(user_id.as_str())
            .bind(at.as_datetime());

        self.fetch_one_or_missing(user_id, query, "record login").await
    }

    async fn apply_credit_delta(
        &self,
        user_id: &UserId,
        delta: CreditDelta,
    ) -> Result<UserAccount, DomainError> {
        let sql = format!(
            r#"
            UPDATE profiles SET
                credits_remaining = LEAST(credits_remaining::BIGINT + $2, 2147483647)::INTEGER,
                subscription_status = COALESCE($3, subscription_status),
                max_generations = COALESCE($4, max_generations),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        );
        let query = sqlx::query_as(&sql)
            .bind(user_id.as_str())
            .bind(i64::from(delta.amount))
            .bind(delta.new_status.map(|s| s.as_str()))
            .bind(delta.max_generations.map(to_db_int));

        self.fetch_one_or_missing(user_id, query, "apply credit delta").await
    }

    async fn set_billing(
        &self,
        user_id: &UserId,
        billing: BillingState,
    ) -> Result<UserAccount, DomainError> {
        let sql = format!(
            r#"
            UPDATE profiles SET
                subscription_status = $2,
                credits_remaining = $3,
                max_generations = $4,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        );
        let query = sqlx::query_as(&sql)
            .bind(user_id.as_str())
            .bind(billing.subscription_status.as_str())
            .bind(to_db_int(billing.credits_remaining))
            .bind(to_db_int(billing.max_generations));

        self.fetch_one_or_missing(user_id, query, "set billing").await
    }

    async fn debit_one(&self, user_id: &UserId, job_id: &JobId) -> Result<UserAccount, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin debit", e))?;

        let claimed = sqlx::query(
            r#"
            INSERT INTO generation_debits (job_id, user_id, created_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (job_id) DO NOTHING
            "#,
        )
        .bind(job_id.as_uuid())
        .bind(user_id.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("claim debit", e))?
        .rows_affected();

        if claimed == 0 {
            tx.rollback().await.map_err(|e| db_error("debit credit", e))?;
            tracing::debug!(user_id = %user_id, job_id = %job_id, "Job already debited");
            return self.get_account(user_id).await?.ok_or_else(|| not_found(user_id));
        }

        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            r#"
            UPDATE profiles SET
                credits_remaining = credits_remaining - 1,
                updated_at = NOW()
            WHERE id = $1 AND credits_remaining > 0
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("debit credit", e))?;

        if let Some(row) = row {
            tx.commit().await.map_err(|e| db_error("commit debit", e))?;
            return row.try_into();
        }
        tx.rollback().await.map_err(|e| db_error("debit credit", e))?;

        // Zero rows: either the balance is exhausted or the account is missing.
        let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM profiles WHERE id = $1")
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("debit credit", e))?;

        match exists {
            Some(_) => Err(DomainError::new(
                ErrorCode::InsufficientCredits,
                format!("{} has no credits remaining", user_id),
            )),
            None => Err(not_found(user_id)),
        }
    }
}
