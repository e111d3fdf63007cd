//! User repository: identity rows and token balances.
//!
//! Balance columns are only ever mutated with in-database increments
//! (`SET x = x + $n`), never read-modify-write, so concurrent purchases
//! and debits stay additive.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use botsmith_core::UserId;

use super::{RepositoryError, conflict_on_unique};

/// A user row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Internal ID.
    pub id: UserId,
    /// External auth subject id (identity provider's).
    pub auth_subject: String,
    /// Primary linked social account, if any.
    pub primary_account: Option<String>,
    /// Free-tier allowance applied on reset.
    pub free_allowance: i32,
    /// Free tokens remaining this cycle.
    pub free_remaining: i32,
    /// Purchased tokens remaining.
    pub purchased_remaining: i32,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

const USER_COLUMNS: &str = "id, auth_subject, primary_account, free_allowance, \
     free_remaining, purchased_remaining, created_at";

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by internal ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Get a user by their external auth subject id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_auth_subject(
        &self,
        auth_subject: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE auth_subject = $1"
        ))
        .bind(auth_subject)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Create a user with the given free allowance.
    ///
    /// The free balance starts at the allowance; the purchased balance at zero.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the auth subject already exists.
    pub async fn create(
        &self,
        auth_subject: &str,
        free_allowance: i32,
    ) -> Result<User, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (auth_subject, free_allowance, free_remaining, purchased_remaining)
             VALUES ($1, $2, $2, 0)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(auth_subject)
        .bind(free_allowance)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "user"))?;

        Ok(user)
    }

    /// List all users (admin view), newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(users)
    }

    /// Set the primary linked account. At most one primary account is kept
    /// per user because it is a single column, not a flag on a linked-account
    /// list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn set_primary_account(
        &self,
        id: UserId,
        account: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE users SET primary_account = $2 WHERE id = $1")
            .bind(id)
            .bind(account)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Atomically credit purchased tokens inside an open transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn credit_purchased_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: UserId,
        tokens: i32,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET purchased_remaining = purchased_remaining + $2 WHERE id = $1",
        )
        .bind(id)
        .bind(tokens)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Atomically debit tokens inside an open transaction, free balance
    /// first, then purchased.
    ///
    /// All column references in the SET clause read the pre-update row, so
    /// the split between free and purchased is computed and applied in one
    /// statement. The WHERE guard refuses debits the combined balance
    /// cannot cover, keeping both columns non-negative.
    ///
    /// Returns `true` if the debit was applied, `false` if it matched no
    /// row (insufficient balance or no such user; callers distinguish the
    /// two with a follow-up read after rolling back).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn debit_tokens_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: UserId,
        tokens: i32,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET
                 free_remaining = free_remaining - LEAST(free_remaining, $2),
                 purchased_remaining = purchased_remaining
                     - ($2 - LEAST(free_remaining, $2))
             WHERE id = $1 AND free_remaining + purchased_remaining >= $2",
        )
        .bind(id)
        .bind(tokens)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Reset one user's free balance to their allowance. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn reset_free_tokens(&self, id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE users SET free_remaining = free_allowance WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// List all user IDs, for the batch coupon reset.
    ///
    /// The batch job iterates these one by one so a single failed update
    /// cannot roll back or block the rest.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_ids(&self) -> Result<Vec<UserId>, RepositoryError> {
        let ids = sqlx::query_scalar::<_, UserId>("SELECT id FROM users ORDER BY id")
            .fetch_all(self.pool)
            .await?;

        Ok(ids)
    }
}
