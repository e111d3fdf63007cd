//! User provisioning command.

use botsmith_core::UserId;

use super::{CommandError, connect};

/// Create a user row for an identity-provider subject.
///
/// The free balance starts at the full allowance.
///
/// # Errors
///
/// Returns `CommandError` if the insert fails (including a duplicate
/// subject).
pub async fn create(subject: &str, allowance: i32) -> Result<(), CommandError> {
    let pool = connect().await?;

    let id: UserId = sqlx::query_scalar(
        "INSERT INTO users (auth_subject, free_allowance, free_remaining)
         VALUES ($1, $2, $2)
         RETURNING id",
    )
    .bind(subject)
    .bind(allowance)
    .fetch_one(&pool)
    .await?;

    tracing::info!(user_id = %id, subject, allowance, "user created");
    Ok(())
}
