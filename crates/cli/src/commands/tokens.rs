//! Manual token maintenance.

use super::{CommandError, connect};

/// Reset every user's free balance to their allowance.
///
/// Same effect as the scheduled cron job; useful when the schedule missed
/// a cycle.
///
/// # Errors
///
/// Returns `CommandError` if the update fails.
pub async fn reset_free() -> Result<(), CommandError> {
    let pool = connect().await?;

    let result = sqlx::query("UPDATE users SET free_remaining = free_allowance")
        .execute(&pool)
        .await?;

    tracing::info!(users = result.rows_affected(), "free balances reset");
    Ok(())
}
