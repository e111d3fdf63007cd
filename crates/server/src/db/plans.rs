//! Plan catalog repository.
//!
//! Plans are immutable reference data seeded out-of-band via the CLI;
//! the server only reads them.

use rust_decimal::Decimal;
use sqlx::PgPool;

use botsmith_core::PlanId;

use super::RepositoryError;

/// A plan row.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct Plan {
    /// Internal ID.
    pub id: PlanId,
    /// Product id (unique).
    pub product_id: String,
    /// External billing system's plan id.
    pub external_plan_id: String,
    /// Display name.
    pub name: String,
    /// Price amount in the currency's standard unit.
    pub price: Decimal,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Billing period, e.g. "monthly" or "yearly".
    pub billing_period: String,
}

const PLAN_COLUMNS: &str = "id, product_id, external_plan_id, name, price, currency, billing_period";

/// Repository for plan catalog operations.
pub struct PlanRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PlanRepository<'a> {
    /// Create a new plan repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a plan by product id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_product_id(
        &self,
        product_id: &str,
    ) -> Result<Option<Plan>, RepositoryError> {
        let plan = sqlx::query_as::<_, Plan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE product_id = $1"
        ))
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(plan)
    }

    /// List the full catalog.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Plan>, RepositoryError> {
        let plans =
            sqlx::query_as::<_, Plan>(&format!("SELECT {PLAN_COLUMNS} FROM plans ORDER BY id"))
                .fetch_all(self.pool)
                .await?;

        Ok(plans)
    }
}
