//! Plan catalog seeding.
//!
//! Plans are immutable reference data; this command inserts any missing
//! rows and leaves existing ones untouched (`ON CONFLICT DO NOTHING`).

use rust_decimal::Decimal;
use serde::Deserialize;

use super::{CommandError, connect};

/// One catalog entry.
#[derive(Debug, Deserialize)]
struct PlanSeed {
    product_id: String,
    external_plan_id: String,
    name: String,
    price: Decimal,
    #[serde(default = "default_currency")]
    currency: String,
    #[serde(default = "default_billing_period")]
    billing_period: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_billing_period() -> String {
    "monthly".to_string()
}

/// Seed the plan catalog from a JSON file, or the built-in defaults.
///
/// # Errors
///
/// Returns `CommandError` if the file cannot be parsed or an insert fails.
pub async fn plans(file: Option<&str>) -> Result<(), CommandError> {
    let seeds = match file {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| CommandError::SeedData(format!("{path}: {e}")))?;
            serde_json::from_str::<Vec<PlanSeed>>(&raw)
                .map_err(|e| CommandError::SeedData(format!("{path}: {e}")))?
        }
        None => default_catalog(),
    };

    let pool = connect().await?;

    let mut inserted = 0u32;
    for seed in &seeds {
        let result = sqlx::query(
            "INSERT INTO plans (product_id, external_plan_id, name, price, currency, billing_period)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (product_id) DO NOTHING",
        )
        .bind(&seed.product_id)
        .bind(&seed.external_plan_id)
        .bind(&seed.name)
        .bind(seed.price)
        .bind(&seed.currency)
        .bind(&seed.billing_period)
        .execute(&pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
            tracing::info!(product_id = %seed.product_id, "plan seeded");
        } else {
            tracing::debug!(product_id = %seed.product_id, "plan already present");
        }
    }

    tracing::info!(inserted, total = seeds.len(), "plan catalog seeded");
    Ok(())
}

/// The launch catalog, used when no file is given.
fn default_catalog() -> Vec<PlanSeed> {
    vec![
        PlanSeed {
            product_id: "web-basic".to_string(),
            external_plan_id: "plan_web_basic_monthly".to_string(),
            name: "Web Chatbot Basic".to_string(),
            price: Decimal::new(1900, 2),
            currency: default_currency(),
            billing_period: default_billing_period(),
        },
        PlanSeed {
            product_id: "web-pro".to_string(),
            external_plan_id: "plan_web_pro_monthly".to_string(),
            name: "Web Chatbot Pro".to_string(),
            price: Decimal::new(4900, 2),
            currency: default_currency(),
            billing_period: default_billing_period(),
        },
        PlanSeed {
            product_id: "insta-basic".to_string(),
            external_plan_id: "plan_insta_basic_monthly".to_string(),
            name: "Instagram Agent Basic".to_string(),
            price: Decimal::new(2900, 2),
            currency: default_currency(),
            billing_period: default_billing_period(),
        },
        PlanSeed {
            product_id: "insta-pro".to_string(),
            external_plan_id: "plan_insta_pro_monthly".to_string(),
            name: "Instagram Agent Pro".to_string(),
            price: Decimal::new(5900, 2),
            currency: default_currency(),
            billing_period: default_billing_period(),
        },
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_has_unique_product_ids() {
        let catalog = default_catalog();
        let mut ids: Vec<&str> = catalog.iter().map(|p| p.product_id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), catalog.len());
    }

    #[test]
    fn seed_file_format_parses() {
        let raw = r#"[
            { "product_id": "p1", "external_plan_id": "e1", "name": "P1", "price": "9.99" }
        ]"#;
        let seeds: Vec<PlanSeed> = serde_json::from_str(raw).unwrap();
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].currency, "USD");
        assert_eq!(seeds[0].billing_period, "monthly");
    }
}
