//! Public plan catalog endpoints.

use axum::{Json, extract::{Path, State}};
use serde::Serialize;
use serde_json::json;

use botsmith_core::{CurrencyCode, Money};

use crate::db::plans::{Plan, PlanRepository};
use crate::error::AppError;
use crate::state::AppState;

/// A catalog entry as served to pricing pages.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanView {
    product_id: String,
    name: String,
    price: Money,
    billing_period: String,
}

impl From<Plan> for PlanView {
    fn from(plan: Plan) -> Self {
        // Unknown codes in reference data fall back to USD rather than
        // failing the whole listing.
        let currency = plan.currency.parse().unwrap_or(CurrencyCode::USD);
        Self {
            product_id: plan.product_id,
            name: plan.name,
            price: Money::new(plan.price, currency),
            billing_period: plan.billing_period,
        }
    }
}

/// GET /plans - the full catalog.
pub async fn list(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let plans = PlanRepository::new(state.pool()).list().await?;
    let data: Vec<PlanView> = plans.into_iter().map(PlanView::from).collect();
    Ok(Json(json!({ "success": true, "data": data })))
}

/// GET /plans/{product_id} - one catalog entry.
pub async fn show(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let plan = PlanRepository::new(state.pool())
        .get_by_product_id(&product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("plan {product_id}")))?;

    Ok(Json(json!({ "success": true, "data": PlanView::from(plan) })))
}
