//! Lead-capture endpoint.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::json;

use botsmith_core::Email;

use crate::db::appointments::{AppointmentRepository, NewAppointment};
use crate::error::AppError;
use crate::state::AppState;

/// Incoming lead, all contact fields required except the address.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
    pub subject: String,
    pub message: String,
}

/// POST /appointments - capture a lead.
pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if request.name.trim().is_empty()
        || request.phone.trim().is_empty()
        || request.subject.trim().is_empty()
        || request.message.trim().is_empty()
    {
        return Err(AppError::InvalidArgument(
            "Missing required fields".to_string(),
        ));
    }

    // Stored as text, but still has to look like an email.
    let email = Email::parse(&request.email)
        .map_err(|e| AppError::InvalidArgument(format!("invalid email: {e}")))?;

    let appointment = AppointmentRepository::new(state.pool())
        .create(NewAppointment {
            name: request.name.trim(),
            email: email.as_str(),
            phone: request.phone.trim(),
            address: request.address.as_deref(),
            subject: request.subject.trim(),
            message: request.message.trim(),
        })
        .await?;

    Ok(Json(json!({ "success": true, "data": appointment })))
}
