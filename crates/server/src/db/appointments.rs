//! Appointment repository: write-once lead capture.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use botsmith_core::AppointmentId;

use super::RepositoryError;

/// An appointment row.
///
/// The email column is TEXT; shape validation happens at the route before
/// the insert.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct Appointment {
    /// Internal ID.
    pub id: AppointmentId,
    /// Contact name.
    pub name: String,
    /// Contact email address.
    pub email: String,
    /// Contact phone number.
    pub phone: String,
    /// Contact address.
    pub address: Option<String>,
    /// Subject line.
    pub subject: String,
    /// Free-form message.
    pub message: String,
    /// When the lead was captured.
    pub created_at: DateTime<Utc>,
}

/// Fields for creating an appointment.
pub struct NewAppointment<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
    pub address: Option<&'a str>,
    pub subject: &'a str,
    pub message: &'a str,
}

const APPOINTMENT_COLUMNS: &str = "id, name, email, phone, address, subject, message, created_at";

/// Repository for appointment operations.
pub struct AppointmentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AppointmentRepository<'a> {
    /// Create a new appointment repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Capture a lead. Appointments are write-once; there is no update path.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        appointment: NewAppointment<'_>,
    ) -> Result<Appointment, RepositoryError> {
        let row = sqlx::query_as::<_, Appointment>(&format!(
            "INSERT INTO appointments (name, email, phone, address, subject, message)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {APPOINTMENT_COLUMNS}"
        ))
        .bind(appointment.name)
        .bind(appointment.email)
        .bind(appointment.phone)
        .bind(appointment.address)
        .bind(appointment.subject)
        .bind(appointment.message)
        .fetch_one(self.pool)
        .await?;

        Ok(row)
    }

    /// List all appointments, newest first (admin view).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Appointment>, RepositoryError> {
        let rows = sqlx::query_as::<_, Appointment>(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}
