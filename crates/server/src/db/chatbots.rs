//! Chatbot repository: web and Instagram agents.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use botsmith_core::{ChatbotId, ChatbotKind, UserId};

use super::RepositoryError;

/// A chatbot row.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct Chatbot {
    /// Internal ID.
    pub id: ChatbotId,
    /// Owning user.
    pub owner_id: UserId,
    /// Product variant.
    pub kind: ChatbotKind,
    /// Display name.
    pub name: String,
    /// Configuration payload (prompt, appearance, triggers).
    pub config: serde_json::Value,
    /// When the chatbot was created.
    pub created_at: DateTime<Utc>,
}

const CHATBOT_COLUMNS: &str = "id, owner_id, kind, name, config, created_at";

/// Repository for chatbot operations.
pub struct ChatbotRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ChatbotRepository<'a> {
    /// Create a new chatbot repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a chatbot for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        owner_id: UserId,
        kind: ChatbotKind,
        name: &str,
        config: &serde_json::Value,
    ) -> Result<Chatbot, RepositoryError> {
        let row = sqlx::query_as::<_, Chatbot>(&format!(
            "INSERT INTO chatbots (owner_id, kind, name, config)
             VALUES ($1, $2, $3, $4)
             RETURNING {CHATBOT_COLUMNS}"
        ))
        .bind(owner_id)
        .bind(kind)
        .bind(name)
        .bind(config)
        .fetch_one(self.pool)
        .await?;

        Ok(row)
    }

    /// Get a chatbot by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ChatbotId) -> Result<Option<Chatbot>, RepositoryError> {
        let row = sqlx::query_as::<_, Chatbot>(&format!(
            "SELECT {CHATBOT_COLUMNS} FROM chatbots WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// List a user's chatbots of one kind, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_owner(
        &self,
        owner_id: UserId,
        kind: ChatbotKind,
    ) -> Result<Vec<Chatbot>, RepositoryError> {
        let rows = sqlx::query_as::<_, Chatbot>(&format!(
            "SELECT {CHATBOT_COLUMNS} FROM chatbots
             WHERE owner_id = $1 AND kind = $2
             ORDER BY created_at DESC"
        ))
        .bind(owner_id)
        .bind(kind)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Whether a chatbot exists and belongs to the given user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the chatbot doesn't exist.
    pub async fn is_owned_by(
        &self,
        id: ChatbotId,
        owner_id: UserId,
    ) -> Result<bool, RepositoryError> {
        let chatbot = self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)?;
        Ok(chatbot.owner_id == owner_id)
    }
}
