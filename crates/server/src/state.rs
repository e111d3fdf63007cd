//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::services::completions::{CompletionsClient, CompletionsError};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the database pool and configuration. The pool is
/// created once at startup and injected here; no component holds its own
/// global connection handle.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    completions: CompletionsClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the completions HTTP client cannot be built.
    pub fn new(config: ServerConfig, pool: PgPool) -> Result<Self, CompletionsError> {
        let completions = CompletionsClient::new(&config.completions)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                completions,
            }),
        })
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the completions API client.
    #[must_use]
    pub fn completions(&self) -> &CompletionsClient {
        &self.inner.completions
    }
}
