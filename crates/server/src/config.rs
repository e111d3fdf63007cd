//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BOTSMITH_DATABASE_URL` - `PostgreSQL` connection string
//!   (falls back to `DATABASE_URL`)
//! - `BOTSMITH_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//! - `CRON_SECRET` - Shared secret authorizing scheduled triggers
//! - `BILLING_WEBHOOK_SECRET` - HMAC key for payment webhook signatures
//! - `COMPLETIONS_API_KEY` - External completions API key
//! - `OWNER_EMAILS` - Comma-separated owner allowlist for admin endpoints
//!
//! ## Optional
//! - `BOTSMITH_HOST` - Bind address (default: 127.0.0.1)
//! - `BOTSMITH_PORT` - Listen port (default: 3000)
//! - `BOTSMITH_BASE_URL` - Public URL (default: http://localhost:3000)
//! - `COMPLETIONS_API_URL` - Completions endpoint (default: OpenAI-compatible)
//! - `GRAPH_API_BASE` - Instagram Graph API base URL
//! - `INSTAGRAM_APP_SECRET` - Webhook signature verification key
//! - `FREE_TOKEN_ALLOWANCE` - Free-tier token allowance (default: 1000)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use botsmith_core::Email;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Shared secret for scheduled triggers (`/cron`, `/reset-window`)
    pub cron_secret: SecretString,
    /// HMAC key for billing webhook signatures
    pub billing_webhook_secret: SecretString,
    /// Owner allowlist for admin endpoints (normalized to lowercase)
    pub owner_emails: Vec<Email>,
    /// External completions API
    pub completions: CompletionsConfig,
    /// Instagram Graph API
    pub instagram: InstagramConfig,
    /// Free-tier token allowance applied on reset
    pub free_token_allowance: i32,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// External completions API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct CompletionsConfig {
    /// Completions endpoint URL
    pub api_url: String,
    /// API key (server-side only)
    pub api_key: SecretString,
}

impl std::fmt::Debug for CompletionsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionsConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Instagram Graph API configuration.
///
/// Implements `Debug` manually to redact the app secret.
#[derive(Clone)]
pub struct InstagramConfig {
    /// Graph API base URL
    pub graph_api_base: String,
    /// App secret used to verify webhook signatures, when configured
    pub app_secret: Option<SecretString>,
}

impl std::fmt::Debug for InstagramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstagramConfig")
            .field("graph_api_base", &self.graph_api_base)
            .field("app_secret", &self.app_secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("BOTSMITH_DATABASE_URL")?;
        let host = get_env_or_default("BOTSMITH_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("BOTSMITH_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("BOTSMITH_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("BOTSMITH_PORT".to_string(), e.to_string()))?;
        let base_url = get_env_or_default("BOTSMITH_BASE_URL", "http://localhost:3000");

        let session_secret = get_validated_secret("BOTSMITH_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "BOTSMITH_SESSION_SECRET")?;
        let cron_secret = get_validated_secret("CRON_SECRET")?;
        let billing_webhook_secret = get_validated_secret("BILLING_WEBHOOK_SECRET")?;

        let owner_emails = parse_owner_emails(&get_required_env("OWNER_EMAILS")?)?;

        let completions = CompletionsConfig {
            api_url: get_env_or_default(
                "COMPLETIONS_API_URL",
                "https://api.openai.com/v1/chat/completions",
            ),
            api_key: get_required_secret("COMPLETIONS_API_KEY")?,
        };

        let instagram = InstagramConfig {
            graph_api_base: get_env_or_default("GRAPH_API_BASE", "https://graph.facebook.com/v19.0"),
            app_secret: get_optional_env("INSTAGRAM_APP_SECRET").map(SecretString::from),
        };

        let free_token_allowance = get_env_or_default("FREE_TOKEN_ALLOWANCE", "1000")
            .parse::<i32>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("FREE_TOKEN_ALLOWANCE".to_string(), e.to_string())
            })?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            cron_secret,
            billing_webhook_secret,
            owner_emails,
            completions,
            instagram,
            free_token_allowance,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the given email is on the owner allowlist.
    ///
    /// Comparison is case-insensitive; allowlist entries are normalized at
    /// load time and the probe is normalized here.
    #[must_use]
    pub fn is_owner(&self, email: &str) -> bool {
        match Email::parse(email) {
            Ok(probe) => self.owner_emails.iter().any(|owner| *owner == probe),
            Err(_) => false,
        }
    }
}

/// Parse the comma-separated owner allowlist.
fn parse_owner_emails(raw: &str) -> Result<Vec<Email>, ConfigError> {
    let emails: Result<Vec<Email>, _> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Email::parse)
        .collect();

    let emails = emails
        .map_err(|e| ConfigError::InvalidEnvVar("OWNER_EMAILS".to_string(), e.to_string()))?;

    if emails.is_empty() {
        return Err(ConfigError::InvalidEnvVar(
            "OWNER_EMAILS".to_string(),
            "allowlist must contain at least one email".to_string(),
        ));
    }

    Ok(emails)
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real secrets like API keys have high entropy)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_config() -> ServerConfig {
        ServerConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            session_secret: SecretString::from("x".repeat(32)),
            cron_secret: SecretString::from("cron"),
            billing_webhook_secret: SecretString::from("hook"),
            owner_emails: vec![Email::parse("owner@botsmith.dev").unwrap()],
            completions: CompletionsConfig {
                api_url: "https://api.openai.com/v1/chat/completions".to_string(),
                api_key: SecretString::from("sk-test"),
            },
            instagram: InstagramConfig {
                graph_api_base: "https://graph.facebook.com/v19.0".to_string(),
                app_secret: None,
            },
            free_token_allowance: 1000,
            sentry_dsn: None,
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        // All same character = 0 entropy
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_high() {
        let entropy = shannon_entropy("aB3$xY9!mK2@nL5#");
        assert!(entropy > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InsecureSecret(_, _)
        ));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InsecureSecret(_, _)
        ));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_session_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_session_secret(&secret, "TEST_SESSION").is_err());
    }

    #[test]
    fn test_parse_owner_emails() {
        let emails = parse_owner_emails("Owner@Botsmith.dev, second@botsmith.dev").unwrap();
        assert_eq!(emails.len(), 2);
        assert_eq!(emails[0].as_str(), "owner@botsmith.dev");
    }

    #[test]
    fn test_parse_owner_emails_rejects_empty_list() {
        assert!(parse_owner_emails("  , ").is_err());
    }

    #[test]
    fn test_is_owner_case_insensitive() {
        let config = test_config();
        assert!(config.is_owner("owner@botsmith.dev"));
        assert!(config.is_owner("OWNER@botsmith.DEV"));
        assert!(!config.is_owner("intruder@botsmith.dev"));
        assert!(!config.is_owner("not-an-email"));
    }

    #[test]
    fn test_socket_addr() {
        let config = test_config();
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_completions_config_debug_redacts_key() {
        let config = test_config();
        let debug_output = format!("{:?}", config.completions);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("sk-test"));
    }
}
