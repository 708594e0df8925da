//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHELFWISE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `SHOPIFY_API_KEY` - Shopify app API key
//! - `SHOPIFY_API_SECRET` - Shopify app API secret (verifies webhooks and session tokens)
//! - `SMTP_HOST` - SMTP server hostname
//! - `SMTP_USERNAME` - SMTP authentication username
//! - `SMTP_PASSWORD` - SMTP authentication password
//! - `SMTP_FROM` - Email sender address
//!
//! ## Optional
//! - `SHELFWISE_HOST` - Bind address (default: 127.0.0.1)
//! - `SHELFWISE_PORT` - Listen port (default: 3001)
//! - `SHOPIFY_API_VERSION` - API version (default: 2025-01)
//! - `SHOPIFY_ADMIN_BASE_URL` - Send every Admin API call here instead of `https://<shop>`
//! - `SMTP_PORT` - SMTP port (default: 587)
//! - `EXTENSION_ORIGIN` - Origin allowed to call the wishlist API
//! - `SENTRY_DSN` - Sentry error tracking DSN
//!
//! ## Optional (automation)
//! - `AUTOMATION_CRON` - Compliance schedule (default: `0 0 * * * *`, hourly)
//! - `AUTOMATION_BYPASS_TAGS` - Comma-separated tags never re-activated
//! - `RESTOCK_EMAIL_COOLDOWN_HOURS` - Restock email dedupe window (default: 24)
//!
//! ## Optional (scrapers)
//! - `RETAILER_BASE_URL` - Base URL used to absolutize retailer links
//! - `SCRAPER_TIMEOUT_SECS` - Per-request timeout (default: 20)
//! - `SCRAPER_MAX_RETRIES` - Retries for transient failures (default: 3)
//! - `SCRAPER_BACKOFF_BASE_SECS` - Backoff base (default: 1)
//! - `PSA_BROWSER_ENDPOINT` - Headless browser service base URL
//! - `PSA_BROWSER_TOKEN` - Headless browser service token
//! - `PSA_BYPASS_COOKIE` - Bot-protection cookie sent with PSA lookups
//!
//! ## Optional (jobs)
//! - `JOB_CONCURRENCY` - Concurrent jobs (default: 1)
//! - `JOB_MAX_RETRIES` - Retries for import jobs (default: 5)
//! - `JOB_BACKOFF_BASE_SECS` - Retry backoff base (default: 2)
//! - `JOB_MAX_DURATION_SECS` - Per-attempt timeout (default: 300)
//!
//! ## Optional (TLS)
//! - `SHELFWISE_TLS_CERT` - PEM-encoded certificate chain
//! - `SHELFWISE_TLS_KEY` - PEM-encoded private key

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_API_VERSION: &str = "2025-01";
const DEFAULT_AUTOMATION_CRON: &str = "0 0 * * * *";

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

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Shopify app configuration
    pub shopify: ShopifyAppConfig,
    /// Email configuration
    pub email: EmailConfig,
    /// Origin allowed to call the wishlist extension API
    pub extension_origin: Option<String>,
    /// Inventory automation settings
    pub automation: AutomationConfig,
    /// Retailer and PSA scraper settings
    pub scraper: ScraperConfig,
    /// Background job queue settings
    pub jobs: JobConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
    /// TLS configuration for HTTPS (optional)
    pub tls: Option<TlsConfig>,
}

/// Shopify app credentials.
///
/// Implements `Debug` manually to redact the API secret.
#[derive(Clone)]
pub struct ShopifyAppConfig {
    /// App API key (client id)
    pub api_key: String,
    /// App API secret; signs webhooks and session tokens
    pub api_secret: SecretString,
    /// Admin API version (e.g., 2025-01)
    pub api_version: String,
    /// Admin API host override for every shop (a local mock in tests)
    pub admin_base_url: Option<String>,
}

impl std::fmt::Debug for ShopifyAppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyAppConfig")
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .field("admin_base_url", &self.admin_base_url)
            .finish()
    }
}

/// Email (SMTP) configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP authentication username
    pub smtp_username: String,
    /// SMTP authentication password
    pub smtp_password: SecretString,
    /// Email sender address (From header)
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// Inventory automation configuration.
#[derive(Debug, Clone)]
pub struct AutomationConfig {
    /// Six-field cron expression for the compliance sweep
    pub cron: String,
    /// Products carrying any of these tags stay in Draft when restocked
    pub bypass_tags: Vec<String>,
    /// Minimum time between restock emails for one product
    pub restock_email_cooldown: Duration,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            cron: DEFAULT_AUTOMATION_CRON.to_string(),
            bypass_tags: Vec::new(),
            restock_email_cooldown: Duration::from_secs(24 * 3600),
        }
    }
}

/// Scraper configuration.
///
/// Implements `Debug` manually to redact the PSA browser token and cookie.
#[derive(Clone)]
pub struct ScraperConfig {
    /// Base URL used to absolutize relative product links
    pub retailer_base_url: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retries for transient failures
    pub max_retries: u32,
    /// Backoff base in seconds
    pub backoff_base_secs: u64,
    /// Headless browser service settings (PSA lookups disabled when `None`)
    pub psa: Option<PsaBrowserConfig>,
}

impl std::fmt::Debug for ScraperConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScraperConfig")
            .field("retailer_base_url", &self.retailer_base_url)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("backoff_base_secs", &self.backoff_base_secs)
            .field("psa", &self.psa.as_ref().map(|p| &p.endpoint))
            .finish()
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            retailer_base_url: None,
            timeout: Duration::from_secs(20),
            max_retries: 3,
            backoff_base_secs: 1,
            psa: None,
        }
    }
}

/// Headless browser service used for PSA certificate pages.
#[derive(Clone)]
pub struct PsaBrowserConfig {
    /// Service base URL (the `/content` path is appended)
    pub endpoint: String,
    /// Service API token
    pub token: SecretString,
    /// Bot-protection cookie (`name=value`) forwarded to psacard.com
    pub bypass_cookie: Option<SecretString>,
}

impl std::fmt::Debug for PsaBrowserConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PsaBrowserConfig")
            .field("endpoint", &self.endpoint)
            .field("token", &"[REDACTED]")
            .field(
                "bypass_cookie",
                &self.bypass_cookie.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Background job queue configuration.
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Jobs executed at once
    pub concurrency: usize,
    /// Retries for retryable (import) jobs
    pub max_retries: u32,
    /// Backoff base in seconds; attempt `n` waits `base * 2^n`
    pub backoff_base_secs: u64,
    /// Upper bound on a single attempt
    pub max_duration: Duration,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            max_retries: 5,
            backoff_base_secs: 2,
            max_duration: Duration::from_secs(300),
        }
    }
}

/// TLS configuration for HTTPS.
#[derive(Clone)]
pub struct TlsConfig {
    /// PEM-encoded certificate chain
    pub cert_pem: String,
    /// PEM-encoded private key
    pub key_pem: SecretString,
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("cert_pem", &"[CERTIFICATE]")
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

impl TlsConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let cert_pem = get_optional_env("SHELFWISE_TLS_CERT");
        let key_pem = get_optional_env("SHELFWISE_TLS_KEY");

        match (cert_pem, key_pem) {
            (Some(cert), Some(key)) => Ok(Some(Self {
                cert_pem: cert,
                key_pem: SecretString::from(key),
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "SHELFWISE_TLS_*".to_string(),
                "Both SHELFWISE_TLS_CERT and SHELFWISE_TLS_KEY must be set together".to_string(),
            )),
        }
    }
}

impl AppConfig {
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

        let database_url = get_database_url("SHELFWISE_DATABASE_URL")?;
        let host = get_parsed_env::<IpAddr>("SHELFWISE_HOST", "127.0.0.1")?;
        let port = get_parsed_env::<u16>("SHELFWISE_PORT", "3001")?;

        let shopify = ShopifyAppConfig::from_env()?;
        let email = EmailConfig::from_env()?;
        let extension_origin = get_optional_env("EXTENSION_ORIGIN");
        let automation = AutomationConfig::from_env()?;
        let scraper = ScraperConfig::from_env()?;
        let jobs = JobConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let tls = TlsConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            shopify,
            email,
            extension_origin,
            automation,
            scraper,
            jobs,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
            tls,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl ShopifyAppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: get_required_env("SHOPIFY_API_KEY")?,
            api_secret: get_validated_secret("SHOPIFY_API_SECRET")?,
            api_version: get_env_or_default("SHOPIFY_API_VERSION", DEFAULT_API_VERSION),
            admin_base_url: get_optional_env("SHOPIFY_ADMIN_BASE_URL"),
        })
    }
}

impl EmailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            smtp_host: get_required_env("SMTP_HOST")?,
            smtp_port: get_parsed_env("SMTP_PORT", "587")?,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_validated_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("SMTP_FROM")?,
        })
    }
}

impl AutomationConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let cooldown_hours: u64 = get_parsed_env("RESTOCK_EMAIL_COOLDOWN_HOURS", "24")?;

        Ok(Self {
            cron: get_env_or_default("AUTOMATION_CRON", DEFAULT_AUTOMATION_CRON),
            bypass_tags: get_optional_env("AUTOMATION_BYPASS_TAGS")
                .map(|raw| parse_tag_list(&raw))
                .unwrap_or_default(),
            restock_email_cooldown: Duration::from_secs(cooldown_hours * 3600),
        })
    }
}

impl ScraperConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            retailer_base_url: get_optional_env("RETAILER_BASE_URL"),
            timeout: Duration::from_secs(get_parsed_env("SCRAPER_TIMEOUT_SECS", "20")?),
            max_retries: get_parsed_env("SCRAPER_MAX_RETRIES", "3")?,
            backoff_base_secs: get_parsed_env("SCRAPER_BACKOFF_BASE_SECS", "1")?,
            psa: PsaBrowserConfig::from_env()?,
        })
    }
}

impl PsaBrowserConfig {
    /// Returns `None` when no browser endpoint is configured (PSA import
    /// disabled). Endpoint and token must be set together.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let endpoint = get_optional_env("PSA_BROWSER_ENDPOINT");
        let token = get_optional_env("PSA_BROWSER_TOKEN");

        match (endpoint, token) {
            (Some(endpoint), Some(token)) => {
                if let Err(e) = validate_secret_strength(&token, "PSA_BROWSER_TOKEN") {
                    tracing::warn!("PSA_BROWSER_TOKEN validation warning: {e}");
                }
                Ok(Some(Self {
                    endpoint,
                    token: SecretString::from(token),
                    bypass_cookie: get_optional_env("PSA_BYPASS_COOKIE").map(SecretString::from),
                }))
            }
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "PSA_BROWSER_*".to_string(),
                "Both PSA_BROWSER_ENDPOINT and PSA_BROWSER_TOKEN must be set together".to_string(),
            )),
        }
    }
}

impl JobConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let concurrency: usize = get_parsed_env("JOB_CONCURRENCY", "1")?;
        if concurrency == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "JOB_CONCURRENCY".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            concurrency,
            max_retries: get_parsed_env("JOB_MAX_RETRIES", "5")?,
            backoff_base_secs: get_parsed_env("JOB_BACKOFF_BASE_SECS", "2")?,
            max_duration: Duration::from_secs(get_parsed_env("JOB_MAX_DURATION_SECS", "300")?),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn get_parsed_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Split a comma-separated tag list, dropping blanks.
fn parse_tag_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(ToString::to_string)
        .collect()
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

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

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

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-secret-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_tag_list() {
        assert_eq!(
            parse_tag_list(" preorder, ,hold ,"),
            vec!["preorder".to_string(), "hold".to_string()]
        );
        assert!(parse_tag_list("").is_empty());
    }

    #[test]
    fn test_defaults() {
        let jobs = JobConfig::default();
        assert_eq!(jobs.concurrency, 1);
        assert_eq!(jobs.max_retries, 5);
        assert_eq!(jobs.max_duration, Duration::from_secs(300));

        let automation = AutomationConfig::default();
        assert_eq!(automation.cron, "0 0 * * * *");
        assert_eq!(automation.restock_email_cooldown, Duration::from_secs(86_400));
    }

    #[test]
    fn test_shopify_config_debug_redacts_secret() {
        let config = ShopifyAppConfig {
            api_key: "key_123".to_string(),
            api_secret: SecretString::from("shpss_super_secret_value"),
            api_version: "2025-01".to_string(),
            admin_base_url: None,
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("key_123"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("shpss_super_secret_value"));
    }

    #[test]
    fn test_psa_config_debug_redacts_cookie() {
        let config = PsaBrowserConfig {
            endpoint: "https://browser.example.net".to_string(),
            token: SecretString::from("tok_abcdef"),
            bypass_cookie: Some(SecretString::from("cf_clearance=abc123")),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("browser.example.net"));
        assert!(!debug_output.contains("tok_abcdef"));
        assert!(!debug_output.contains("cf_clearance"));
    }
}
