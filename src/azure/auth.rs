//! Azure Authentication
//!
//! Obtains ARM access tokens from the Azure CLI (`az account get-access-token`)
//! and caches them in-process with an expiry buffer.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Token expiry buffer - refresh tokens this much before they actually expire
/// This prevents using tokens that are about to expire during a request
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Default token TTL if we can't determine expiry (conservative: 30 minutes;
/// az tokens last an hour)
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

/// Where tokens come from
#[derive(Clone)]
enum TokenSource {
    /// The `az` CLI on PATH
    Cli,
    /// A fixed token, for tests and CI
    Static(String),
}

/// Azure credentials holder with token caching
#[derive(Clone)]
pub struct AzureCredentials {
    source: TokenSource,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    /// When this token expires (with buffer applied)
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

impl AzureCredentials {
    /// Credentials backed by the Azure CLI login. Probes for a token once so
    /// a missing `az login` fails at startup, not mid-session.
    pub async fn new() -> Result<Self> {
        let credentials = Self {
            source: TokenSource::Cli,
            token_cache: Arc::new(RwLock::new(None)),
        };
        credentials
            .get_token()
            .await
            .context("Failed to obtain an Azure access token. Run 'az login'")?;
        Ok(credentials)
    }

    /// Credentials with a fixed token; never shells out
    pub fn with_static_token(token: impl Into<String>) -> Self {
        Self {
            source: TokenSource::Static(token.into()),
            token_cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Get an access token for ARM calls, from cache when still valid
    pub async fn get_token(&self) -> Result<String> {
        if let TokenSource::Static(token) = &self.source {
            return Ok(token.clone());
        }

        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token expired, fetching new token");
            }
        }

        let token = fetch_cli_token().await?;

        // az reports expiry in local time with varying formats across
        // versions; a conservative fixed TTL avoids parsing all of them
        let expires_at = Instant::now() + DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER;

        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(CachedToken {
                token: token.clone(),
                expires_at,
            });
        }

        tracing::debug!(
            "New token cached, expires in ~{} minutes",
            (DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER).as_secs() / 60
        );

        Ok(token)
    }

    /// Drop the cached token so the next call fetches a fresh one
    #[allow(dead_code)]
    pub async fn invalidate(&self) {
        let mut cache = self.token_cache.write().await;
        *cache = None;
    }
}

/// Shell out to `az account get-access-token` and extract the token
async fn fetch_cli_token() -> Result<String> {
    let output = tokio::process::Command::new("az")
        .args(["account", "get-access-token", "--output", "json"])
        .output()
        .await
        .context("Failed to run 'az'. Is the Azure CLI installed?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!(
            "az account get-access-token failed: {}",
            stderr.lines().next().unwrap_or("unknown error")
        );
    }

    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).context("Failed to parse az token output")?;

    parsed
        .get("accessToken")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .context("az token output missing accessToken")
}
