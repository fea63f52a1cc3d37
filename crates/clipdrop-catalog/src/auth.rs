//! Access tokens for the Firestore REST API.
//!
//! [`TokenCache`] wraps a `gcp_auth` provider with:
//! - Refresh margin to avoid token expiry during requests
//! - Single-flight refresh behind a write lock
//! - Fallback to the current token if a refresh fails while it is still usable

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{CatalogError, CatalogResult};

/// Refresh 60 seconds before expiry.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// TTL assumed when the provider reports an unusable expiry.
const TOKEN_DEFAULT_TTL: Duration = Duration::from_secs(50 * 60);

/// OAuth scope for Firestore access.
pub const FIRESTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

/// Source of bearer tokens.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn token(&self) -> CatalogResult<String>;

    /// Drop any cached token after the server rejected it.
    async fn invalidate(&self) {}
}

/// Fixed token, used for the emulator (`owner`) and tests.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The emulator accepts `owner` as an admin token.
    pub fn emulator() -> Self {
        Self::new("owner")
    }
}

#[async_trait]
impl AccessTokenSource for StaticToken {
    async fn token(&self) -> CatalogResult<String> {
        Ok(self.0.clone())
    }
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }

    fn is_usable(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Caching token source over a `gcp_auth` provider.
pub struct TokenCache {
    provider: Arc<dyn TokenProvider>,
    cache: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            provider,
            cache: RwLock::new(None),
        }
    }

    /// Service account from `GOOGLE_APPLICATION_CREDENTIALS`, falling back to
    /// the ambient provider chain (metadata server, gcloud).
    pub async fn from_environment() -> CatalogResult<Self> {
        let service_account = CustomServiceAccount::from_env()
            .map_err(|e| CatalogError::auth_error(format!("Failed to load service account: {}", e)))?;

        let provider: Arc<dyn TokenProvider> = match service_account {
            Some(sa) => {
                info!("Using service account credentials for Firestore");
                Arc::new(sa)
            }
            None => gcp_auth::provider()
                .await
                .map_err(|e| CatalogError::auth_error(format!("No Google credentials available: {}", e)))?,
        };

        Ok(Self::new(provider))
    }

    async fn refresh(&self, cache: &mut Option<CachedToken>) -> CatalogResult<String> {
        match self.provider.token(&[FIRESTORE_SCOPE]).await {
            Ok(token) => {
                let access_token = token.as_str().to_string();
                let now = Utc::now();
                let expires = token.expires_at();
                let expires_at = if expires > now {
                    (expires - now)
                        .to_std()
                        .map(|ttl| Instant::now() + ttl)
                        .unwrap_or_else(|_| Instant::now() + TOKEN_DEFAULT_TTL)
                } else {
                    Instant::now()
                };

                *cache = Some(CachedToken {
                    access_token: access_token.clone(),
                    expires_at,
                });
                debug!("Refreshed Firestore access token");
                Ok(access_token)
            }
            Err(e) => match cache.as_ref() {
                Some(cached) if cached.is_usable() => {
                    warn!("Token refresh failed, using existing token: {}", e);
                    Ok(cached.access_token.clone())
                }
                _ => Err(CatalogError::auth_error(format!("Failed to obtain auth token: {}", e))),
            },
        }
    }
}

#[async_trait]
impl AccessTokenSource for TokenCache {
    async fn token(&self) -> CatalogResult<String> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref().filter(|c| c.is_fresh()) {
                return Ok(cached.access_token.clone());
            }
        }

        let mut cache = self.cache.write().await;
        if let Some(cached) = cache.as_ref().filter(|c| c.is_fresh()) {
            return Ok(cached.access_token.clone());
        }
        self.refresh(&mut cache).await
    }

    async fn invalidate(&self) {
        *self.cache.write().await = None;
    }
}
