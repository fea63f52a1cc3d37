//! Firestore REST API client.
//!
//! - Cached access tokens with one refresh on `ACCESS_TOKEN_EXPIRED`
//! - HTTP client tuning (pooling, timeouts)
//! - Exponential backoff with jitter for transient failures
//! - Tracing spans and request metrics
//! - Emulator support via `FIRESTORE_EMULATOR_HOST`

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, info, info_span, Instrument};

use crate::auth::{AccessTokenSource, StaticToken, TokenCache};
use crate::error::{CatalogError, CatalogResult};
use crate::metrics::record_request;
use crate::retry::{with_retry, RetryConfig};
use crate::types::{Document, Value};

pub const DEFAULT_COLLECTION: &str = "videoAssets";

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    pub project_id: String,
    /// Usually "(default)"
    pub database_id: String,
    /// Collection holding video asset records
    pub collection: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub retry: RetryConfig,
    /// `host:port` of a local emulator; disables real credentials
    pub emulator_host: Option<String>,
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl FirestoreConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database_id: "(default)".to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            retry: RetryConfig::default(),
            emulator_host: None,
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> CatalogResult<Self> {
        let project_id = non_empty_env("GCP_PROJECT_ID")
            .or_else(|| non_empty_env("FIREBASE_PROJECT_ID"))
            .ok_or_else(|| CatalogError::config("GCP_PROJECT_ID or FIREBASE_PROJECT_ID must be set"))?;

        let connect_timeout_secs = non_empty_env("FIRESTORE_CONNECT_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            database_id: non_empty_env("FIRESTORE_DATABASE_ID").unwrap_or_else(|| "(default)".to_string()),
            collection: non_empty_env("FIRESTORE_COLLECTION").unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            retry: RetryConfig::from_env(),
            emulator_host: non_empty_env("FIRESTORE_EMULATOR_HOST"),
            ..Self::new(project_id)
        })
    }

    /// Documents root for this project and database.
    pub fn documents_url(&self) -> String {
        let host = match &self.emulator_host {
            Some(host) => format!("http://{}", host.trim_end_matches('/')),
            None => "https://firestore.googleapis.com".to_string(),
        };
        format!(
            "{}/v1/projects/{}/databases/{}/documents",
            host, self.project_id, self.database_id
        )
    }
}

// =============================================================================
// Client
// =============================================================================

/// Firestore REST API client.
#[derive(Clone)]
pub struct FirestoreClient {
    http: Client,
    config: FirestoreConfig,
    base_url: String,
    tokens: Arc<dyn AccessTokenSource>,
}

impl FirestoreClient {
    /// Real credentials, or the emulator token when an emulator host is set.
    pub async fn new(config: FirestoreConfig) -> CatalogResult<Self> {
        let tokens: Arc<dyn AccessTokenSource> = if config.emulator_host.is_some() {
            info!(host = ?config.emulator_host, "Using Firestore emulator");
            Arc::new(StaticToken::emulator())
        } else {
            Arc::new(TokenCache::from_environment().await?)
        };
        let base_url = config.documents_url();
        Self::with_token_source(config, tokens, base_url)
    }

    /// Explicit token source and documents root.
    pub fn with_token_source(
        config: FirestoreConfig,
        tokens: Arc<dyn AccessTokenSource>,
        base_url: impl Into<String>,
    ) -> CatalogResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("clipdrop-catalog/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            config,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        })
    }

    pub async fn from_env() -> CatalogResult<Self> {
        Self::new(FirestoreConfig::from_env()?).await
    }

    pub fn config(&self) -> &FirestoreConfig {
        &self.config
    }

    fn is_access_token_expired(body: &str) -> bool {
        body.contains("ACCESS_TOKEN_EXPIRED") || body.contains("\"UNAUTHENTICATED\"")
    }

    /// Send with a bearer token; on an expired-token 401, refresh once and resend.
    async fn send_authorized<B>(&self, build: B) -> CatalogResult<Response>
    where
        B: Fn(&str) -> RequestBuilder,
    {
        let token = self.tokens.token().await?;
        let response = build(&token).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if !Self::is_access_token_expired(&body) {
            return Err(CatalogError::from_http_status(401, body));
        }

        debug!("Access token expired, refreshing");
        self.tokens.invalidate().await;
        let token = self.tokens.token().await?;
        Ok(build(&token).send().await?)
    }

    // =========================================================================
    // CRUD Operations
    // =========================================================================

    /// Create a document with an explicit id; 409 maps to `AlreadyExists`.
    pub async fn create_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
    ) -> CatalogResult<Document> {
        let url = format!(
            "{}/{}?documentId={}",
            self.base_url,
            collection,
            urlencoding::encode(doc_id)
        );
        let body = Document::new(fields);

        self.execute_request("create_document", collection, Some(doc_id), || async {
            let response = self
                .send_authorized(|token| self.http.post(&url).bearer_auth(token).json(&body))
                .await?;
            match response.status() {
                StatusCode::OK | StatusCode::CREATED => Ok(response.json().await?),
                StatusCode::CONFLICT => Err(CatalogError::AlreadyExists(format!("{}/{}", collection, doc_id))),
                status => Err(Self::error_from_response(status, &url, response).await),
            }
        })
        .await
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    /// Retry, trace and record one logical request.
    async fn execute_request<T, F, Fut>(
        &self,
        operation: &str,
        collection: &str,
        doc_id: Option<&str>,
        op: F,
    ) -> CatalogResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = CatalogResult<T>>,
    {
        let span = info_span!(
            "firestore_request",
            operation = %operation,
            collection = %collection,
            doc_id = doc_id.unwrap_or("")
        );

        let start = Instant::now();
        let result = with_retry(&self.config.retry, operation, op).instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, status, latency_ms);

        result
    }

    async fn error_from_response(status: StatusCode, url: &str, response: Response) -> CatalogError {
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            return CatalogError::rate_limited(retry_after);
        }
        let body = response.text().await.unwrap_or_default();
        CatalogError::from_http_status(status.as_u16(), format!("{} failed: {}", url, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToFirestoreValue;
    use serial_test::serial;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DOCS: &str = "/v1/projects/test-project/databases/(default)/documents";

    fn test_config() -> FirestoreConfig {
        FirestoreConfig {
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            retry: RetryConfig {
                max_retries: 2,
                base_delay_ms: 1,
                max_delay_ms: 5,
            },
            ..FirestoreConfig::new("test-project")
        }
    }

    fn client_for(server: &MockServer, tokens: Arc<dyn AccessTokenSource>) -> FirestoreClient {
        FirestoreClient::with_token_source(test_config(), tokens, format!("{}{}", server.uri(), DOCS)).unwrap()
    }

    fn fields() -> HashMap<String, Value> {
        HashMap::from([("title".to_string(), "Serum Ad".to_firestore_value())])
    }

    /// Hands out `stale` first, then `fresh` after an invalidation.
    struct RotatingToken {
        invalidations: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl AccessTokenSource for RotatingToken {
        async fn token(&self) -> CatalogResult<String> {
            Ok(if self.invalidations.load(Ordering::SeqCst) == 0 {
                "stale".to_string()
            } else {
                "fresh".to_string()
            })
        }

        async fn invalidate(&self) {
            self.invalidations.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_create_document_sends_id_and_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{}/videoAssets", DOCS)))
            .and(query_param("documentId", "abc"))
            .and(header("authorization", "Bearer owner"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "projects/test-project/databases/(default)/documents/videoAssets/abc"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Arc::new(StaticToken::emulator()));
        let doc = client.create_document("videoAssets", "abc", fields()).await.unwrap();
        assert_eq!(doc.id(), Some("abc"));
    }

    #[tokio::test]
    async fn test_create_conflict_is_already_exists() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(409))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Arc::new(StaticToken::emulator()));
        let err = client.create_document("videoAssets", "abc", fields()).await.unwrap_err();
        assert!(matches!(err, CatalogError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let client = client_for(&server, Arc::new(StaticToken::emulator()));
        assert!(client.create_document("videoAssets", "abc", fields()).await.is_ok());
    }

    #[tokio::test]
    async fn test_bad_request_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("INVALID_ARGUMENT"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Arc::new(StaticToken::emulator()));
        let err = client.create_document("videoAssets", "abc", fields()).await.unwrap_err();
        assert!(matches!(err, CatalogError::RequestFailed(msg) if msg.contains("INVALID_ARGUMENT")));
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer stale"))
            .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"error":{"status":"UNAUTHENTICATED"}}"#))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"fields": {}})))
            .expect(1)
            .mount(&server)
            .await;

        let tokens = Arc::new(RotatingToken {
            invalidations: AtomicUsize::new(0),
        });
        let client = client_for(&server, tokens.clone());
        assert!(client.create_document("videoAssets", "abc", fields()).await.is_ok());
        assert_eq!(tokens.invalidations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_documents_url() {
        let mut config = FirestoreConfig::new("p1");
        assert_eq!(
            config.documents_url(),
            "https://firestore.googleapis.com/v1/projects/p1/databases/(default)/documents"
        );
        config.emulator_host = Some("localhost:8080".to_string());
        assert!(config.documents_url().starts_with("http://localhost:8080/v1/projects/p1/"));
    }

    #[test]
    #[serial]
    fn test_config_requires_project_id() {
        std::env::remove_var("GCP_PROJECT_ID");
        std::env::remove_var("FIREBASE_PROJECT_ID");
        assert!(matches!(FirestoreConfig::from_env(), Err(CatalogError::Config(_))));

        std::env::set_var("GCP_PROJECT_ID", "");
        assert!(FirestoreConfig::from_env().is_err());
        std::env::remove_var("GCP_PROJECT_ID");
    }

    #[test]
    #[serial]
    fn test_config_from_env_values() {
        std::env::set_var("GCP_PROJECT_ID", "gcp-project");
        std::env::set_var("FIREBASE_PROJECT_ID", "firebase-project");
        std::env::set_var("FIRESTORE_COLLECTION", "clips");
        std::env::set_var("FIRESTORE_EMULATOR_HOST", "localhost:8080");
        std::env::set_var("FIRESTORE_CONNECT_TIMEOUT_SECS", "not-a-number");

        let config = FirestoreConfig::from_env().unwrap();
        assert_eq!(config.project_id, "gcp-project");
        assert_eq!(config.collection, "clips");
        assert_eq!(config.emulator_host.as_deref(), Some("localhost:8080"));
        assert_eq!(config.connect_timeout, Duration::from_secs(5));

        for var in [
            "GCP_PROJECT_ID",
            "FIREBASE_PROJECT_ID",
            "FIRESTORE_COLLECTION",
            "FIRESTORE_EMULATOR_HOST",
            "FIRESTORE_CONNECT_TIMEOUT_SECS",
        ] {
            std::env::remove_var(var);
        }
    }
}
