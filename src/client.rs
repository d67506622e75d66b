//! HTTP client for the Drive API surface the bridge consumes.
//!
//! Wraps `reqwest::Client` with OAuth2 bearer-token auth, automatic rate
//! limiting, exponential-backoff retries, and the three request shapes
//! this bridge needs: media fetch, multipart upload POST, and the
//! unauthenticated form POST used for token revocation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::sdk::MediaSource;
use crate::types::{AccessToken, BridgeConfig, BridgeError, BridgeErrorKind, BridgeResult};

/// Base URL for Drive API v3 metadata/content endpoints.
pub const API_BASE: &str = "https://www.googleapis.com/drive/v3";
/// Base URL for Drive API v3 upload endpoints.
pub const UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";
/// Google OAuth2 token revocation endpoint.
pub const REVOKE_URL: &str = "https://oauth2.googleapis.com/revoke";

/// Drive HTTP client with built-in auth, rate-limiting, and retries.
#[derive(Clone)]
pub struct DriveClient {
    /// Inner reqwest client.
    inner: Client,
    /// Currently active OAuth2 token.
    token: Option<AccessToken>,
    /// Configuration.
    config: BridgeConfig,
    /// Nanosecond timestamp of the last request (for rate-limiting).
    last_request_ns: Arc<AtomicU64>,
}

impl DriveClient {
    // ── Construction ─────────────────────────────────────────────

    /// Create a new client from config.
    pub fn new(config: BridgeConfig) -> BridgeResult<Self> {
        let inner = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| BridgeError::network(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            inner,
            token: None,
            config,
            last_request_ns: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Create a client without any configuration (for tests / quick scripts).
    pub fn default_client() -> BridgeResult<Self> {
        Self::new(BridgeConfig::default())
    }

    // ── Token management ─────────────────────────────────────────

    /// Set the active OAuth2 token.
    pub fn set_token(&mut self, token: AccessToken) {
        self.token = Some(token);
    }

    /// Drop the active token.
    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// Get a reference to the current token, if any.
    pub fn token(&self) -> Option<&AccessToken> {
        self.token.as_ref()
    }

    /// Whether the client currently has a valid (non-expired) token.
    pub fn is_authenticated(&self) -> bool {
        self.token
            .as_ref()
            .map(|t| !t.access_token.is_empty() && !t.is_expired())
            .unwrap_or(false)
    }

    /// Get the config reference.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    // ── Rate limiting ────────────────────────────────────────────

    async fn rate_limit(&self) {
        if self.config.rate_limit_ms == 0 {
            return;
        }
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        let last = self.last_request_ns.load(Ordering::Relaxed);
        let min_gap = self.config.rate_limit_ms * 1_000_000; // ms → ns
        if last > 0 && now.saturating_sub(last) < min_gap {
            let wait = min_gap - now.saturating_sub(last);
            tokio::time::sleep(Duration::from_nanos(wait)).await;
        }
        self.last_request_ns.store(
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos() as u64,
            Ordering::Relaxed,
        );
    }

    // ── Request building helpers ─────────────────────────────────

    fn auth_headers(&self) -> BridgeResult<HeaderMap> {
        let token = self
            .token
            .as_ref()
            .ok_or_else(|| BridgeError::auth("No OAuth2 token set"))?;
        if token.is_expired() {
            return Err(BridgeError::new(
                BridgeErrorKind::TokenExpired,
                "OAuth2 token has expired — re-authorization required",
            ));
        }
        bearer_headers(&token.access_token)
    }

    fn build_request(&self, method: Method, url: &str) -> BridgeResult<RequestBuilder> {
        let headers = self.auth_headers()?;
        Ok(self.inner.request(method, url).headers(headers))
    }

    // ── Core execution with retries ──────────────────────────────

    /// Execute a request builder with automatic retry on transient failures.
    async fn execute_with_retry(
        &self,
        build_fn: impl Fn() -> BridgeResult<RequestBuilder>,
    ) -> BridgeResult<Response> {
        let max_retries = self.config.max_retries;
        let mut attempt = 0u32;
        loop {
            self.rate_limit().await;
            let request = build_fn()?
                .build()
                .map_err(|e| BridgeError::network(format!("Failed to build request: {e}")))?;
            debug!("Drive API {} {}", request.method(), request.url());

            match self.inner.execute(request).await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return Ok(resp);
                    }
                    let body = resp.text().await.unwrap_or_default();
                    let err = BridgeError::from_status(status.as_u16(), &body);

                    // Retry on 429 and 5xx
                    if (status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error())
                        && attempt < max_retries
                    {
                        attempt += 1;
                        let backoff = Duration::from_millis(500 * 2u64.pow(attempt));
                        warn!(
                            "Drive API transient error ({}), retry {}/{} in {:?}",
                            status, attempt, max_retries, backoff
                        );
                        tokio::time::sleep(backoff).await;
                        continue;
                    }
                    return Err(err);
                }
                Err(e) => {
                    if attempt < max_retries {
                        attempt += 1;
                        let backoff = Duration::from_millis(500 * 2u64.pow(attempt));
                        warn!(
                            "Drive API network error: {}, retry {}/{} in {:?}",
                            e, attempt, max_retries, backoff
                        );
                        tokio::time::sleep(backoff).await;
                        continue;
                    }
                    return Err(BridgeError::network(e.to_string()));
                }
            }
        }
    }

    // ── Public request helpers ───────────────────────────────────

    /// POST raw bytes (uploads), return JSON.
    pub async fn post_bytes<T: DeserializeOwned>(
        &self,
        url: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> BridgeResult<T> {
        let url_owned = url.to_string();
        let ct = content_type.to_string();

        let resp = self
            .execute_with_retry(|| {
                let req = self.build_request(Method::POST, &url_owned)?;
                Ok(req.header(CONTENT_TYPE, &ct).body(bytes.clone()))
            })
            .await?;

        resp.json::<T>()
            .await
            .map_err(|e| BridgeError::network(format!("JSON parse error: {e}")))
    }

    /// POST to an OAuth endpoint (un-authenticated form body).
    pub async fn post_form_unauthenticated<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> BridgeResult<T> {
        self.rate_limit().await;
        let resp = self
            .inner
            .post(url)
            .form(params)
            .send()
            .await
            .map_err(|e| BridgeError::network(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(BridgeError::from_status(status, &body));
        }
        resp.json::<T>()
            .await
            .map_err(|e| BridgeError::network(format!("OAuth response parse error: {e}")))
    }

    // ── URL construction ─────────────────────────────────────────

    /// Build a full API URL: `{API_BASE}/{path}`.
    pub fn api_url(path: &str) -> String {
        format!("{}/{}", API_BASE, path.trim_start_matches('/'))
    }

    /// Build a full upload URL: `{UPLOAD_BASE}/{path}`.
    pub fn upload_url(path: &str) -> String {
        format!("{}/{}", UPLOAD_BASE, path.trim_start_matches('/'))
    }

    /// Media-fetch URL for a file's binary content.
    pub fn media_url(file_id: &str) -> BridgeResult<String> {
        let base = Self::api_url(&format!("files/{}", file_id));
        let url = url::Url::parse_with_params(
            &base,
            &[("alt", "media"), ("supportsAllDrives", "true")],
        )
        .map_err(|e| BridgeError::invalid(format!("Failed to build media URL: {e}")))?;
        Ok(url.to_string())
    }

    /// Multipart upload endpoint URL.
    pub fn multipart_upload_url() -> BridgeResult<String> {
        let base = Self::upload_url("files");
        let url = url::Url::parse_with_params(
            &base,
            &[("uploadType", "multipart"), ("supportsAllDrives", "true")],
        )
        .map_err(|e| BridgeError::invalid(format!("Failed to build upload URL: {e}")))?;
        Ok(url.to_string())
    }
}

fn bearer_headers(access_token: &str) -> BridgeResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    let val = format!("Bearer {}", access_token);
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&val)
            .map_err(|e| BridgeError::auth(format!("Invalid auth header: {e}")))?,
    );
    Ok(headers)
}

/// The client doubles as the media source the picker flow fetches through.
/// The token is passed explicitly so the fetch always uses the session the
/// token manager just refreshed.
#[async_trait]
impl MediaSource for DriveClient {
    async fn fetch_media(&self, file_id: &str, access_token: &str) -> BridgeResult<Vec<u8>> {
        let url = Self::media_url(file_id)?;
        let headers = bearer_headers(access_token)?;
        let resp = self
            .execute_with_retry(|| Ok(self.inner.get(&url).headers(headers.clone())))
            .await?;
        resp.bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| BridgeError::network(format!("Download error: {e}")))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
