//! Modrinth API client
//!
//! This module handles the two Modrinth endpoints the converter needs:
//! - project search (`/v2/search`)
//! - release listing (`/v2/project/{id}/version`) with optional loader/game filters
//!
//! Rate-limit headers are tracked on every response so callers can pace themselves,
//! and transient failures (429, 5xx, timeouts) are retried a bounded number of times.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tokio_retry::RetryIf;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::{debug, warn};
use url::Url;

use crate::api::{ProjectIndex, QuotaSource, SearchResponse, VersionFilter};
use crate::config::ConvertConfig;
use crate::core::{ConvertError, ReleaseRecord, Result};

/// Modrinth allows 300 requests per minute per IP
const DEFAULT_RATE_LIMIT: u32 = 300;

/// Rate limit window as reported by the last response
#[derive(Debug, Clone)]
struct RateLimit {
    limit: u32,
    remaining: u32,
    reset_at: Instant,
}

impl RateLimit {
    fn is_blocked(&self) -> bool {
        self.remaining == 0
    }

    fn time_until_reset(&self) -> Duration {
        self.reset_at.saturating_duration_since(Instant::now())
    }
}

/// Public rate limit status for display/logging and pacing
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitStatus {
    pub limit: u32,
    pub remaining: u32,
    pub reset_in: Duration,
}

impl RateLimitStatus {
    pub fn is_blocked(&self) -> bool {
        self.remaining == 0
    }

    /// Format rate limit status for display
    pub fn format_status(&self) -> String {
        let percent = if self.limit == 0 {
            0
        } else {
            ((self.remaining as f64 / self.limit as f64) * 100.0) as u32
        };

        format!(
            "Remaining requests: {}/{} ({}%), window resets in {}s",
            self.remaining,
            self.limit,
            percent,
            self.reset_in.as_secs()
        )
    }
}

/// Modrinth API client
#[derive(Clone)]
pub struct ModrinthApi {
    base: Url,
    client: Client,
    max_retries: usize,
    retry_delay: Duration,
    rate_limit: Arc<Mutex<Option<RateLimit>>>,
}

impl std::fmt::Debug for ModrinthApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModrinthApi")
            .field("base", &self.base.as_str())
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl ModrinthApi {
    /// Create a client for the API base, user agent and timeouts in `config`
    pub fn new(config: &ConvertConfig) -> Result<Self> {
        let base = Url::parse(&config.api_base).map_err(|source| ConvertError::InvalidUrl {
            url: config.api_base.clone(),
            source,
        })?;

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConvertError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
                field: None,
                suggestion: None,
            })?;

        Ok(Self {
            base,
            client,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
            rate_limit: Arc::new(Mutex::new(None)),
        })
    }

    /// Build an endpoint URL below the API base
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ConvertError::Configuration {
                message: format!("API base '{}' cannot carry a path", self.base),
                field: Some("api_base".to_string()),
                suggestion: Some("Use an http(s) URL such as https://api.modrinth.com".to_string()),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn search_url(&self, query: &str) -> Result<Url> {
        let mut url = self.endpoint(&["v2", "search"])?;
        url.query_pairs_mut().append_pair("query", query);
        Ok(url)
    }

    fn versions_url(&self, project_id: &str, filter: Option<&VersionFilter>) -> Result<Url> {
        let mut url = self.endpoint(&["v2", "project", project_id, "version"])?;
        if let Some(filter) = filter {
            // The API expects JSON arrays in the query string
            let loaders = serde_json::to_string(&filter.loaders)?;
            let game_versions = serde_json::to_string(&filter.game_versions)?;
            url.query_pairs_mut()
                .append_pair("loaders", &loaders)
                .append_pair("game_versions", &game_versions);
        }
        Ok(url)
    }

    /// GET and decode with bounded retries on transient failures
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let strategy = ExponentialBackoff::from_millis(2)
            .factor((self.retry_delay.as_millis() as u64 / 2).max(1))
            .max_delay(Duration::from_secs(60))
            .take(self.max_retries);

        let url = &url;
        RetryIf::start(
            strategy,
            move || self.get_json_once(url),
            |error: &ConvertError| {
                let retry = error.is_recoverable();
                if retry {
                    warn!("Retrying Modrinth request after {} error: {}", error.category(), error);
                }
                retry
            },
        )
        .await
    }

    async fn get_json_once<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        self.wait_for_rate_limit().await;

        debug!("Modrinth API request: GET {}", url);
        let response = self.client.get(url.clone()).send().await?;
        self.update_rate_limit_from_headers(response.headers());

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            debug!("Modrinth API error response {}: {}", status, body);
            return Err(ConvertError::ApiStatus {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|source| ConvertError::Decode {
            url: url.to_string(),
            source,
        })
    }

    /// Update rate limit information from response headers
    fn update_rate_limit_from_headers(&self, headers: &reqwest::header::HeaderMap) {
        let header_u64 = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
        };

        let Some(remaining) = header_u64("x-ratelimit-remaining") else {
            return;
        };

        let limit = header_u64("x-ratelimit-limit")
            .map(|v| v as u32)
            .unwrap_or(DEFAULT_RATE_LIMIT);
        let reset_in = Duration::from_secs(header_u64("x-ratelimit-reset").unwrap_or(60));

        let rate_limit = RateLimit {
            limit,
            remaining: remaining as u32,
            reset_at: Instant::now() + reset_in,
        };

        debug!(
            "Rate limit updated: {}/{} remaining, reset in {}s",
            rate_limit.remaining,
            rate_limit.limit,
            reset_in.as_secs()
        );

        if let Ok(mut guard) = self.rate_limit.lock() {
            *guard = Some(rate_limit);
        }
    }

    /// Wait for the rate limit window to reset when the budget is exhausted
    async fn wait_for_rate_limit(&self) {
        let wait = self
            .rate_limit
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().filter(|l| l.is_blocked()).map(RateLimit::time_until_reset));

        if let Some(wait) = wait.filter(|w| !w.is_zero()) {
            debug!("Rate limited, waiting {:?} before making request", wait);
            sleep(wait).await;
        }
    }

    /// Get current rate limit information
    pub fn get_rate_limit_status(&self) -> Option<RateLimitStatus> {
        let guard = self.rate_limit.lock().ok()?;
        guard.as_ref().map(|limit| RateLimitStatus {
            limit: limit.limit,
            remaining: limit.remaining,
            reset_in: limit.time_until_reset(),
        })
    }
}

#[async_trait]
impl ProjectIndex for ModrinthApi {
    async fn search(&self, query: &str) -> Result<SearchResponse> {
        let url = self.search_url(query)?;
        let response: SearchResponse = self.get_json(url).await?;
        debug!("Search '{}' returned {} of {} hits", query, response.hits.len(), response.total_hits);
        Ok(response)
    }

    async fn list_versions(
        &self,
        project_id: &str,
        filter: Option<&VersionFilter>,
    ) -> Result<Vec<ReleaseRecord>> {
        let url = self.versions_url(project_id, filter)?;
        let releases: Vec<ReleaseRecord> = self.get_json(url).await?;
        debug!(
            "Project {} has {} releases ({})",
            project_id,
            releases.len(),
            if filter.is_some() { "filtered" } else { "unfiltered" }
        );
        Ok(releases)
    }
}

impl QuotaSource for ModrinthApi {
    fn rate_limit_status(&self) -> Option<RateLimitStatus> {
        self.get_rate_limit_status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConvertConfigBuilder;
    use crate::core::ProjectType;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_for(server: &MockServer) -> ModrinthApi {
        let config = ConvertConfigBuilder::new()
            .api_base(server.uri())
            .retry_delay(Duration::from_millis(5))
            .max_retries(2)
            .build();
        ModrinthApi::new(&config).unwrap()
    }

    const SEARCH_BODY: &str = r#"{
        "hits": [
            {
                "project_id": "AANobbMI",
                "project_type": "mod",
                "slug": "sodium",
                "author": "jellysquid3",
                "title": "Sodium",
                "description": "Rendering engine",
                "downloads": 1000
            },
            {
                "project_id": "gvQqBUqZ",
                "project_type": "mod",
                "slug": "lithium",
                "author": "jellysquid3",
                "title": "Lithium"
            }
        ],
        "offset": 0,
        "limit": 10,
        "total_hits": 2
    }"#;

    #[tokio::test]
    async fn test_search_parses_hits_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/search"))
            .and(query_param("query", "Sodium Extra"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(SEARCH_BODY)
                    .insert_header("content-type", "application/json")
                    .insert_header("x-ratelimit-limit", "300")
                    .insert_header("x-ratelimit-remaining", "299")
                    .insert_header("x-ratelimit-reset", "42"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server);
        let response = api.search("Sodium Extra").await.unwrap();

        assert_eq!(response.total_hits, 2);
        assert_eq!(response.hits[0].slug, "sodium");
        assert_eq!(response.hits[1].title, "Lithium");
        assert_eq!(response.hits[0].project_type, ProjectType::Mod);

        let status = api.get_rate_limit_status().unwrap();
        assert_eq!(status.limit, 300);
        assert_eq!(status.remaining, 299);
        assert!(status.reset_in <= Duration::from_secs(42));
    }

    #[tokio::test]
    async fn test_filtered_versions_send_json_arrays() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/project/AANobbMI/version"))
            .and(query_param("loaders", r#"["forge"]"#))
            .and(query_param("game_versions", r#"["1.20.1","1.20"]"#))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[{"id": "v1", "game_versions": ["1.20.1"], "loaders": ["forge"], "files": []}]"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server);
        let filter = VersionFilter::from(&ConvertConfig::default().target);
        let releases = api.list_versions("AANobbMI", Some(&filter)).await.unwrap();

        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].release_id, "v1");
    }

    #[tokio::test]
    async fn test_unfiltered_versions_have_no_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/project/abc/version"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .mount(&server)
            .await;

        let api = api_for(&server);
        let url = api.versions_url("abc", None).unwrap();
        assert!(url.query().is_none());

        let releases = api.list_versions("abc", None).await.unwrap();
        assert!(releases.is_empty());
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/search"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SEARCH_BODY))
            .mount(&server)
            .await;

        let api = api_for(&server);
        let response = api.search("Sodium").await.unwrap();
        assert_eq!(response.hits.len(), 2);
    }

    #[tokio::test]
    async fn test_too_many_requests_waits_for_reset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/search"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("x-ratelimit-limit", "300")
                    .insert_header("x-ratelimit-remaining", "0")
                    .insert_header("x-ratelimit-reset", "1"),
            )
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SEARCH_BODY))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server);
        let start = Instant::now();
        let response = api.search("Sodium").await.unwrap();

        assert_eq!(response.hits.len(), 2);
        assert!(start.elapsed() >= Duration::from_millis(900));
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/project/missing/version"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server);
        match api.list_versions("missing", None).await {
            Err(ConvertError::ApiStatus { status, body, .. }) => {
                assert_eq!(status, 404);
                assert_eq!(body, "not found");
            }
            other => panic!("expected API status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"hits\": 3}"))
            .mount(&server)
            .await;

        let api = api_for(&server);
        let result = api.search("anything").await;
        assert!(matches!(result, Err(ConvertError::Decode { .. })));
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let config = ConvertConfigBuilder::new()
            .api_base("https://staging-api.modrinth.com/")
            .build();
        let api = ModrinthApi::new(&config).unwrap();
        let url = api.search_url("Just Enough Items (JEI)").unwrap();
        assert_eq!(url.path(), "/v2/search");
        assert_eq!(
            url.query_pairs().next().map(|(_, v)| v.into_owned()),
            Some("Just Enough Items (JEI)".to_string())
        );
    }

    #[test]
    fn test_rate_limit_status_format() {
        let status = RateLimitStatus {
            limit: 300,
            remaining: 150,
            reset_in: Duration::from_secs(30),
        };
        assert!(!status.is_blocked());
        assert_eq!(
            status.format_status(),
            "Remaining requests: 150/300 (50%), window resets in 30s"
        );
    }
}
