//! Gateway client for the cloud inventory API.
//!
//! The gateway speaks JSON over HTTPS and wraps every listing in an
//! `{"items": [...]}` envelope. [`CloudApi`] is the seam the source works
//! against; [`HttpGateway`] is the production implementation.

use std::time::Duration;

use async_trait::async_trait;
use muster_core::source::{SourceError, SourceResult};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Authentication configuration for the gateway.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// No authentication.
    #[default]
    None,
    /// API key sent in a custom header.
    ApiKey { key: String, header_name: String },
    /// Bearer token authentication.
    BearerToken { token: String },
    /// Basic authentication.
    Basic { username: String, password: String },
}

/// Configuration for the gateway client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the inventory gateway.
    pub base_url: String,
    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Regions to collect from. An empty list means ask the gateway.
    #[serde(default)]
    pub regions: Vec<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Maximum retries per request.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

/// The listing calls the cloud source needs. Regional listings take the
/// region name; the rest are global.
#[async_trait]
pub trait CloudApi: Send + Sync {
    async fn regions(&self) -> SourceResult<Vec<String>>;
    async fn instances(&self, region: &str) -> SourceResult<Vec<Value>>;
    async fn databases(&self, region: &str) -> SourceResult<Vec<Value>>;
    async fn networks(&self, region: &str) -> SourceResult<Vec<Value>>;
    async fn security_groups(&self, region: &str) -> SourceResult<Vec<Value>>;
    async fn scaling_groups(&self, region: &str) -> SourceResult<Vec<Value>>;
    async fn buckets(&self) -> SourceResult<Vec<Value>>;
    async fn dns_zones(&self) -> SourceResult<Vec<Value>>;
    async fn dns_records(&self, zone_id: &str) -> SourceResult<Vec<Value>>;
    async fn iam_users(&self) -> SourceResult<Vec<Value>>;
    async fn iam_groups(&self) -> SourceResult<Vec<Value>>;
}

/// HTTP implementation of [`CloudApi`] with retry and backoff.
pub struct HttpGateway {
    client: Client,
    config: GatewayConfig,
}

impl HttpGateway {
    pub fn new(config: GatewayConfig) -> SourceResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| SourceError::ConfigError(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn build_url(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    fn add_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.auth {
            AuthConfig::None => request,
            AuthConfig::ApiKey { key, header_name } => request.header(header_name, key),
            AuthConfig::BearerToken { token } => {
                request.header("Authorization", format!("Bearer {}", token))
            }
            AuthConfig::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
        }
    }

    /// Fetch one listing and unwrap the `items` envelope.
    async fn get_items<T: DeserializeOwned>(&self, path: &str) -> SourceResult<Vec<T>> {
        #[derive(Deserialize)]
        struct Items<T> {
            items: Vec<T>,
        }

        let response = self.execute_with_retry(path).await?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))?;

        let envelope: Items<T> = serde_json::from_str(&text).map_err(|e| {
            SourceError::InvalidResponse(format!(
                "Failed to parse response (status {}): {} - Body: {}",
                status,
                e,
                text.chars().take(500).collect::<String>()
            ))
        })?;
        Ok(envelope.items)
    }

    /// Executes a GET with authentication, retries, and error mapping.
    /// Server errors retry with exponential backoff and jitter; client
    /// errors fail immediately.
    async fn execute_with_retry(&self, path: &str) -> SourceResult<Response> {
        let url = self.build_url(path);
        let mut last_error = None;
        let mut delay = Duration::from_millis(100);

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                debug!("Retry attempt {} after {:?}", attempt, delay);
                sleep(delay).await;
                delay = std::cmp::min(delay * 2 + rand_jitter(), Duration::from_secs(30));
            }

            let request = self.add_auth(self.client.get(&url));
            match request.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_server_error() && attempt < self.config.max_retries {
                        warn!("Server error {}, retrying", status);
                        last_error = Some(SourceError::RequestFailed(format!(
                            "Server error: {}",
                            status
                        )));
                        continue;
                    }

                    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                        return Err(SourceError::AuthenticationFailed(status.to_string()));
                    }
                    if !status.is_success() {
                        return Err(SourceError::RequestFailed(format!(
                            "{} from {}",
                            status, url
                        )));
                    }

                    return Ok(response);
                }
                Err(e) => {
                    if e.is_timeout() {
                        last_error = Some(SourceError::Timeout(e.to_string()));
                    } else if e.is_connect() {
                        last_error = Some(SourceError::ConnectionFailed(e.to_string()));
                    } else {
                        last_error = Some(SourceError::RequestFailed(e.to_string()));
                    }

                    if attempt >= self.config.max_retries {
                        break;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| SourceError::Internal("Unknown error".to_string())))
    }
}

#[async_trait]
impl CloudApi for HttpGateway {
    /// Configured regions win; discovery only runs when the list is empty.
    async fn regions(&self) -> SourceResult<Vec<String>> {
        if !self.config.regions.is_empty() {
            return Ok(self.config.regions.clone());
        }
        self.get_items("/v1/regions").await
    }

    async fn instances(&self, region: &str) -> SourceResult<Vec<Value>> {
        self.get_items(&format!("/v1/{}/instances", region)).await
    }

    async fn databases(&self, region: &str) -> SourceResult<Vec<Value>> {
        self.get_items(&format!("/v1/{}/databases", region)).await
    }

    async fn networks(&self, region: &str) -> SourceResult<Vec<Value>> {
        self.get_items(&format!("/v1/{}/networks", region)).await
    }

    async fn security_groups(&self, region: &str) -> SourceResult<Vec<Value>> {
        self.get_items(&format!("/v1/{}/security-groups", region))
            .await
    }

    async fn scaling_groups(&self, region: &str) -> SourceResult<Vec<Value>> {
        self.get_items(&format!("/v1/{}/scaling-groups", region))
            .await
    }

    async fn buckets(&self) -> SourceResult<Vec<Value>> {
        self.get_items("/v1/buckets").await
    }

    async fn dns_zones(&self) -> SourceResult<Vec<Value>> {
        self.get_items("/v1/dns/zones").await
    }

    async fn dns_records(&self, zone_id: &str) -> SourceResult<Vec<Value>> {
        self.get_items(&format!("/v1/dns/zones/{}/records", zone_id))
            .await
    }

    async fn iam_users(&self) -> SourceResult<Vec<Value>> {
        self.get_items("/v1/iam/users").await
    }

    async fn iam_groups(&self) -> SourceResult<Vec<Value>> {
        self.get_items("/v1/iam/groups").await
    }
}

/// Generate a small random jitter for exponential backoff.
fn rand_jitter() -> Duration {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    std::time::Instant::now().hash(&mut hasher);
    let jitter_ms = hasher.finish() % 100;
    Duration::from_millis(jitter_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> GatewayConfig {
        GatewayConfig {
            base_url: "https://gateway.example.com".to_string(),
            auth: AuthConfig::None,
            regions: Vec::new(),
            timeout_secs: 30,
            max_retries: 3,
        }
    }

    #[test]
    fn test_build_url() {
        let gateway = HttpGateway::new(test_config()).unwrap();

        assert_eq!(
            gateway.build_url("/v1/regions"),
            "https://gateway.example.com/v1/regions"
        );
        assert_eq!(
            gateway.build_url("v1/regions"),
            "https://gateway.example.com/v1/regions"
        );
    }

    #[test]
    fn test_config_defaults() {
        let config: GatewayConfig =
            serde_json::from_str(r#"{"base_url": "https://gateway.example.com"}"#).unwrap();

        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_retries, 3);
        assert!(config.regions.is_empty());
        assert!(matches!(config.auth, AuthConfig::None));
    }

    #[tokio::test]
    async fn test_configured_regions_skip_discovery() {
        let mut config = test_config();
        config.regions = vec!["us-east-1".to_string(), "eu-west-1".to_string()];
        let gateway = HttpGateway::new(config).unwrap();

        let regions = gateway.regions().await.unwrap();

        assert_eq!(regions, vec!["us-east-1", "eu-west-1"]);
    }
}
