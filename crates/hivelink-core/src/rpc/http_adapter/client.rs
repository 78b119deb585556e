use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::header;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::config::HttpTransportConfig;
use crate::error::{CoreError, TransportError};

use super::super::Transport;

/// First retry delay; doubled on every further attempt.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);
/// Upper bound on the retry backoff exponent.
const RETRY_MAX_SHIFT: u32 = 5;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// JSON-over-HTTP(S) transport for node endpoints.
///
/// Failures that produced no response (connect errors, timeouts, non-JSON
/// bodies) are retried up to `max_retries` times with exponential backoff.
/// Error statuses carrying a JSON body are returned immediately.
pub struct HttpTransport {
    client: reqwest::Client,
    auth: Option<(String, String)>,
    limiter: Option<DirectRateLimiter>,
    max_retries: u32,
}

impl HttpTransport {
    pub fn new(config: &HttpTransportConfig) -> Result<Self, CoreError> {
        let auth = match (&config.user, &config.pass) {
            (Some(user), Some(pass)) if !user.is_empty() => Some((user.clone(), pass.clone())),
            (None, None) => None,
            _ => {
                return Err(CoreError::InvalidConfig(
                    "rpc user and rpc pass must be set together, with a non-empty user".to_owned(),
                ))
            }
        };

        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .pool_max_idle_per_host(32)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| CoreError::InvalidConfig(format!("cannot build HTTP client: {e}")))?;

        let limiter = match config.requests_per_second {
            None => None,
            Some(limit) => {
                let limit = NonZeroU32::new(limit).ok_or_else(|| {
                    CoreError::InvalidConfig("requests_per_second must be at least 1".to_owned())
                })?;
                Some(RateLimiter::direct(Quota::per_second(limit)))
            }
        };

        Ok(Self {
            client,
            auth,
            limiter,
            max_retries: config.max_retries,
        })
    }

    async fn wait_for_rate_limit(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    async fn post_once(&self, url: &str, body: &Value) -> Result<Value, TransportError> {
        self.wait_for_rate_limit().await;

        let mut builder = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(body);
        if let Some((ref user, ref pass)) = self.auth {
            builder = builder.basic_auth(user, Some(pass));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::no_response(e.to_string()))?;
        let status = response.status();

        let text = response
            .text()
            .await
            .map_err(|e| TransportError::no_response(format!("HTTP {status}: {e}")))?;
        debug!(rpc.url = url, %status, body_len = text.len(), "http response");
        trace!(rpc.url = url, body = %text, "http response body");

        let parsed: Value = serde_json::from_str(&text).map_err(|e| {
            TransportError::no_response(format!("HTTP {status}: body is not JSON ({e})"))
        })?;

        if !status.is_success() {
            return Err(TransportError::with_response(format!("HTTP {status}"), parsed));
        }
        Ok(parsed)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, url: &str, body: &Value) -> Result<Value, TransportError> {
        let mut attempt = 0;
        loop {
            match self.post_once(url, body).await {
                Err(err) if err.response.is_none() && attempt < self.max_retries => {
                    let delay = retry_delay(attempt);
                    attempt += 1;
                    warn!(
                        rpc.url = url,
                        attempt,
                        max_retries = self.max_retries,
                        ?delay,
                        error = %err,
                        "request got no response; retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }
}

fn retry_delay(attempt: u32) -> Duration {
    RETRY_BASE_DELAY * (1u32 << attempt.min(RETRY_MAX_SHIFT))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delay_doubles_and_caps() {
        assert_eq!(retry_delay(0), Duration::from_millis(250));
        assert_eq!(retry_delay(1), Duration::from_millis(500));
        assert_eq!(retry_delay(3), Duration::from_secs(2));
        assert_eq!(retry_delay(40), retry_delay(RETRY_MAX_SHIFT));
    }

    #[test]
    fn zero_rate_limit_is_rejected() {
        let config = HttpTransportConfig {
            requests_per_second: Some(0),
            ..HttpTransportConfig::default()
        };
        let err = HttpTransport::new(&config).err().expect("zero rps must fail");
        assert!(err.to_string().contains("requests_per_second"));
    }

    #[test]
    fn partial_credentials_are_rejected() {
        let config = HttpTransportConfig {
            user: Some("alice".into()),
            ..HttpTransportConfig::default()
        };
        assert!(matches!(
            HttpTransport::new(&config),
            Err(CoreError::InvalidConfig(_))
        ));

        let config = HttpTransportConfig {
            pass: Some("secret".into()),
            ..HttpTransportConfig::default()
        };
        assert!(matches!(
            HttpTransport::new(&config),
            Err(CoreError::InvalidConfig(_))
        ));
    }

    #[test]
    fn basic_auth_needs_a_user_name() {
        let config = HttpTransportConfig {
            user: Some(String::new()),
            pass: Some("secret".into()),
            ..HttpTransportConfig::default()
        };
        let err = HttpTransport::new(&config).err().expect("empty user must fail");
        assert!(err.to_string().contains("rpc user and rpc pass"));

        let config = HttpTransportConfig {
            user: Some("proxy".into()),
            pass: Some("token".into()),
            ..HttpTransportConfig::default()
        };
        let transport = HttpTransport::new(&config).expect("full credentials are accepted");
        assert_eq!(
            transport.auth,
            Some(("proxy".to_owned(), "token".to_owned()))
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_reports_no_response() {
        let config = HttpTransportConfig {
            connect_timeout: Duration::from_millis(200),
            timeout: Duration::from_millis(500),
            ..HttpTransportConfig::default()
        };
        let transport = HttpTransport::new(&config).expect("transport must build");
        // Port 9 (discard) on localhost is closed in test environments.
        let err = transport
            .post("http://127.0.0.1:9", &serde_json::json!({}))
            .await
            .expect_err("closed port must fail");
        assert!(err.response.is_none());
    }
}
