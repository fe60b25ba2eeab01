use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use granary_auth::Credentials;
use reqwest::header::LOCATION;
use tracing::debug;

use crate::core::{RedirectChain, is_redirect};
use crate::error::{Result, TransferError};

/// A boxed stream type for HTTP response bodies.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// A successful response body, not yet read.
pub struct HttpBody {
    pub content_length: Option<u64>,
    pub stream:         BoxStream<'static, Result<Bytes>>,
}

/// Asynchronous HTTP client abstraction.
///
/// Implementations follow redirects themselves and map any non-2xx final
/// status to [`TransferError::Status`].
///
/// # Implementations
///
/// - [`Session`]: Production implementation using `reqwest`
/// - Mock implementations for testing
pub trait HttpClient: Send + Sync {
    /// GET `url` with `headers` on every hop and return the body as a stream.
    fn get(&self, url: &str, headers: &[(String, String)]) -> impl Future<Output = Result<HttpBody>> + Send;
}

impl<C: HttpClient> HttpClient for Arc<C> {
    fn get(&self, url: &str, headers: &[(String, String)]) -> impl Future<Output = Result<HttpBody>> + Send {
        (**self).get(url, headers)
    }
}

/// Settings for an authenticated [`Session`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Host whose basic credentials are attached to requests.
    pub login_host:      String,
    pub credentials:     Option<Credentials>,
    pub connect_timeout: Duration,
    /// Longest silence tolerated while reading a response.
    pub read_timeout:    Duration,
    pub max_redirects:   usize,
    pub user_agent:      String,
}

impl SessionConfig {
    pub const DEFAULT_MAX_REDIRECTS: usize = 10;

    pub fn new(login_host: impl Into<String>) -> Self {
        Self {
            login_host:      login_host.into(),
            credentials:     None,
            connect_timeout: Duration::from_secs(30),
            read_timeout:    Duration::from_secs(120),
            max_redirects:   Self::DEFAULT_MAX_REDIRECTS,
            user_agent:      concat!("granary/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    #[must_use]
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = max;
        self
    }
}

/// Cookie-keeping HTTP session that follows redirects by hand.
///
/// Basic credentials go out with the first request and survive a redirect
/// only while [`keep_auth`](crate::keep_auth) allows it; hop tracking lives
/// in [`RedirectChain`](crate::RedirectChain).
pub struct Session {
    client:        reqwest::Client,
    login_host:    String,
    credentials:   Option<Credentials>,
    max_redirects: usize,
}

impl Session {
    pub fn new(config: SessionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .user_agent(config.user_agent)
            .build()?;
        Ok(Self {
            client,
            login_host: config.login_host,
            credentials: config.credentials,
            max_redirects: config.max_redirects,
        })
    }

    /// The underlying client, sharing this session's cookie jar.
    pub fn client(&self) -> &reqwest::Client { &self.client }

    /// GET `url`, following up to `max_redirects` hops.
    pub async fn send(&self, url: &str, headers: &[(String, String)]) -> Result<reqwest::Response> {
        let mut chain = RedirectChain::new(url, &self.login_host, self.credentials.is_some(), self.max_redirects)?;

        loop {
            let mut request = self.client.get(chain.current().clone());
            for (key, value) in headers {
                request = request.header(key.as_str(), value.as_str());
            }
            if let Some(credentials) = self.credentials.as_ref().filter(|_| chain.with_auth()) {
                request = request.basic_auth(&credentials.login, Some(&credentials.password));
            }

            let response = request.send().await?;
            let status = response.status();
            if !is_redirect(status.as_u16()) {
                if !status.is_success() {
                    return Err(TransferError::Status {
                        status: status.as_u16(),
                        url:    url.to_string(),
                    });
                }
                return Ok(response);
            }

            let location = response.headers().get(LOCATION).and_then(|value| value.to_str().ok());
            chain.follow(location)?;
            debug!(to = %chain.current(), hop = chain.hops(), auth = chain.with_auth(), "following redirect");
        }
    }
}

impl HttpClient for Session {
    async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<HttpBody> {
        let response = self.send(url, headers).await?;
        let content_length = response.content_length();
        let stream = response.bytes_stream().map(|chunk| chunk.map_err(TransferError::from));
        Ok(HttpBody {
            content_length,
            stream: Box::pin(stream),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfig::new("urs.earthdata.nasa.gov");
        assert_eq!(config.max_redirects, 10);
        assert!(config.credentials.is_none());
        assert!(config.user_agent.starts_with("granary/"));
    }

    #[test]
    fn test_session_builds() {
        let config = SessionConfig::new("urs.earthdata.nasa.gov").credentials(Credentials {
            login:    "alice".into(),
            password: "s3cret".into(),
        });
        let session = Session::new(config).unwrap();
        assert_eq!(session.login_host, "urs.earthdata.nasa.gov");
        assert!(session.credentials.is_some());
    }

    #[tokio::test]
    async fn test_invalid_url_rejected_before_request() {
        let session = Session::new(SessionConfig::new("login.example")).unwrap();
        let err = session.send("not a url", &[]).await.unwrap_err();
        assert!(matches!(err, TransferError::InvalidUrl(_)));
    }
}
