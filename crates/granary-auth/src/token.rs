use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::error::{AuthError, Result};
use crate::netrc::Credentials;

/// A short-lived bearer token scoped to one run.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str("Token(<redacted>)") }
}

/// Issues and revokes run tokens.
pub trait TokenProvider: Send + Sync {
    fn issue(&self) -> impl Future<Output = Result<Token>> + Send;

    fn revoke(&self, token: &Token) -> impl Future<Output = Result<()>> + Send;
}

/// Run `body` with a freshly issued token and revoke it afterwards.
///
/// Revocation happens whether `body` returns `Ok`, returns `Err` or panics;
/// a panic is resumed once the token is gone. A failed revocation is logged
/// and never replaces the body's own result. Failing to issue the token is
/// returned before `body` runs.
pub async fn with_token<P, F, Fut, T, E>(provider: &P, body: F) -> std::result::Result<T, E>
where
    P: TokenProvider,
    F: FnOnce(Token) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: From<AuthError>,
{
    let token = provider.issue().await?;
    info!("acquired session token");

    let outcome = AssertUnwindSafe(body(token.clone())).catch_unwind().await;

    match provider.revoke(&token).await {
        Ok(()) => info!("session token released"),
        Err(e) => error!(error = %e, "failed to release session token"),
    }

    match outcome {
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    token: TokenBody,
}

#[derive(Deserialize)]
struct TokenBody {
    id: String,
}

/// Token endpoint speaking the CMR legacy XML token protocol.
pub struct CmrTokenProvider {
    http:        reqwest::Client,
    endpoint:    String,
    client_id:   String,
    user_ip:     String,
    credentials: Credentials,
}

impl CmrTokenProvider {
    pub const DEFAULT_CLIENT_ID: &str = "granary";

    pub fn new(http: reqwest::Client, endpoint: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client_id: Self::DEFAULT_CLIENT_ID.to_string(),
            user_ip: "127.0.0.1".to_string(),
            credentials,
        }
    }

    #[must_use]
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    #[must_use]
    pub fn user_ip(mut self, user_ip: impl Into<String>) -> Self {
        self.user_ip = user_ip.into();
        self
    }

    fn request_body(&self) -> String {
        format!(
            "<?xml version='1.0' encoding='utf-8'?><token><username>{}</username><password>{}</password><client_id>{}</client_id><user_ip_address>{}</user_ip_address></token>",
            xml_escape(&self.credentials.login),
            xml_escape(&self.credentials.password),
            xml_escape(&self.client_id),
            xml_escape(&self.user_ip),
        )
    }
}

impl TokenProvider for CmrTokenProvider {
    async fn issue(&self) -> Result<Token> {
        let response = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/xml")
            .header(ACCEPT, "application/json")
            .body(self.request_body())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AuthError::TokenRejected {
                status: status.as_u16(),
                body,
            });
        }
        parse_token_response(&body)
    }

    async fn revoke(&self, token: &Token) -> Result<()> {
        let response = self
            .http
            .delete(format!("{}/{}", self.endpoint, token.as_str()))
            .header(CONTENT_TYPE, "application/xml")
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        if response.status() == StatusCode::NO_CONTENT {
            info!("token deleted at issuer");
        } else {
            warn!(status = %response.status(), "token deletion was not acknowledged");
        }
        Ok(())
    }
}

fn parse_token_response(body: &str) -> Result<Token> {
    let response: TokenResponse = serde_json::from_str(body)?;
    Ok(Token(response.token.id))
}

fn xml_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\'' => escaped.push_str("&apos;"),
            '"' => escaped.push_str("&quot;"),
            c => escaped.push(c),
        }
    }
    escaped
}
