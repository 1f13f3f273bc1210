use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use converge_core::{RemoteApi, TransportError, Verb};
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::auth::{self, AuthMethod, TOKEN_HEADER};

/// HTTP transport for DNA Center style controllers.
pub struct DnacClient {
    http: reqwest::Client,
    base_url: String,
    auth: Option<AuthMethod>,
    token: OnceCell<String>,
}

impl DnacClient {
    pub fn new(base_url: &str, auth: Option<AuthMethod>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        let token = match &auth {
            Some(AuthMethod::Token { token }) => OnceCell::new_with(Some(token.clone())),
            _ => OnceCell::new(),
        };
        Ok(Self {
            http,
            base_url,
            auth,
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Session token, exchanged on first use when basic credentials are held.
    async fn session_token(&self) -> Result<Option<&str>, TransportError> {
        let Some(AuthMethod::Basic { username, password }) = &self.auth else {
            return Ok(self.token.get().map(String::as_str));
        };
        let token = self
            .token
            .get_or_try_init(|| async {
                tracing::debug!(server = %self.base_url, "Exchanging credentials for a token");
                auth::exchange_token(&self.http, &self.base_url, username, password)
                    .await
                    .map(|resp| resp.token)
                    .map_err(|e| TransportError::connection(format!("{e:#}")))
            })
            .await?;
        Ok(Some(token.as_str()))
    }

    async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        payload: Option<&Value>,
    ) -> Result<Value, TransportError> {
        let url = self.url(path);
        let mut req = self
            .http
            .request(method.clone(), &url)
            .header("Accept", "application/json");
        if let Some(token) = self.session_token().await? {
            req = req.header(TOKEN_HEADER, token);
        }
        if let Some(body) = payload {
            req = req.json(body);
        }

        tracing::debug!(%method, %url, "Sending request");
        let resp = req
            .send()
            .await
            .map_err(|e| TransportError::connection(format!("{url}: {e}")))?;
        handle_response(resp).await
    }
}

#[async_trait]
impl RemoteApi for DnacClient {
    async fn fetch(&self, path: &str) -> Result<Value, TransportError> {
        self.request(reqwest::Method::GET, path, None).await
    }

    async fn send(
        &self,
        verb: Verb,
        path: &str,
        payload: Option<&Value>,
    ) -> Result<Value, TransportError> {
        let method = match verb {
            Verb::Get => reqwest::Method::GET,
            Verb::Post => reqwest::Method::POST,
            Verb::Put => reqwest::Method::PUT,
            Verb::Delete => reqwest::Method::DELETE,
        };
        self.request(method, path, payload).await
    }

    fn backend_name(&self) -> &'static str {
        "dnac"
    }
}

async fn handle_response(resp: reqwest::Response) -> Result<Value, TransportError> {
    let status = resp.status();
    parse_body(status, resp.text().await)
}

fn parse_body<E: std::fmt::Display>(
    status: reqwest::StatusCode,
    body: Result<String, E>,
) -> Result<Value, TransportError> {
    let body =
        body.map_err(|e| TransportError::decode(format!("failed to read response body: {e}")))?;

    if !status.is_success() {
        if let Ok(json) = serde_json::from_str::<Value>(&body)
            && let Some(detail) = json
                .pointer("/response/detail")
                .or_else(|| json.get("message"))
                .and_then(Value::as_str)
        {
            return Err(TransportError::status(status.as_u16(), detail));
        }
        return Err(TransportError::status(status.as_u16(), body));
    }

    if body.is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&body).map_err(|e| TransportError::decode(format!("invalid JSON: {e}")))
}
