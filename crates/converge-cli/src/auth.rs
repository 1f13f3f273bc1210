use std::fs;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::ConfigDir;

/// Path of the controller's session token endpoint.
pub const TOKEN_PATH: &str = "/dna/system/api/v1/auth/token";

/// Header carrying the session token on every API call.
pub const TOKEN_HEADER: &str = "X-Auth-Token";

/// Stored credentials: a username and password exchanged for a session
/// token on each run, or a pre-issued token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StoredCredentials {
    #[serde(rename = "basic")]
    Basic {
        server: String,
        username: String,
        password: String,
    },
    #[serde(rename = "token")]
    Token { server: String, token: String },
}

impl StoredCredentials {
    pub fn server(&self) -> &str {
        match self {
            Self::Basic { server, .. } | Self::Token { server, .. } => server,
        }
    }
}

/// What `DnacClient` needs to authenticate its calls.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthMethod {
    /// Exchange a username and password for a token before the first call.
    Basic { username: String, password: String },
    Token { token: String },
}

impl From<&StoredCredentials> for AuthMethod {
    fn from(creds: &StoredCredentials) -> Self {
        match creds {
            StoredCredentials::Basic {
                username, password, ..
            } => Self::Basic {
                username: username.clone(),
                password: password.clone(),
            },
            StoredCredentials::Token { token, .. } => Self::Token {
                token: token.clone(),
            },
        }
    }
}

pub fn load_credentials(dir: &ConfigDir, profile: &str) -> Result<Option<StoredCredentials>> {
    let path = dir.credentials_path(profile);
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)?;
    let creds: StoredCredentials = serde_json::from_str(&content)
        .with_context(|| format!("Invalid credentials file {}", path.display()))?;
    Ok(Some(creds))
}

pub fn save_credentials(dir: &ConfigDir, profile: &str, creds: &StoredCredentials) -> Result<()> {
    dir.ensure()?;
    let content = serde_json::to_string_pretty(creds)?;
    fs::write(dir.credentials_path(profile), content)?;
    Ok(())
}

pub fn remove_credentials(dir: &ConfigDir, profile: &str) -> Result<bool> {
    let path = dir.credentials_path(profile);
    if path.exists() {
        fs::remove_file(path)?;
        Ok(true)
    } else {
        Ok(false)
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(rename = "Token")]
    pub token: String,
}

/// Exchange basic credentials for a session token.
pub async fn exchange_token(
    http: &reqwest::Client,
    server: &str,
    username: &str,
    password: &str,
) -> Result<TokenResponse> {
    let resp = http
        .post(format!("{}{TOKEN_PATH}", server.trim_end_matches('/')))
        .basic_auth(username, Some(password))
        .header("Content-Type", "application/json")
        .send()
        .await
        .context("Failed to connect to server")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("Login failed (HTTP {status}): {body}");
    }

    resp.json().await.context("Failed to parse token response")
}
