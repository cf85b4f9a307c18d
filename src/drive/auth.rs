//! OAuth access tokens for the Google APIs.
//!
//! The consent flow runs elsewhere and leaves two files behind: the OAuth
//! client keys and the saved user token. This module reads them, refreshes
//! the access token when it is close to expiry and keeps the current token
//! in memory. `GDRIVE_ACCESS_TOKEN` short-circuits all of it.

use crate::config::DriveConfig;
use crate::constants::{GOOGLE_TOKEN_URI, TOKEN_REFRESH_MARGIN_SECS};
use crate::error::ServerError;
use chrono::Utc;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Saved user token, as written by the authorization flow.
#[derive(Debug, Clone, Deserialize)]
struct SavedCredentials {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    /// Milliseconds since the epoch.
    #[serde(default)]
    expiry_date: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OAuthKeysFile {
    installed: Option<OAuthClient>,
    web: Option<OAuthClient>,
}

#[derive(Debug, Clone, Deserialize)]
struct OAuthClient {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    token_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at_ms: Option<i64>,
}

impl CachedToken {
    fn is_fresh(&self, now_ms: i64) -> bool {
        match self.expires_at_ms {
            Some(expires) => now_ms + TOKEN_REFRESH_MARGIN_SECS * 1000 < expires,
            None => true,
        }
    }
}

enum TokenMode {
    Static(String),
    Stored {
        credentials_path: PathBuf,
        oauth_keys_path: PathBuf,
    },
}

/// Source of bearer tokens for Drive and Sheets requests.
pub struct TokenSource {
    mode: TokenMode,
    http: reqwest::Client,
    cache: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    pub fn from_config(config: &DriveConfig, http: reqwest::Client) -> Self {
        let mode = match &config.access_token {
            Some(token) => TokenMode::Static(token.clone()),
            None => TokenMode::Stored {
                credentials_path: config.credentials_path.clone(),
                oauth_keys_path: config.oauth_keys_path.clone(),
            },
        };
        Self {
            mode,
            http,
            cache: Mutex::new(None),
        }
    }

    /// Check that a token can be produced at all.
    ///
    /// Run once at startup so a missing credentials file fails fast.
    pub async fn validate(&self) -> Result<(), ServerError> {
        self.access_token().await.map(|_| ())
    }

    /// A currently valid access token.
    pub async fn access_token(&self) -> Result<String, ServerError> {
        let (credentials_path, oauth_keys_path) = match &self.mode {
            TokenMode::Static(token) => return Ok(token.clone()),
            TokenMode::Stored {
                credentials_path,
                oauth_keys_path,
            } => (credentials_path, oauth_keys_path),
        };

        let mut cache = self.cache.lock().await;
        let now = Utc::now().timestamp_millis();

        if let Some(cached) = cache.as_ref().filter(|c| c.is_fresh(now)) {
            return Ok(cached.access_token.clone());
        }

        let saved: SavedCredentials = read_json(credentials_path).await?;
        let from_file = saved.access_token.clone().map(|access_token| CachedToken {
            access_token,
            expires_at_ms: saved.expiry_date,
        });

        let token = match from_file.filter(|t| t.is_fresh(now)) {
            Some(token) => {
                debug!("Using saved access token");
                token
            }
            None => self.refresh(&saved, oauth_keys_path, now).await?,
        };

        *cache = Some(token.clone());
        Ok(token.access_token)
    }

    async fn refresh(
        &self,
        saved: &SavedCredentials,
        oauth_keys_path: &Path,
        now_ms: i64,
    ) -> Result<CachedToken, ServerError> {
        let refresh_token = saved.refresh_token.as_deref().ok_or_else(|| {
            ServerError::auth("Saved access token has expired and no refresh token is stored")
        })?;

        let keys: OAuthKeysFile = read_json(oauth_keys_path).await?;
        let client = keys.installed.or(keys.web).ok_or_else(|| {
            ServerError::auth(format!(
                "{} has neither an 'installed' nor a 'web' client",
                oauth_keys_path.display()
            ))
        })?;
        let token_uri = client.token_uri.as_deref().unwrap_or(GOOGLE_TOKEN_URI);

        info!("Refreshing Google access token");
        let response = self
            .http
            .post(token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", client.client_id.as_str()),
                ("client_secret", client.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ServerError::auth(format!(
                "Token refresh rejected ({}): {}",
                status, body
            )));
        }

        let refreshed: RefreshResponse = serde_json::from_str(&body)
            .map_err(|e| ServerError::auth(format!("Unexpected token response: {}", e)))?;

        Ok(CachedToken {
            access_token: refreshed.access_token,
            expires_at_ms: refreshed.expires_in.map(|secs| now_ms + secs * 1000),
        })
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ServerError> {
    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        ServerError::auth(format!("Could not read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&text)
        .map_err(|e| ServerError::auth(format!("Could not parse {}: {}", path.display(), e)))
}
