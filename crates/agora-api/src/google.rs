//! Client for Google's OAuth2 endpoints: builds the authorization redirect,
//! exchanges the callback code for an access token, and fetches the profile.
//! No retries; any failure is returned to the caller.

use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, error};

use crate::config::GoogleConfig;
use crate::error::ApiError;

const SCOPE: &str = "openid email profile";
const FALLBACK_NAME: &str = "Google User";

pub struct GoogleClient {
    http: reqwest::Client,
    config: GoogleConfig,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    email: Option<String>,
    name: Option<String>,
    given_name: Option<String>,
}

/// The parts of the provider profile we keep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleProfile {
    pub email: String,
    pub display_name: String,
}

impl GoogleClient {
    pub fn new(config: GoogleConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn authorization_url(&self, state: &str) -> anyhow::Result<Url> {
        let url = Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("response_type", "code"),
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("scope", SCOPE),
                ("state", state),
                ("access_type", "offline"),
                ("prompt", "select_account"),
            ],
        )?;
        Ok(url)
    }

    pub async fn exchange_code(&self, code: &str) -> Result<String, ApiError> {
        let resp = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| {
                error!("Token exchange failed: {}", e);
                ApiError::ProviderExchangeFailed("Failed to exchange token".into())
            })?;

        let status = resp.status();
        let raw = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            error!("Token exchange failed: HTTP {} body={}", status, raw);
            return Err(ApiError::ProviderExchangeFailed("Failed to exchange token".into()));
        }

        serde_json::from_str::<TokenResponse>(&raw)
            .ok()
            .and_then(|t| t.access_token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                error!("Invalid token response: {}", raw);
                ApiError::ProviderExchangeFailed("Invalid token response".into())
            })
    }

    pub async fn fetch_profile(&self, access_token: &str) -> Result<GoogleProfile, ApiError> {
        let resp = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                error!("Userinfo fetch failed: {}", e);
                ApiError::ProviderProfileFailed("Failed to fetch user info".into())
            })?;

        let status = resp.status();
        let raw = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            error!("Userinfo fetch failed: HTTP {} body={}", status, raw);
            return Err(ApiError::ProviderProfileFailed("Failed to fetch user info".into()));
        }

        let profile = serde_json::from_str::<UserInfo>(&raw)
            .ok()
            .and_then(UserInfo::into_profile)
            .ok_or_else(|| {
                error!("Invalid user info: {}", raw);
                ApiError::ProviderProfileFailed("Invalid user info".into())
            })?;

        debug!("Fetched provider profile for {}", profile.email);
        Ok(profile)
    }
}

impl UserInfo {
    fn into_profile(self) -> Option<GoogleProfile> {
        let email = self.email.filter(|e| !e.is_empty())?;
        let display_name = self
            .name
            .or(self.given_name)
            .unwrap_or_else(|| FALLBACK_NAME.to_string());
        Some(GoogleProfile { email, display_name })
    }
}
