//! Runtime configuration, read once from the environment at startup.

use std::path::PathBuf;

use anyhow::{Context, Result};

pub const DEFAULT_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub cookie_secure: bool,
    pub google: GoogleConfig,
}

/// OAuth client registration plus the provider endpoints. The endpoints are
/// overridable so the flow can run against a stand-in provider.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("AGORA_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = std::env::var("AGORA_PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .context("AGORA_PORT must be a port number")?;
        let db_path: PathBuf = std::env::var("AGORA_DB_PATH")
            .unwrap_or_else(|_| "agora.db".into())
            .into();
        let cookie_secure = std::env::var("AGORA_COOKIE_SECURE")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            host,
            port,
            db_path,
            cookie_secure,
            google: GoogleConfig::from_env()?,
        })
    }
}

impl GoogleConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            client_id: required_var("GOOGLE_CLIENT_ID")?,
            client_secret: required_var("GOOGLE_CLIENT_SECRET")?,
            redirect_uri: required_var("GOOGLE_REDIRECT_URI")?,
            auth_url: std::env::var("GOOGLE_AUTH_URL").unwrap_or_else(|_| DEFAULT_AUTH_URL.into()),
            token_url: std::env::var("GOOGLE_TOKEN_URL").unwrap_or_else(|_| DEFAULT_TOKEN_URL.into()),
            userinfo_url: std::env::var("GOOGLE_USERINFO_URL")
                .unwrap_or_else(|_| DEFAULT_USERINFO_URL.into()),
        })
    }
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("{} is unset", name))
}
