//! Client for the backend's session verification endpoint.

use std::time::Duration;

use larder_common::config::AuthConfig;
use reqwest::header::COOKIE;
use serde::Deserialize;
use thiserror::Error;

/// Body returned by `GET /verify`.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct VerifyResponse {
    pub authenticated: bool,
}

#[derive(Debug, Error)]
pub enum GuardError {
    /// The verify endpoint answered with a non-2xx status.
    #[error("verify endpoint returned {0}")]
    Status(u16),

    /// Transport failure or a body that is not a `VerifyResponse`.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct VerifyClient {
    http: reqwest::Client,
    verify_url: String,
}

impl VerifyClient {
    pub fn new(http: reqwest::Client, verify_url: impl Into<String>) -> Self {
        Self {
            http,
            verify_url: verify_url.into(),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, GuardError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .user_agent(concat!("larder-guard/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::new(http, config.verify_url()))
    }

    pub fn verify_url(&self) -> &str {
        &self.verify_url
    }

    /// Ask the backend whether the session carried by `cookie` is logged in.
    pub async fn verify(&self, cookie: Option<&str>) -> Result<bool, GuardError> {
        let mut req = self.http.get(&self.verify_url);
        if let Some(cookie) = cookie {
            req = req.header(COOKIE, cookie);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(GuardError::Status(status.as_u16()));
        }

        let body: VerifyResponse = resp.json().await?;
        Ok(body.authenticated)
    }
}
