use crate::errors::{Result, ResultExt, UpdateError};
use reqwest::blocking::Client;
use std::time::Duration;

use super::HttpClient;

/// Blocking HTTPS client with rustls. Callers run it off the polling thread.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(600))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("tf2bd-updater/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!("HTTP GET {url}");

        let resp = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("GET {url}"))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(UpdateError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp.bytes().with_context(|| format!("reading body of {url}"))?;
        Ok(body.to_vec())
    }
}
