use std::fmt;

use reqwest::Url;
use serde_json::Value;

use crate::err::{Error, Maybe};
use crate::http::Backend;
use crate::models::BackendConfig;

pub const CONFIG_PATH: &str = "/config";

/// The base address every backend call targets. Resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendAddress(String);

impl BackendAddress {
    pub fn new<S: Into<String>>(address: S) -> Self {
        Self(address.into().trim_end_matches('/').to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackendAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Asks `<origin>/config` where the backend lives. One attempt; anything
/// other than a usable answer falls back to `origin` itself.
pub async fn resolve(origin: &str) -> BackendAddress {
    match discover(origin).await {
        Ok(address) => {
            log::info!("Backend URL loaded: {}", address);
            address
        }
        Err(err) => {
            let fallback = BackendAddress::new(origin);
            log::warn!("Backend discovery failed ({}), using fallback URL: {}", err, fallback);
            fallback
        }
    }
}

async fn discover(origin: &str) -> Maybe<BackendAddress> {
    let page = Backend::new(origin)?;
    let response = page.get(CONFIG_PATH).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::status(status, "Config fetch failed"));
    }

    let config: BackendConfig = response.json().await?;
    let url = config.backend_url.unwrap_or_default();
    let url = url.trim();
    if url.is_empty() {
        return Err(Error::remote("config carried no backend_url"));
    }
    if let Err(err) = Url::parse(url) {
        return Err(Error::remote(format!("backend_url `{}` is not a URL: {}", url, err)));
    }
    Ok(BackendAddress::new(url))
}

/// Connectivity check against `/`. The answer is only logged.
pub async fn ping(backend: &Backend) -> Option<Value> {
    let result: Maybe<Value> = async {
        let response = backend.get("/").await?;
        Ok(response.json::<Value>().await?)
    }
    .await;

    match result {
        Ok(body) => {
            log::info!("Backend connected: {}", body);
            Some(body)
        }
        Err(err) => {
            log::error!("Backend connection failed: {}", err);
            log::error!("Make sure the backend is running!");
            None
        }
    }
}
