use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use serde::Serialize;

use crate::err::Maybe;

/// Tunnelling proxies put an interstitial warning page in front of the
/// backend unless this header is present.
pub const BYPASS_HEADER: &str = "ngrok-skip-browser-warning";
pub const BYPASS_VALUE: &str = "69420";

/// A base address plus the client every call to it goes through.
#[derive(Debug, Clone)]
pub struct Backend {
    client: Client,
    base: String,
}

impl Backend {
    pub fn new<S: Into<String>>(base: S) -> Maybe<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(BYPASS_HEADER, HeaderValue::from_static(BYPASS_VALUE));
        let client = Client::builder().default_headers(headers).build()?;
        Ok(Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// POSTs `body` as JSON. The status code is left for the caller to judge.
    pub async fn post_json<B>(&self, path: &str, body: &B) -> Maybe<Response>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url(path);
        log::debug!("POST {}", url);
        let response = self.client.post(&url).json(body).send().await?;
        log::debug!("POST {} -> {}", url, response.status());
        Ok(response)
    }

    pub async fn get(&self, path: &str) -> Maybe<Response> {
        let url = self.url(path);
        log::debug!("GET {}", url);
        let response = self.client.get(&url).send().await?;
        log::debug!("GET {} -> {}", url, response.status());
        Ok(response)
    }

    /// GET with a `t=<buster>` query so no cache along the way can answer it.
    pub async fn get_fresh(&self, path: &str, buster: i64) -> Maybe<Response> {
        let url = self.url(path);
        log::debug!("GET {}?t={}", url, buster);
        let response = self.client.get(&url).query(&[("t", buster)]).send().await?;
        log::debug!("GET {} -> {}", url, response.status());
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockBackend, Replies};

    #[test]
    fn base_loses_trailing_slashes() {
        let backend = Backend::new("http://127.0.0.1:5050//").unwrap();
        assert_eq!(backend.base(), "http://127.0.0.1:5050");
        assert_eq!(backend.url("/get_qr"), "http://127.0.0.1:5050/get_qr");
    }

    #[tokio::test]
    async fn every_request_carries_the_bypass_header() {
        let mock = MockBackend::spawn(Replies::default()).await;
        let backend = Backend::new(&mock.origin).unwrap();

        backend.get("/").await.unwrap();
        backend
            .post_json("/generate_token", &serde_json::json!({"subject": "Physics"}))
            .await
            .unwrap();
        backend.get_fresh("/get_qr", 42).await.unwrap();

        let hits = mock.hits();
        assert_eq!(hits.len(), 3);
        for hit in &hits {
            assert_eq!(hit.header(BYPASS_HEADER).as_deref(), Some(BYPASS_VALUE));
        }
        assert_eq!(
            hits[1].header("content-type").as_deref(),
            Some("application/json")
        );
        assert_eq!(hits[1].body, r#"{"subject":"Physics"}"#);
        assert_eq!(hits[2].uri, "/get_qr?t=42");
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_transport_error() {
        let backend = Backend::new(crate::testing::dead_origin()).unwrap();
        let err = backend.get("/").await.unwrap_err();
        assert!(err.is_transport());
    }
}
