//! HTTP client for the progress API

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{ProgressError, ProgressStore};
use crate::auth::{ReaderIdentity, READER_ID_HEADER, READER_ROLE_HEADER};
use crate::config::ProgressApiConfig;

#[derive(Deserialize)]
struct LastPageResponse {
    last_page: u32,
}

/// Progress store that talks to a remote `/progress` API
#[derive(Debug, Clone)]
pub struct HttpProgressClient {
    client: reqwest::Client,
    /// API base URL, without trailing slash
    base_url: String,
    token: Option<String>,
}

impl HttpProgressClient {
    pub fn new(config: &ProgressApiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to build progress HTTP client, using defaults");
                reqwest::Client::new()
            });

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    fn request(&self, builder: reqwest::RequestBuilder, reader: &ReaderIdentity) -> reqwest::RequestBuilder {
        let builder = builder
            .header(READER_ID_HEADER, &reader.user_id)
            .header(READER_ROLE_HEADER, reader.role.as_str());

        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ProgressError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        Err(ProgressError::Service { status, message })
    }
}

#[async_trait]
impl ProgressStore for HttpProgressClient {
    async fn get_progress(
        &self,
        reader: &ReaderIdentity,
        book_id: &str,
    ) -> Result<Option<u32>, ProgressError> {
        let url = format!("{}/progress/{}", self.base_url, urlencoding::encode(book_id));
        let response = self.request(self.client.get(&url), reader).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body: LastPageResponse = Self::check(response).await?.json().await?;
        Ok(Some(body.last_page))
    }

    async fn save_progress(
        &self,
        reader: &ReaderIdentity,
        book_id: &str,
        last_page: u32,
    ) -> Result<(), ProgressError> {
        let url = format!("{}/progress", self.base_url);
        let body = serde_json::json!({
            "bookId": book_id,
            "lastPage": last_page,
        });

        let response = self
            .request(self.client.post(&url), reader)
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
