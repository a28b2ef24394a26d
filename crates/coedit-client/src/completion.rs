//! Client side of `POST /autocomplete`.

use std::time::Duration;

use async_trait::async_trait;
use coedit_common::{CompletionError, CompletionRequest, CompletionResponse, ErrorBody};
use coedit_config::ClientConfig;
use tracing::debug;

/// Anything that can turn a document prefix into a suggestion.
///
/// `Ok(None)` means the service had nothing to offer.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: &CompletionRequest)
        -> Result<Option<String>, CompletionError>;
}

/// Calls the relay's completion endpoint over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCompletionService {
    url: String,
    http: reqwest::Client,
}

impl HttpCompletionService {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, CompletionError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CompletionError::NotConfigured(e.to_string()))?;
        Ok(Self {
            url: url.into(),
            http,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, CompletionError> {
        Self::new(
            config.autocomplete_url(),
            Duration::from_millis(config.completion_timeout_ms),
        )
    }
}

#[async_trait]
impl CompletionService for HttpCompletionService {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<Option<String>, CompletionError> {
        debug!(url = %self.url, cursor = request.cursor_position, "Requesting suggestion");

        let response = self
            .http
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::Timeout
                } else {
                    CompletionError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .json::<ErrorBody>()
                .await
                .map(|b| b.detail)
                .unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Parse(e.to_string()))?;
        Ok(body.into_suggestion())
    }
}
