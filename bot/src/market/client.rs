//! HTTP ad service client
//!
//! Thin reqwest implementation of [`AdService`]. The version token travels
//! as an `If-Match` header on every mutation and the advanced token is read
//! back from the `ETag` response header; HTTP 412 maps to
//! [`MarketError::Conflict`]. No automatic retries: a failed call is
//! surfaced as-is and retried only when the user re-issues the command.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::IF_MATCH;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::{
    AdService, AttributeBundle, CategoryCandidate, CreatedDraft, DeliveryOptions, DraftFields, DraftId, ImageRef,
    ListingPayload, MarketError, VersionToken,
};
use crate::config::MarketConfig;

/// Reqwest-backed marketplace client
pub struct MarketClient {
    http: Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct CreateResponse {
    id: String,
}

#[derive(Deserialize)]
struct PredictionsResponse {
    candidates: Vec<CategoryCandidate>,
}

#[derive(Deserialize)]
struct PublishResponse {
    order_id: String,
}

impl MarketClient {
    /// Create a client from configuration; the API key is read from the
    /// environment variable named in the config
    pub fn from_config(config: &MarketConfig) -> Result<Self, MarketError> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| MarketError::InvalidResponse(format!("environment variable {} not set", config.api_key_env)))?;

        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(MarketError::Network)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/drafts{}", self.base_url, path)
    }

    /// Map a non-success response to a MarketError
    async fn fail(draft: &DraftId, response: Response) -> MarketError {
        let status = response.status();
        let message = response.text().await.unwrap_or_default();
        match status {
            StatusCode::PRECONDITION_FAILED => MarketError::Conflict {
                draft_id: draft.0.clone(),
            },
            StatusCode::NOT_FOUND => MarketError::NotFound(draft.0.clone()),
            _ => MarketError::Api {
                status: status.as_u16(),
                message,
            },
        }
    }

    fn etag_of(response: &Response) -> Result<VersionToken, MarketError> {
        response
            .headers()
            .get(reqwest::header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(|v| VersionToken(v.to_string()))
            .ok_or_else(|| MarketError::InvalidResponse("missing ETag header".to_string()))
    }
}

#[async_trait]
impl AdService for MarketClient {
    async fn create_draft(&self) -> Result<CreatedDraft, MarketError> {
        debug!("MarketClient::create_draft");
        let response = self
            .http
            .post(self.url(""))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({}))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(MarketError::Api { status, message });
        }

        let token = Self::etag_of(&response)?;
        let body: CreateResponse = response.json().await?;
        Ok(CreatedDraft {
            id: DraftId(body.id),
            token,
        })
    }

    async fn upload_image(&self, draft: &DraftId, bytes: &[u8]) -> Result<ImageRef, MarketError> {
        debug!(draft = %draft, size = bytes.len(), "MarketClient::upload_image");
        let response = self
            .http
            .post(self.url(&format!("/{}/images", draft)))
            .bearer_auth(&self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes.to_vec())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::fail(draft, response).await);
        }
        Ok(response.json().await?)
    }

    async fn patch(
        &self,
        draft: &DraftId,
        token: &VersionToken,
        fields: &DraftFields,
    ) -> Result<VersionToken, MarketError> {
        debug!(draft = %draft, %token, "MarketClient::patch");
        let response = self
            .http
            .patch(self.url(&format!("/{}", draft)))
            .bearer_auth(&self.api_key)
            .header(IF_MATCH, token.0.as_str())
            .json(fields)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::fail(draft, response).await);
        }
        Self::etag_of(&response)
    }

    async fn category_predictions(&self, draft: &DraftId) -> Result<Vec<CategoryCandidate>, MarketError> {
        debug!(draft = %draft, "MarketClient::category_predictions");
        let response = self
            .http
            .get(self.url(&format!("/{}/category-predictions", draft)))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::fail(draft, response).await);
        }
        let body: PredictionsResponse = response.json().await?;
        Ok(body.candidates)
    }

    async fn attributes(&self, draft: &DraftId) -> Result<AttributeBundle, MarketError> {
        debug!(draft = %draft, "MarketClient::attributes");
        let response = self
            .http
            .get(self.url(&format!("/{}/attributes", draft)))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::fail(draft, response).await);
        }
        Ok(response.json().await?)
    }

    async fn update(
        &self,
        draft: &DraftId,
        token: &VersionToken,
        listing: &ListingPayload,
    ) -> Result<VersionToken, MarketError> {
        debug!(draft = %draft, %token, "MarketClient::update");
        let response = self
            .http
            .put(self.url(&format!("/{}", draft)))
            .bearer_auth(&self.api_key)
            .header(IF_MATCH, token.0.as_str())
            .json(listing)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::fail(draft, response).await);
        }
        Self::etag_of(&response)
    }

    async fn set_delivery_options(&self, draft: &DraftId, opts: &DeliveryOptions) -> Result<(), MarketError> {
        debug!(draft = %draft, shipping = opts.shipping, "MarketClient::set_delivery_options");
        let response = self
            .http
            .put(self.url(&format!("/{}/delivery", draft)))
            .bearer_auth(&self.api_key)
            .json(opts)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::fail(draft, response).await);
        }
        Ok(())
    }

    async fn publish(&self, draft: &DraftId) -> Result<String, MarketError> {
        debug!(draft = %draft, "MarketClient::publish");
        let response = self
            .http
            .post(self.url(&format!("/{}/publish", draft)))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::fail(draft, response).await);
        }
        let body: PublishResponse = response.json().await?;
        Ok(body.order_id)
    }
}
