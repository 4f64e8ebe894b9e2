//! # Commerce Platform Layer
//!
//! This module provides the [`CommercePlatform`] trait, the two outbound
//! operations the order service needs (create a draft order, create a regular
//! order), and [`ShopifyClient`], its implementation over the Shopify Admin REST API.
//!
//! Retries are not performed here: every call is a single request bounded by
//! the configured timeout.

use std::time::Duration;

use app_config::AppConfig;
use async_trait::async_trait;
use model::{DraftOrder, OrderInput, PlacedOrder};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// # CommerceError
///
/// Error types that can occur while talking to the commerce platform.
#[derive(Debug, Error)]
pub enum CommerceError {
    /// The request never produced an HTTP answer (connect, TLS, timeout).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The platform answered with a non-success status.
    #[error("Shopify API error: {status} - {body}")]
    Api { status: u16, body: String },
    /// The platform answered successfully but the body had an unexpected shape.
    #[error("Unexpected response: {0}")]
    Decode(String),
}

/// # CommercePlatform
///
/// Outbound interface to the external commerce/fulfillment platform.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait CommercePlatform: Send + Sync {
    /// Creates a non-finalized draft order. Nothing is charged.
    async fn create_draft_order(&self, draft: &DraftOrder) -> Result<PlacedOrder, CommerceError>;

    /// Creates a finalized order that flows into fulfillment tracking.
    async fn create_order(&self, order: &OrderInput) -> Result<PlacedOrder, CommerceError>;
}

#[derive(Serialize)]
struct DraftOrderRequest<'a> {
    draft_order: &'a DraftOrder,
}

#[derive(Serialize)]
struct OrderRequest<'a> {
    order: &'a OrderInput,
}

#[derive(Deserialize)]
struct DraftOrderResponse {
    draft_order: CreatedRecord,
}

#[derive(Deserialize)]
struct OrderResponse {
    order: CreatedRecord,
}

#[derive(Deserialize)]
struct CreatedRecord {
    id: u64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    order_number: Option<u64>,
}

impl CreatedRecord {
    /// Display number: `name`, then `order_number`, then the id.
    fn into_placed(self) -> PlacedOrder {
        let id = self.id.to_string();
        let number = self
            .name
            .filter(|n| !n.is_empty())
            .or_else(|| self.order_number.map(|n| n.to_string()))
            .unwrap_or_else(|| id.clone());
        PlacedOrder { id, number }
    }
}

/// Shopify Admin REST implementation of [`CommercePlatform`].
pub struct ShopifyClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl ShopifyClient {
    /// Creates a client.
    ///
    /// # Arguments
    /// * `base_url` - Admin API root ending with a slash, e.g. `https://shop.myshopify.com/admin/api/2024-10/`.
    /// * `access_token` - Admin API access token.
    /// * `timeout` - Per-request timeout.
    pub fn new(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CommerceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            access_token: access_token.into(),
        })
    }

    pub fn from_config(cfg: &AppConfig) -> Result<Self, CommerceError> {
        Self::new(
            cfg.commerce_base_url(),
            cfg.commerce_api_token.clone(),
            cfg.commerce_request_timeout,
        )
    }

    async fn post<B, R>(&self, endpoint: &str, body: &B) -> Result<R, CommerceError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{endpoint}", self.base_url);
        debug!(%url, "POST to commerce platform");

        let response = self
            .client
            .post(&url)
            .header(ACCESS_TOKEN_HEADER, &self.access_token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CommerceError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| CommerceError::Decode(e.to_string()))
    }
}

#[async_trait]
impl CommercePlatform for ShopifyClient {
    #[instrument(skip_all)]
    async fn create_draft_order(&self, draft: &DraftOrder) -> Result<PlacedOrder, CommerceError> {
        let response: DraftOrderResponse = self
            .post("draft_orders.json", &DraftOrderRequest { draft_order: draft })
            .await?;
        Ok(response.draft_order.into_placed())
    }

    #[instrument(skip_all)]
    async fn create_order(&self, order: &OrderInput) -> Result<PlacedOrder, CommerceError> {
        let response: OrderResponse = self.post("orders.json", &OrderRequest { order }).await?;
        Ok(response.order.into_placed())
    }
}
