//! Ad service abstraction
//!
//! The external marketplace exposes create/patch/publish operations on a
//! draft listing. Every mutation must present the most recently observed
//! version token and returns a fresh one; stale tokens are rejected with
//! [`MarketError::Conflict`]. Token bookkeeping lives in [`occ::Versioned`].

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod client;
mod error;
pub mod memory;
mod occ;

pub use client::MarketClient;
pub use error::MarketError;
pub use memory::InMemoryMarket;
pub use occ::Versioned;

/// Identifier of a remote draft
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DraftId(pub String);

impl std::fmt::Display for DraftId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque version token (ETag) issued on every successful read or mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionToken(pub String);

impl std::fmt::Display for VersionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Result of creating a fresh remote draft
#[derive(Debug, Clone)]
pub struct CreatedDraft {
    pub id: DraftId,
    pub token: VersionToken,
}

/// An image attached to a draft: remote location plus dimensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub location: String,
    pub width: u32,
    pub height: u32,
}

/// One category the ad service considers plausible for a draft
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCandidate {
    pub id: String,
    pub label: String,
}

/// One selectable option of a category attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeOption {
    pub id: String,
    pub label: String,
}

/// A category-specific field that must be resolved before price entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSpec {
    pub name: String,
    pub label: String,
    pub options: Vec<AttributeOption>,
}

/// Attributes of a category, as returned by the ad service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeBundle {
    pub category: String,
    pub attributes: Vec<AttributeSpec>,
}

/// Sell or give away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeType {
    Sell,
    GiveAway,
}

/// Partial field update for a draft; unset fields are left untouched
#[derive(Debug, Clone, Default, Serialize)]
pub struct DraftFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<ImageRef>>,
}

/// Full listing payload committed right before publishing
#[derive(Debug, Clone, Serialize)]
pub struct ListingPayload {
    pub title: String,
    pub description: String,
    pub category: String,
    pub trade_type: TradeType,
    /// Whole euros; zero for give-away listings
    pub price: u32,
    pub attributes: HashMap<String, String>,
    pub images: Vec<ImageRef>,
    pub postal_code: String,
}

/// Delivery options set after the final update
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryOptions {
    pub shipping: bool,
}

/// Remote ad-draft resource
///
/// Every mutating call takes the last-known version token and returns a new
/// one. Callers never retry a conflict on their own: a stale token means the
/// draft changed concurrently and the user decides what to do about it.
#[async_trait]
pub trait AdService: Send + Sync {
    /// Create an empty draft, returning its id and the initial token
    async fn create_draft(&self) -> Result<CreatedDraft, MarketError>;

    /// Upload image bytes for a draft; the image is not attached to the
    /// listing until its ref is committed via `patch`
    async fn upload_image(&self, draft: &DraftId, bytes: &[u8]) -> Result<ImageRef, MarketError>;

    /// Apply a partial field update
    async fn patch(
        &self,
        draft: &DraftId,
        token: &VersionToken,
        fields: &DraftFields,
    ) -> Result<VersionToken, MarketError>;

    /// Categories the ad service predicts from the draft's current content
    async fn category_predictions(&self, draft: &DraftId) -> Result<Vec<CategoryCandidate>, MarketError>;

    /// Attributes required by the draft's committed category
    async fn attributes(&self, draft: &DraftId) -> Result<AttributeBundle, MarketError>;

    /// Replace the full listing payload
    async fn update(
        &self,
        draft: &DraftId,
        token: &VersionToken,
        listing: &ListingPayload,
    ) -> Result<VersionToken, MarketError>;

    /// Configure delivery for the listing
    async fn set_delivery_options(&self, draft: &DraftId, opts: &DeliveryOptions) -> Result<(), MarketError>;

    /// Publish the draft, returning the marketplace order id
    async fn publish(&self, draft: &DraftId) -> Result<String, MarketError>;
}
