//! In-memory ad service
//!
//! Backs `run --dry-run` and the test suite. Deliberately strict about
//! version tokens: any mutation presenting a token other than the most
//! recently issued one is rejected, which makes token-ordering bugs fail
//! loudly instead of silently overwriting state.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tracing::debug;

use super::{
    AdService, AttributeBundle, AttributeOption, AttributeSpec, CategoryCandidate, CreatedDraft, DeliveryOptions,
    DraftFields, DraftId, ImageRef, ListingPayload, MarketError, VersionToken,
};

#[derive(Debug, Default)]
struct StoredDraft {
    version: u64,
    title: Option<String>,
    description: Option<String>,
    category: Option<String>,
    images: Vec<ImageRef>,
    listing: Option<ListingPayload>,
    delivery: Option<bool>,
    published: Option<String>,
}

impl StoredDraft {
    fn token(&self) -> VersionToken {
        VersionToken(format!("v{}", self.version))
    }
}

/// Call counters, exposed so tests can assert on remote traffic
#[derive(Debug, Default)]
pub struct MarketCounters {
    pub create_calls: AtomicU64,
    pub upload_calls: AtomicU64,
    pub patch_calls: AtomicU64,
    pub update_calls: AtomicU64,
    pub publish_calls: AtomicU64,
    pub conflicts: AtomicU64,
}

/// In-memory [`AdService`] with strict token sequencing
pub struct InMemoryMarket {
    drafts: Mutex<HashMap<String, StoredDraft>>,
    next_id: AtomicU64,
    candidates: Mutex<Vec<CategoryCandidate>>,
    attributes: Mutex<Vec<AttributeSpec>>,
    fail_publish: Mutex<Option<String>>,
    fail_attributes: Mutex<Option<String>>,
    attributes_delay_ms: AtomicU64,
    publish_delay_ms: AtomicU64,
    pub counters: MarketCounters,
}

impl Default for InMemoryMarket {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMarket {
    pub fn new() -> Self {
        Self {
            drafts: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            candidates: Mutex::new(vec![CategoryCandidate {
                id: "misc".to_string(),
                label: "Miscellaneous".to_string(),
            }]),
            attributes: Mutex::new(Vec::new()),
            fail_publish: Mutex::new(None),
            fail_attributes: Mutex::new(None),
            attributes_delay_ms: AtomicU64::new(0),
            publish_delay_ms: AtomicU64::new(0),
            counters: MarketCounters::default(),
        }
    }

    /// Slow down `attributes`, keeping a category flow observably in flight
    pub fn delay_attributes(&self, ms: u64) {
        self.attributes_delay_ms.store(ms, Ordering::SeqCst);
    }

    /// Slow down `publish`, keeping a publish flow observably in flight
    pub fn delay_publish(&self, ms: u64) {
        self.publish_delay_ms.store(ms, Ordering::SeqCst);
    }

    async fn pause(delay: &AtomicU64) {
        let ms = delay.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
        }
    }

    /// Replace the category predictions returned for every draft
    pub fn set_candidates(&self, candidates: Vec<CategoryCandidate>) {
        *self.candidates.lock().unwrap() = candidates;
    }

    /// Replace the attribute list returned for every draft
    pub fn set_attributes(&self, attributes: Vec<AttributeSpec>) {
        *self.attributes.lock().unwrap() = attributes;
    }

    /// Convenience: a single-option attribute spec for tests
    pub fn attr(name: &str, label: &str, options: &[(&str, &str)]) -> AttributeSpec {
        AttributeSpec {
            name: name.to_string(),
            label: label.to_string(),
            options: options
                .iter()
                .map(|(id, label)| AttributeOption {
                    id: id.to_string(),
                    label: label.to_string(),
                })
                .collect(),
        }
    }

    /// Make the next publish call fail with the given message
    pub fn fail_next_publish(&self, message: &str) {
        *self.fail_publish.lock().unwrap() = Some(message.to_string());
    }

    /// Make the next attributes call fail with the given message
    pub fn fail_next_attributes(&self, message: &str) {
        *self.fail_attributes.lock().unwrap() = Some(message.to_string());
    }

    /// Number of images currently committed to the draft's listing
    pub fn image_count(&self, draft: &DraftId) -> usize {
        self.drafts
            .lock()
            .unwrap()
            .get(&draft.0)
            .map(|d| d.images.len())
            .unwrap_or(0)
    }

    /// Whether the draft has been published
    pub fn is_published(&self, draft: &DraftId) -> bool {
        self.drafts
            .lock()
            .unwrap()
            .get(&draft.0)
            .map(|d| d.published.is_some())
            .unwrap_or(false)
    }

    fn check_token(stored: &StoredDraft, token: &VersionToken, id: &str) -> Result<(), MarketError> {
        if stored.token() != *token {
            return Err(MarketError::Conflict {
                draft_id: id.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AdService for InMemoryMarket {
    async fn create_draft(&self) -> Result<CreatedDraft, MarketError> {
        self.counters.create_calls.fetch_add(1, Ordering::SeqCst);
        let id = format!("draft-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let stored = StoredDraft::default();
        let token = stored.token();
        self.drafts.lock().unwrap().insert(id.clone(), stored);
        debug!(%id, "InMemoryMarket: draft created");
        Ok(CreatedDraft {
            id: DraftId(id),
            token,
        })
    }

    async fn upload_image(&self, draft: &DraftId, bytes: &[u8]) -> Result<ImageRef, MarketError> {
        self.counters.upload_calls.fetch_add(1, Ordering::SeqCst);
        let drafts = self.drafts.lock().unwrap();
        if !drafts.contains_key(&draft.0) {
            return Err(MarketError::NotFound(draft.0.clone()));
        }
        Ok(ImageRef {
            location: format!("mem://{}/{}", draft.0, uuid::Uuid::now_v7()),
            width: 0,
            height: bytes.len() as u32,
        })
    }

    async fn patch(
        &self,
        draft: &DraftId,
        token: &VersionToken,
        fields: &DraftFields,
    ) -> Result<VersionToken, MarketError> {
        self.counters.patch_calls.fetch_add(1, Ordering::SeqCst);
        let mut drafts = self.drafts.lock().unwrap();
        let stored = drafts
            .get_mut(&draft.0)
            .ok_or_else(|| MarketError::NotFound(draft.0.clone()))?;
        if let Err(e) = Self::check_token(stored, token, &draft.0) {
            self.counters.conflicts.fetch_add(1, Ordering::SeqCst);
            return Err(e);
        }
        if let Some(title) = &fields.title {
            stored.title = Some(title.clone());
        }
        if let Some(description) = &fields.description {
            stored.description = Some(description.clone());
        }
        if let Some(category) = &fields.category {
            stored.category = Some(category.clone());
        }
        if let Some(images) = &fields.images {
            stored.images = images.clone();
        }
        stored.version += 1;
        Ok(stored.token())
    }

    async fn category_predictions(&self, draft: &DraftId) -> Result<Vec<CategoryCandidate>, MarketError> {
        if !self.drafts.lock().unwrap().contains_key(&draft.0) {
            return Err(MarketError::NotFound(draft.0.clone()));
        }
        Ok(self.candidates.lock().unwrap().clone())
    }

    async fn attributes(&self, draft: &DraftId) -> Result<AttributeBundle, MarketError> {
        Self::pause(&self.attributes_delay_ms).await;
        if let Some(message) = self.fail_attributes.lock().unwrap().take() {
            return Err(MarketError::Api { status: 500, message });
        }
        let drafts = self.drafts.lock().unwrap();
        let stored = drafts
            .get(&draft.0)
            .ok_or_else(|| MarketError::NotFound(draft.0.clone()))?;
        Ok(AttributeBundle {
            category: stored.category.clone().unwrap_or_default(),
            attributes: self.attributes.lock().unwrap().clone(),
        })
    }

    async fn update(
        &self,
        draft: &DraftId,
        token: &VersionToken,
        listing: &ListingPayload,
    ) -> Result<VersionToken, MarketError> {
        self.counters.update_calls.fetch_add(1, Ordering::SeqCst);
        let mut drafts = self.drafts.lock().unwrap();
        let stored = drafts
            .get_mut(&draft.0)
            .ok_or_else(|| MarketError::NotFound(draft.0.clone()))?;
        if let Err(e) = Self::check_token(stored, token, &draft.0) {
            self.counters.conflicts.fetch_add(1, Ordering::SeqCst);
            return Err(e);
        }
        stored.title = Some(listing.title.clone());
        stored.description = Some(listing.description.clone());
        stored.category = Some(listing.category.clone());
        stored.images = listing.images.clone();
        stored.listing = Some(listing.clone());
        stored.version += 1;
        Ok(stored.token())
    }

    async fn set_delivery_options(&self, draft: &DraftId, opts: &DeliveryOptions) -> Result<(), MarketError> {
        let mut drafts = self.drafts.lock().unwrap();
        let stored = drafts
            .get_mut(&draft.0)
            .ok_or_else(|| MarketError::NotFound(draft.0.clone()))?;
        stored.delivery = Some(opts.shipping);
        Ok(())
    }

    async fn publish(&self, draft: &DraftId) -> Result<String, MarketError> {
        self.counters.publish_calls.fetch_add(1, Ordering::SeqCst);
        Self::pause(&self.publish_delay_ms).await;
        if let Some(message) = self.fail_publish.lock().unwrap().take() {
            return Err(MarketError::Api { status: 500, message });
        }
        let mut drafts = self.drafts.lock().unwrap();
        let stored = drafts
            .get_mut(&draft.0)
            .ok_or_else(|| MarketError::NotFound(draft.0.clone()))?;
        let order = format!("order-{}", uuid::Uuid::now_v7());
        stored.published = Some(order.clone());
        debug!(draft = %draft.0, %order, "InMemoryMarket: draft published");
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_upload_patch_publish() {
        let market = InMemoryMarket::new();
        let created = market.create_draft().await.unwrap();

        let image = market.upload_image(&created.id, b"jpeg").await.unwrap();
        let token = market
            .patch(
                &created.id,
                &created.token,
                &DraftFields {
                    images: Some(vec![image]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(market.image_count(&created.id), 1);
        assert_ne!(token, created.token);

        let order = market.publish(&created.id).await.unwrap();
        assert!(order.starts_with("order-"));
        assert!(market.is_published(&created.id));
    }

    #[tokio::test]
    async fn test_out_of_order_token_rejected() {
        let market = InMemoryMarket::new();
        let created = market.create_draft().await.unwrap();

        let fields = DraftFields {
            title: Some("x".to_string()),
            ..Default::default()
        };
        let _t1 = market.patch(&created.id, &created.token, &fields).await.unwrap();

        let err = market.patch(&created.id, &created.token, &fields).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(market.counters.conflicts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_draft_not_found() {
        let market = InMemoryMarket::new();
        let err = market
            .publish(&DraftId("draft-404".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::NotFound(_)));
    }
}
