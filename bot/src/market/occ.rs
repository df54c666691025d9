//! Optimistic-concurrency bookkeeping for one remote draft
//!
//! [`Versioned`] owns the version token most recently returned by the ad
//! service for a draft and threads it through every mutation. Because all
//! mutations for one draft originate from the same serialized session actor,
//! two local mutations never race each other; the token exists to satisfy
//! the remote side's versioning requirement and to make partial-failure
//! recovery explicit. A rejected token surfaces as
//! [`MarketError::Conflict`] and is never retried here.

use tracing::debug;

use super::{AdService, DraftFields, DraftId, ListingPayload, MarketError, VersionToken};

/// A draft id paired with the last version token observed for it
#[derive(Debug, Clone)]
pub struct Versioned {
    id: DraftId,
    token: VersionToken,
}

impl Versioned {
    pub fn new(id: DraftId, token: VersionToken) -> Self {
        Self { id, token }
    }

    pub fn id(&self) -> &DraftId {
        &self.id
    }

    pub fn token(&self) -> &VersionToken {
        &self.token
    }

    /// Apply a partial update, advancing the held token on success
    pub async fn patch(&mut self, svc: &dyn AdService, fields: &DraftFields) -> Result<(), MarketError> {
        debug!(draft = %self.id, token = %self.token, "Versioned::patch");
        let next = svc.patch(&self.id, &self.token, fields).await?;
        self.token = next;
        Ok(())
    }

    /// Replace the full listing payload, advancing the held token on success
    pub async fn update(&mut self, svc: &dyn AdService, listing: &ListingPayload) -> Result<(), MarketError> {
        debug!(draft = %self.id, token = %self.token, "Versioned::update");
        let next = svc.update(&self.id, &self.token, listing).await?;
        self.token = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::InMemoryMarket;

    #[tokio::test]
    async fn test_patch_advances_token() {
        let market = InMemoryMarket::new();
        let created = market.create_draft().await.unwrap();
        let mut versioned = Versioned::new(created.id, created.token.clone());

        versioned
            .patch(
                &market,
                &DraftFields {
                    title: Some("Lamp".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_ne!(versioned.token(), &created.token);

        // A second patch with the advanced token must pass the strict double
        versioned
            .patch(
                &market,
                &DraftFields {
                    description: Some("A lamp".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_stale_token_is_conflict() {
        let market = InMemoryMarket::new();
        let created = market.create_draft().await.unwrap();
        let mut versioned = Versioned::new(created.id.clone(), created.token.clone());

        versioned
            .patch(
                &market,
                &DraftFields {
                    title: Some("Lamp".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // Replay the creation token: the remote side must reject it
        let err = market
            .patch(&created.id, &created.token, &DraftFields::default())
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }
}
