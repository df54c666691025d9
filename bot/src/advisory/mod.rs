//! Advisory service abstraction
//!
//! A vision/LLM collaborator that proposes listing content from images and
//! text. It is consulted opportunistically and is never authoritative: a
//! missing or wrong suggestion leaves the user in charge. The optional
//! category-selection capability is expressed in the return type
//! (`Ok(None)` = no confident opinion), not via runtime type inspection.

use std::collections::HashMap;

use async_trait::async_trait;

mod error;
mod llm;
pub mod stub;

pub use error::AdvisoryError;
pub use llm::LlmAdvisor;
pub use stub::StubAdvisor;

use crate::market::{AttributeSpec, CategoryCandidate};

/// What the advisory service could tell about an item photo
#[derive(Debug, Clone, Default)]
pub struct ItemAnalysis {
    pub title: String,
    pub description: String,
    pub brand: Option<String>,
    pub model: Option<String>,
}

/// Non-authoritative listing advisor
#[async_trait]
pub trait AdvisoryService: Send + Sync {
    /// Describe the item on the photo; failure here fails the photo flow
    /// because there is nothing to seed the draft with
    async fn analyze_image(&self, image: &[u8], mime: &str) -> Result<ItemAnalysis, AdvisoryError>;

    /// Pick the best fitting category among the candidates, or `None` when
    /// not confident enough to pre-select
    async fn select_category(
        &self,
        title: &str,
        description: &str,
        candidates: &[CategoryCandidate],
    ) -> Result<Option<String>, AdvisoryError>;

    /// Resolve attribute values the advisor is confident about, keyed by
    /// attribute name with the chosen option id as value. Attributes the
    /// advisor has no opinion on are simply absent from the map.
    async fn select_attributes(
        &self,
        title: &str,
        description: &str,
        attributes: &[AttributeSpec],
    ) -> Result<HashMap<String, String>, AdvisoryError>;
}
